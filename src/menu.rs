// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tray menu model.
//!
//! The menu is described as plain data: entries carry a [`MenuAction`] that
//! the app dispatches on, and the tray only renders them.

use crate::audio::loopback::Route;

/// What a menu click asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Flip a loopback route.
    Toggle(Route),
    /// Launch the external volume mixer.
    OpenMixer,
    /// Tear down the tray and exit.
    Exit,
}

/// One row of the tray menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Toggle { route: Route, checked: bool },
    Action { label: &'static str, action: MenuAction },
    Separator,
}

impl MenuEntry {
    pub fn label(&self) -> &'static str {
        match self {
            MenuEntry::Toggle { route, .. } => route.title(),
            MenuEntry::Action { label, .. } => label,
            MenuEntry::Separator => "",
        }
    }

    pub fn action(&self) -> Option<MenuAction> {
        match self {
            MenuEntry::Toggle { route, .. } => Some(MenuAction::Toggle(*route)),
            MenuEntry::Action { action, .. } => Some(*action),
            MenuEntry::Separator => None,
        }
    }
}

/// Checkbox state shown in the menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuModel {
    pub mic_checked: bool,
    pub audible_checked: bool,
}

impl MenuModel {
    pub fn is_checked(&self, route: Route) -> bool {
        match route {
            Route::Mic => self.mic_checked,
            Route::Audible => self.audible_checked,
        }
    }

    pub fn set_checked(&mut self, route: Route, checked: bool) {
        match route {
            Route::Mic => self.mic_checked = checked,
            Route::Audible => self.audible_checked = checked,
        }
    }

    pub fn entries(&self) -> Vec<MenuEntry> {
        let mut entries: Vec<MenuEntry> = Route::ALL
            .iter()
            .map(|&route| MenuEntry::Toggle {
                route,
                checked: self.is_checked(route),
            })
            .collect();
        entries.extend([
            MenuEntry::Separator,
            MenuEntry::Action {
                label: "Volume Control",
                action: MenuAction::OpenMixer,
            },
            MenuEntry::Separator,
            MenuEntry::Action {
                label: "Exit",
                action: MenuAction::Exit,
            },
        ]);
        entries
    }
}
