// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! System tray integration using ksni (StatusNotifierItem).
//!
//! The tray is the only user interface: two loopback checkboxes, a mixer
//! launcher and Exit. Clicks are forwarded to the app as [`MenuAction`]s.

use crate::audio::loopback::Route;
use crate::config::TrayConfig;
use crate::menu::{MenuAction, MenuEntry, MenuModel};
use futures::future::BoxFuture;
use ksni::{
    menu::{CheckmarkItem, StandardItem},
    Handle, MenuItem, Tray, TrayMethods,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// State shared with the tray icon.
struct FleuveTray {
    /// Channel to send clicks to the app.
    tx: UnboundedSender<MenuAction>,
    model: MenuModel,
    icon_name: String,
}

impl FleuveTray {
    fn send(&self, action: MenuAction) {
        debug!("Tray: {:?} clicked", action);
        let _ = self.tx.send(action);
    }
}

impl Tray for FleuveTray {
    fn id(&self) -> String {
        "fleuve".to_string()
    }

    fn title(&self) -> String {
        String::new()
    }

    fn icon_name(&self) -> String {
        self.icon_name.clone()
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        self.model.entries().into_iter().map(menu_item).collect()
    }
}

fn menu_item(entry: MenuEntry) -> MenuItem<FleuveTray> {
    let label = entry.label().to_string();
    match (entry, entry.action()) {
        (MenuEntry::Toggle { checked, .. }, Some(action)) => MenuItem::Checkmark(CheckmarkItem {
            label,
            checked,
            activate: Box::new(move |tray: &mut FleuveTray| tray.send(action)),
            ..Default::default()
        }),
        (_, Some(action)) => MenuItem::Standard(StandardItem {
            label,
            activate: Box::new(move |tray: &mut FleuveTray| tray.send(action)),
            ..Default::default()
        }),
        _ => MenuItem::Separator,
    }
}

/// Handle to the running tray service.
#[derive(Clone)]
pub struct TrayHandle {
    handle: Handle<FleuveTray>,
}

/// What the app needs from a running menu.
pub trait MenuSurface: Clone + Send + Sync + 'static {
    /// Push a route's checkbox state to the live menu.
    fn set_checked(&self, route: Route, checked: bool) -> BoxFuture<'_, ()>;

    /// Remove the menu.
    fn shutdown(&self);
}

impl MenuSurface for TrayHandle {
    fn set_checked(&self, route: Route, checked: bool) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.handle
                .update(move |tray| tray.model.set_checked(route, checked))
                .await;
        })
    }

    /// Shut down the tray icon, removing it from the system tray.
    fn shutdown(&self) {
        info!("Shutting down system tray");
        let _ = self.handle.shutdown();
    }
}

/// Start the system tray icon.
///
/// Clicks are delivered on `tx`; the channel closes when the tray service
/// goes away.
pub async fn start_tray(
    tx: UnboundedSender<MenuAction>,
    model: MenuModel,
    config: &TrayConfig,
) -> Result<TrayHandle, ksni::Error> {
    let tray = FleuveTray {
        tx,
        model,
        icon_name: config.icon_name.clone(),
    };

    let handle = tray.spawn().await?;
    info!("System tray started");
    Ok(TrayHandle { handle })
}
