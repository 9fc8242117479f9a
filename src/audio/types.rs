// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Core audio types: module handles, sink identities and the handle registry.

use parking_lot::Mutex;
use std::fmt;

/// Index the audio server assigns to a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleHandle(pub u32);

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Machine name and human-readable description of a virtual sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkIdentity {
    pub name: &'static str,
    pub description: &'static str,
}

impl SinkIdentity {
    /// Name of the monitor source PulseAudio creates alongside the sink.
    pub fn monitor_name(&self) -> String {
        format!("{}.monitor", self.name)
    }

    /// Description shown for the monitor source.
    pub fn monitor_description(&self) -> String {
        format!("Monitor of {}", self.description)
    }
}

pub const NULL_SINK: SinkIdentity = SinkIdentity {
    name: "FleuveNullSink",
    description: "Fleuve Null Sink",
};

pub const COMBINED_SINK: SinkIdentity = SinkIdentity {
    name: "FleuveCombinedSink",
    description: "Fleuve Combined Sink",
};

/// One row of `pactl list short modules`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub handle: ModuleHandle,
    pub name: String,
    /// Module arguments, empty when the module was loaded without any.
    pub args: String,
}

impl ModuleEntry {
    /// Whether the listing row mentions `needle` anywhere.
    pub fn mentions(&self, needle: &str) -> bool {
        self.name.contains(needle) || self.args.contains(needle)
    }
}

/// One row of `pactl list short sinks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEntry {
    pub index: u32,
    pub name: String,
    pub driver: String,
}

/// The four module handles this process can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    NullSink,
    CombinedSink,
    MicLoopback,
    AudibleLoopback,
}

impl Slot {
    /// Order in which held modules are unloaded: dependents first.
    pub const TEARDOWN_ORDER: [Slot; 4] = [
        Slot::AudibleLoopback,
        Slot::MicLoopback,
        Slot::CombinedSink,
        Slot::NullSink,
    ];

    fn index(self) -> usize {
        match self {
            Slot::NullSink => 0,
            Slot::CombinedSink => 1,
            Slot::MicLoopback => 2,
            Slot::AudibleLoopback => 3,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::NullSink => "null sink",
            Slot::CombinedSink => "combined sink",
            Slot::MicLoopback => "mic loopback",
            Slot::AudibleLoopback => "audible loopback",
        };
        f.write_str(name)
    }
}

/// Holds the handle of every module this process has loaded.
///
/// A slot is `Some` exactly while its module is loaded. Each slot has a
/// single writer (the provisioner for the sinks, one toggler per loopback)
/// plus the shutdown cleanup, which takes everything.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    slots: Mutex<[Option<ModuleHandle>; 4]>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<ModuleHandle> {
        self.slots.lock()[slot.index()]
    }

    pub fn set(&self, slot: Slot, handle: ModuleHandle) {
        self.slots.lock()[slot.index()] = Some(handle);
    }

    pub fn take(&self, slot: Slot) -> Option<ModuleHandle> {
        self.slots.lock()[slot.index()].take()
    }

    /// Empty every slot, returning held handles in teardown order.
    pub fn take_all(&self) -> Vec<(Slot, ModuleHandle)> {
        let mut slots = self.slots.lock();
        Slot::TEARDOWN_ORDER
            .iter()
            .filter_map(|&slot| slots[slot.index()].take().map(|h| (slot, h)))
            .collect()
    }
}
