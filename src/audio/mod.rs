// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Audio subsystem - PulseAudio module management through `pactl`/`pacmd`.

pub mod cleanup;
pub mod command;
pub mod loopback;
pub mod pactl;
pub mod types;
pub mod virtual_sink;

pub use command::SystemRunner;
