//! Soundboard firmware logic.
//!
//! Fourteen panel switches each start one MP3 track on a serial playback
//! module, a potentiometer sets the volume, and a single LED reports module
//! faults as blink counts.
//!
//! Everything here is hardware-agnostic and runs on the host:
//! `cargo test` exercises the debouncer, volume hysteresis, frame codec,
//! module driver and fault table against mock pins and transports.
//!
//! Note: The embedded binary (main.rs, `--features embedded`) binds these
//! pieces to nRF52840 peripherals and supplies the restart.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod app;
pub mod config;
pub mod error;
pub mod fault;
pub mod player;
pub mod switches;
pub mod volume;

pub use app::{Control, Soundboard};
pub use error::Error;
pub use fault::{action_for, Category, FaultAction, FaultCode, ModuleError, StatusLed};
pub use player::dfplayer::DfPlayer;
pub use player::{Equalizer, OutputDevice, PlaybackModule, Transport};
pub use switches::{Debouncer, Edge, SwitchBank};
pub use volume::{map_range, VolumeController, VolumeFilter, VolumeSensor};
