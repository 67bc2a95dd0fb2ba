//! Serial MP3 playback module.
//!
//! The rest of the firmware only talks to the module through
//! [`PlaybackModule`]. [`dfplayer::DfPlayer`] implements it over a UART
//! using the module's 10-byte frame protocol ([`frame`]).

pub mod dfplayer;
pub mod frame;

use crate::error::Error;
use crate::fault::FaultCode;

/// Equalizer presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Equalizer {
    Normal = 0,
    Pop = 1,
    Rock = 2,
    Jazz = 3,
    Classic = 4,
    Bass = 5,
}

/// Storage the module plays from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputDevice {
    UDisk = 1,
    Sd = 2,
    Aux = 3,
    Sleep = 4,
    Flash = 5,
}

/// Operations the control loop needs from the playback module.
#[allow(async_fn_in_trait)]
pub trait PlaybackModule {
    /// Reset the module and wait until it reports storage online.
    ///
    /// On failure returns the last status code seen.
    async fn begin(&mut self) -> Result<(), FaultCode>;

    /// Play `/mp3/NNNN.mp3`.
    async fn play_mp3_folder(&mut self, track: u16) -> Result<(), Error>;

    /// Set the output volume (0..=30).
    async fn set_volume(&mut self, level: u8) -> Result<(), Error>;

    async fn set_equalizer(&mut self, eq: Equalizer) -> Result<(), Error>;

    async fn set_output_device(&mut self, device: OutputDevice) -> Result<(), Error>;

    /// Next pending status code, if any. Must not block when the line is idle.
    async fn poll_event(&mut self) -> Option<FaultCode>;
}

/// Byte channel to the module.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Receive one byte, waiting at most `timeout_ms`. `Ok(None)` on timeout;
    /// a zero timeout only returns already-buffered bytes.
    async fn recv_byte(&mut self, timeout_ms: u32) -> Result<Option<u8>, Error>;
}
