//! Unified error type for the soundboard.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Faults reported *by* the playback module are not errors; they travel
//! as [`FaultCode`](crate::fault::FaultCode)s to the status LED.

use crate::player::frame::FrameError;

/// Top-level error type used across the library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// UART read or write to the playback module failed.
    Transport,

    /// The module did not acknowledge a command in time.
    Timeout,

    /// A frame from the module was malformed.
    Frame(FrameError),

    /// A command parameter was outside the range the module accepts.
    ParameterOutOfRange,
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}
