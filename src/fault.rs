//! Fault reporting through the status LED.
//!
//! The playback module emits `(category, value)` status codes at any time.
//! Each code maps to a fixed LED reaction:
//!
//! ```text
//!  blinks | meaning
//!  -------+---------------------------------------------
//!     1   | no SD card / card removed (device restarts)
//!     2   | file not found
//!     3   | file index out of bounds
//!     4   | checksum mismatch
//!     5   | serial frame wrong
//!     6   | module sleeping
//!     7   | advertising
//!    10   | serial timeout
//!    11   | malformed frame
//!    15   | USB inserted
//!    16   | USB removed
//!   solid | track finished
//! ```
//!
//! A blink sequence blocks the whole loop: switches and the volume pot are
//! not serviced until it completes.

use crate::app::Control;
use crate::config::{BLINK_LEAD_IN_MS, BLINK_OFF_MS, BLINK_ON_MS};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

/// Status category reported by the playback module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Category {
    /// No response within the serial timeout.
    Timeout,
    /// A malformed frame was received.
    WrongStack,
    CardInserted,
    CardRemoved,
    CardOnline,
    PlayFinished,
    /// Module-side error; the value is a [`ModuleError`].
    Error,
    UsbInserted,
    UsbRemoved,
    UsbOnline,
    CardUsbOnline,
    /// Reply to a query command.
    Feedback,
    /// Any category this firmware does not know.
    Unknown(u8),
}

impl Category {
    /// Wire numbering used by the module library.
    pub fn code(self) -> u8 {
        match self {
            Category::Timeout => 0,
            Category::WrongStack => 1,
            Category::CardInserted => 2,
            Category::CardRemoved => 3,
            Category::CardOnline => 4,
            Category::PlayFinished => 5,
            Category::Error => 6,
            Category::UsbInserted => 7,
            Category::UsbRemoved => 8,
            Category::UsbOnline => 9,
            Category::CardUsbOnline => 10,
            Category::Feedback => 11,
            Category::Unknown(c) => c,
        }
    }
}

impl From<u8> for Category {
    fn from(value: u8) -> Self {
        match value {
            0 => Category::Timeout,
            1 => Category::WrongStack,
            2 => Category::CardInserted,
            3 => Category::CardRemoved,
            4 => Category::CardOnline,
            5 => Category::PlayFinished,
            6 => Category::Error,
            7 => Category::UsbInserted,
            8 => Category::UsbRemoved,
            9 => Category::UsbOnline,
            10 => Category::CardUsbOnline,
            11 => Category::Feedback,
            other => Category::Unknown(other),
        }
    }
}

/// Sub-value of a [`Category::Error`] code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModuleError {
    /// Module busy; in practice reported when no card is present.
    Busy,
    Sleeping,
    SerialWrongStack,
    ChecksumMismatch,
    FileIndexOutOfBounds,
    FileMismatch,
    Advertise,
    Unknown(u16),
}

impl From<u16> for ModuleError {
    fn from(value: u16) -> Self {
        match value {
            1 => ModuleError::Busy,
            2 => ModuleError::Sleeping,
            3 => ModuleError::SerialWrongStack,
            4 => ModuleError::ChecksumMismatch,
            5 => ModuleError::FileIndexOutOfBounds,
            6 => ModuleError::FileMismatch,
            7 => ModuleError::Advertise,
            other => ModuleError::Unknown(other),
        }
    }
}

/// A status code read from the playback module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultCode {
    pub category: Category,
    /// Category-specific value (error kind, track number, device bits).
    pub value: u16,
}

impl FaultCode {
    pub const fn new(category: Category, value: u16) -> Self {
        Self { category, value }
    }

    /// Code raised locally when the module stops answering.
    pub const fn timeout() -> Self {
        Self::new(Category::Timeout, 0)
    }

    /// Code raised locally for a malformed frame.
    pub const fn wrong_stack() -> Self {
        Self::new(Category::WrongStack, 0)
    }

    /// Shorthand for a module-side error.
    pub fn module_error(kind: u16) -> Self {
        Self::new(Category::Error, kind)
    }
}

/// LED reaction to a fault code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultAction {
    /// Nothing to show.
    Ignore,
    /// Blink the given number of times, then resume.
    Blink(u8),
    /// Blink the given number of times, then restart the device.
    BlinkAndRestart(u8),
    /// Turn the LED solid on.
    LedOn,
}

/// Map a fault code to its LED reaction.
pub fn action_for(code: FaultCode) -> FaultAction {
    match code.category {
        Category::Timeout => FaultAction::Blink(10),
        Category::WrongStack => FaultAction::Blink(11),
        Category::CardInserted | Category::CardOnline => FaultAction::Ignore,
        Category::CardRemoved => FaultAction::BlinkAndRestart(1),
        Category::UsbInserted => FaultAction::Blink(15),
        Category::UsbRemoved => FaultAction::Blink(16),
        Category::PlayFinished => FaultAction::LedOn,
        Category::Error => match ModuleError::from(code.value) {
            ModuleError::Busy => FaultAction::BlinkAndRestart(1),
            ModuleError::Sleeping => FaultAction::Blink(6),
            ModuleError::SerialWrongStack => FaultAction::Blink(5),
            ModuleError::ChecksumMismatch => FaultAction::Blink(4),
            ModuleError::FileIndexOutOfBounds => FaultAction::Blink(3),
            ModuleError::FileMismatch => FaultAction::Blink(2),
            ModuleError::Advertise => FaultAction::Blink(7),
            ModuleError::Unknown(_) => FaultAction::Ignore,
        },
        Category::UsbOnline
        | Category::CardUsbOnline
        | Category::Feedback
        | Category::Unknown(_) => FaultAction::Ignore,
    }
}

/// Active-high status LED.
pub struct StatusLed<L> {
    pin: L,
}

impl<L: OutputPin> StatusLed<L> {
    pub fn new(pin: L) -> Self {
        Self { pin }
    }

    pub fn on(&mut self) {
        let _ = self.pin.set_high();
    }

    pub fn off(&mut self) {
        let _ = self.pin.set_low();
    }

    /// Blocking blink sequence: off for the lead-in, then `count` on/off
    /// pulses. Ends with the LED off.
    pub async fn blink(&mut self, count: u8, delay: &mut impl DelayNs) {
        self.off();
        delay.delay_ms(BLINK_LEAD_IN_MS).await;
        for _ in 0..count {
            self.on();
            delay.delay_ms(BLINK_ON_MS).await;
            self.off();
            delay.delay_ms(BLINK_OFF_MS).await;
        }
    }

    /// Show `code` on the LED and tell the caller whether to restart.
    pub async fn report(&mut self, code: FaultCode, delay: &mut impl DelayNs) -> Control {
        let action = action_for(code);
        info!("Fault: {} -> {}", code, action);

        match action {
            FaultAction::Ignore => Control::Continue,
            FaultAction::LedOn => {
                self.on();
                Control::Continue
            }
            FaultAction::Blink(n) => {
                self.blink(n, delay).await;
                Control::Continue
            }
            FaultAction::BlinkAndRestart(n) => {
                self.blink(n, delay).await;
                warn!("Fault: restarting device");
                Control::Restart
            }
        }
    }
}
