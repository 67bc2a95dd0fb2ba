//! Application-wide constants and compile-time configuration.
//!
//! All pin assignments, timing parameters, and protocol constants live
//! here so they can be tuned in one place.

// Switches

/// Number of track switches on the panel.
pub const NUM_SWITCHES: usize = 14;

/// Switch debounce interval (ms). A raw level must hold this long
/// before it becomes the debounced state.
pub const DEBOUNCE_MS: u32 = 25;

// Volume

/// Volume pot sampling period (ms).
pub const VOLUME_SAMPLE_PERIOD_MS: u32 = 100;

/// Minimum raw ADC movement (exclusive) that is accepted as a real change.
pub const VOLUME_HYSTERESIS: u16 = 15;

/// Full-scale raw reading of the 10-bit volume ADC.
pub const ADC_MAX: u16 = 1023;

/// Highest volume level the playback module accepts.
pub const VOLUME_MAX: u8 = 30;

// Status LED

/// LED held off before a blink sequence starts (ms).
pub const BLINK_LEAD_IN_MS: u32 = 1000;

/// LED on-time per blink (ms).
pub const BLINK_ON_MS: u32 = 250;

/// LED off-time per blink (ms).
pub const BLINK_OFF_MS: u32 = 250;

// Playback module

/// Delay between switch setup and playback module init (ms).
pub const STARTUP_SETTLE_MS: u32 = 1000;

/// UART baud rate of the playback module.
pub const PLAYER_BAUD: u32 = 9600;

/// Serial communication timeout (ms): ack wait, partial-frame wait and
/// the wait for the online report after a reset.
pub const PLAYER_TIMEOUT_MS: u32 = 500;

/// Pause after the module reports online, before the first command (ms).
pub const PLAYER_RESET_SETTLE_MS: u32 = 200;

/// Status frames buffered while the driver waits for a command ack.
pub const PLAYER_EVENT_QUEUE: usize = 4;

// GPIO pin assignments (nRF52840-DK)
//
// Logical names only; the concrete `embassy_nrf::peripherals::*` are bound
// in `main.rs`.  Adjust for your custom PCB.
//
//   Switch 1..8    → P1.01 .. P1.08   (pull-up, switch to GND)
//   Switch 9..14   → P1.10 .. P1.15   (pull-up, switch to GND)
//   Volume pot     → P0.03 / AIN1
//   Status LED     → P0.27            (active high)
//   Player TX      → P0.20            (to module RX)
//   Player RX      → P0.22            (from module TX)
