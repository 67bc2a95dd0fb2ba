//! Track switches with time-based debouncing.
//!
//! Each switch is wired active-low (internal pull-up, switch to ground).
//! The bank is polled from the main loop; a debounced press on switch `i`
//! plays track `i + 1`. Releases and held switches produce nothing.

use crate::player::PlaybackModule;
use embedded_hal::digital::InputPin;
use heapless::Vec;

/// Debounced level change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Released → pressed (pin fell).
    Pressed,
    /// Pressed → released (pin rose).
    Released,
}

/// Stable-interval debouncer.
///
/// The raw level has to stay unchanged for `interval_ms` before it is
/// accepted. Any change restarts the wait, so contact bounce shorter than
/// the interval never reaches the debounced state.
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    /// Debounced state (`true` = pressed).
    stable: bool,
    /// Last raw reading.
    raw: bool,
    /// When `raw` last changed, or when `stable` last flipped.
    since_ms: u32,
    interval_ms: u32,
}

impl Debouncer {
    /// Start from the current raw level so a switch held at power-up does
    /// not fire.
    pub const fn new(pressed: bool, now_ms: u32, interval_ms: u32) -> Self {
        Self {
            stable: pressed,
            raw: pressed,
            since_ms: now_ms,
            interval_ms,
        }
    }

    /// Feed one raw sample. Returns the edge if the debounced state flipped.
    pub fn update(&mut self, pressed: bool, now_ms: u32) -> Option<Edge> {
        if pressed != self.raw {
            self.raw = pressed;
            self.since_ms = now_ms;
            return None;
        }

        if pressed != self.stable && now_ms.wrapping_sub(self.since_ms) >= self.interval_ms {
            self.stable = pressed;
            self.since_ms = now_ms;
            return Some(if pressed { Edge::Pressed } else { Edge::Released });
        }

        None
    }

    pub fn is_pressed(&self) -> bool {
        self.stable
    }
}

struct Switch<P> {
    pin: P,
    debouncer: Debouncer,
}

/// Fixed bank of `N` switches; index `i` maps to track `i + 1`.
pub struct SwitchBank<P, const N: usize> {
    switches: [Switch<P>; N],
}

fn read_pressed<P: InputPin>(pin: &mut P) -> Option<bool> {
    pin.is_low().ok()
}

impl<P: InputPin, const N: usize> SwitchBank<P, N> {
    /// Attach every pin with the given debounce interval.
    ///
    /// Pins must already be configured as pulled-up inputs.
    pub fn new(pins: [P; N], interval_ms: u32, now_ms: u32) -> Self {
        let switches = pins.map(|mut pin| {
            let pressed = read_pressed(&mut pin).unwrap_or(false);
            Switch {
                pin,
                debouncer: Debouncer::new(pressed, now_ms, interval_ms),
            }
        });
        Self { switches }
    }

    /// Sample every switch once; returns the indices that were pressed.
    pub fn poll(&mut self, now_ms: u32) -> Vec<usize, N> {
        let mut pressed = Vec::new();

        for (index, switch) in self.switches.iter_mut().enumerate() {
            let Some(level) = read_pressed(&mut switch.pin) else {
                warn!("Switch {}: pin read failed", index);
                continue;
            };
            if let Some(Edge::Pressed) = switch.debouncer.update(level, now_ms) {
                // Capacity equals N, cannot overflow.
                let _ = pressed.push(index);
            }
        }

        pressed
    }

    /// Poll the bank and start the matching track for every new press.
    pub async fn poll_and_dispatch<M: PlaybackModule>(&mut self, now_ms: u32, player: &mut M) {
        for index in self.poll(now_ms) {
            let track = track_for(index);
            info!("Switch {} pressed -> track {}", index, track);
            if let Err(e) = player.play_mp3_folder(track).await {
                warn!("Play track {} failed: {}", track, e);
            }
        }
    }

    /// Debounced state of switch `index`.
    pub fn is_pressed(&self, index: usize) -> bool {
        self.switches
            .get(index)
            .is_some_and(|s| s.debouncer.is_pressed())
    }
}

/// 1-based track number for switch `index`.
pub fn track_for(index: usize) -> u16 {
    index as u16 + 1
}
