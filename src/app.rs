//! Main control loop.
//!
//! One sequential loop, no tasks: poll switches, start tracks, resample the
//! volume pot every [`VOLUME_SAMPLE_PERIOD_MS`], then hand at most one module
//! status code to the fault reporter. Everything blocks in turn, including
//! blink sequences.

use crate::config::{STARTUP_SETTLE_MS, VOLUME_SAMPLE_PERIOD_MS};
use crate::fault::StatusLed;
use crate::player::{Equalizer, OutputDevice, PlaybackModule};
use crate::switches::SwitchBank;
use crate::volume::{VolumeController, VolumeSensor};
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

/// What the platform should do after a loop step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    Continue,
    /// Reset the device; no state survives.
    Restart,
}

pub struct Soundboard<M, P, S, L, D, const N: usize> {
    player: M,
    switches: SwitchBank<P, N>,
    volume: VolumeController<S>,
    led: StatusLed<L>,
    delay: D,
    /// Last volume sample time; armed by the first `step`.
    volume_tick_ms: Option<u32>,
}

impl<M, P, S, L, D, const N: usize> Soundboard<M, P, S, L, D, N>
where
    M: PlaybackModule,
    P: InputPin,
    S: VolumeSensor,
    L: OutputPin,
    D: DelayNs,
{
    pub fn new(
        player: M,
        switches: SwitchBank<P, N>,
        volume: VolumeController<S>,
        led: StatusLed<L>,
        delay: D,
    ) -> Self {
        Self {
            player,
            switches,
            volume,
            led,
            delay,
            volume_tick_ms: None,
        }
    }

    /// Bring up the playback module.
    ///
    /// Any init failure is shown on the LED and always ends in `Restart`;
    /// the next boot retries.
    pub async fn boot(&mut self) -> Control {
        self.led.off();
        self.delay.delay_ms(STARTUP_SETTLE_MS).await;

        if let Err(code) = self.player.begin().await {
            error!("Boot: playback module unavailable");
            self.led.report(code, &mut self.delay).await;
            return Control::Restart;
        }

        self.led.on();
        self.volume.sample(&mut self.player).await;
        if let Err(e) = self.player.set_equalizer(Equalizer::Normal).await {
            warn!("Boot: equalizer not set: {}", e);
        }
        if let Err(e) = self.player.set_output_device(OutputDevice::Sd).await {
            warn!("Boot: output device not set: {}", e);
        }

        info!("Boot: ready, {} switches", N);
        Control::Continue
    }

    /// One loop iteration at time `now_ms`.
    pub async fn step(&mut self, now_ms: u32) -> Control {
        self.switches
            .poll_and_dispatch(now_ms, &mut self.player)
            .await;

        let last = *self.volume_tick_ms.get_or_insert(now_ms);
        if now_ms.wrapping_sub(last) > VOLUME_SAMPLE_PERIOD_MS {
            self.volume_tick_ms = Some(now_ms);
            self.volume.sample(&mut self.player).await;
        }

        match self.player.poll_event().await {
            Some(code) => self.led.report(code, &mut self.delay).await,
            None => Control::Continue,
        }
    }

    pub fn player(&self) -> &M {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut M {
        &mut self.player
    }

    pub fn switches(&self) -> &SwitchBank<P, N> {
        &self.switches
    }

    pub fn volume(&self) -> &VolumeController<S> {
        &self.volume
    }
}
