//! Volume pot → player volume, with hysteresis.
//!
//! The raw 10-bit reading jitters by a few counts. A new reading is only
//! accepted when it moves more than [`VOLUME_HYSTERESIS`] away from the last
//! accepted one; otherwise the last accepted reading is reused. The player
//! is only told about a level when it differs from the one last applied.

use crate::config::{ADC_MAX, VOLUME_HYSTERESIS, VOLUME_MAX};
use crate::player::PlaybackModule;

/// Source of raw volume readings (0..=[`ADC_MAX`]).
#[allow(async_fn_in_trait)]
pub trait VolumeSensor {
    async fn read_raw(&mut self) -> u16;
}

/// Linear integer rescale with truncating division.
///
/// `(x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min`
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Raw ADC reading to volume level.
pub fn level_for(raw: u16) -> u8 {
    let raw = raw.min(ADC_MAX);
    map_range(raw as i32, 0, ADC_MAX as i32, 0, VOLUME_MAX as i32) as u8
}

/// Hysteresis filter plus "only send on change" bookkeeping.
#[derive(Clone, Copy, Debug, Default)]
pub struct VolumeFilter {
    /// Last accepted raw reading; seeded by the first sample.
    last_raw: Option<u16>,
    /// Level last pushed to the player.
    applied: Option<u8>,
}

impl VolumeFilter {
    pub const fn new() -> Self {
        Self {
            last_raw: None,
            applied: None,
        }
    }

    /// Level for `raw` after hysteresis, without touching `applied`.
    pub fn filter(&mut self, raw: u16) -> u8 {
        let accepted = match self.last_raw {
            Some(last) if last.abs_diff(raw) <= VOLUME_HYSTERESIS => last,
            _ => raw,
        };
        self.last_raw = Some(accepted);
        level_for(accepted)
    }

    /// Feed one sample. Returns the level to send, if it changed.
    pub fn update(&mut self, raw: u16) -> Option<u8> {
        let level = self.filter(raw);
        if self.applied == Some(level) {
            return None;
        }
        self.applied = Some(level);
        Some(level)
    }

    pub fn applied(&self) -> Option<u8> {
        self.applied
    }
}

/// Samples the pot and pushes level changes to the player.
pub struct VolumeController<S> {
    sensor: S,
    filter: VolumeFilter,
}

impl<S: VolumeSensor> VolumeController<S> {
    pub fn new(sensor: S) -> Self {
        Self {
            sensor,
            filter: VolumeFilter::new(),
        }
    }

    /// Read the pot once; send "set volume" only if the level changed.
    /// Returns the level that was sent.
    pub async fn sample<M: PlaybackModule>(&mut self, player: &mut M) -> Option<u8> {
        let raw = self.sensor.read_raw().await;
        let level = self.filter.update(raw)?;

        debug!("Volume: raw={} level={}", raw, level);
        if let Err(e) = player.set_volume(level).await {
            warn!("Set volume {} failed: {}", level, e);
        }
        Some(level)
    }

    pub fn applied(&self) -> Option<u8> {
        self.filter.applied()
    }
}
