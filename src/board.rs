//! nRF52840 bindings for the library's hardware seams.

use embassy_nrf::buffered_uarte::BufferedUarte;
use embassy_nrf::peripherals::{TIMER0, UARTE0};
use embassy_nrf::saadc::Saadc;
use embassy_time::{with_timeout, Duration, Instant};
use soundboard::config::ADC_MAX;
use soundboard::{Error, Transport, VolumeSensor};

/// Milliseconds since boot; wraps after ~49 days.
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}

/// Hard reset through the Cortex-M SCB. Nothing survives.
pub fn restart() -> ! {
    defmt::warn!("Restarting");
    cortex_m::peripheral::SCB::sys_reset()
}

/// Volume pot on one SAADC channel (10-bit, VDD-referenced).
pub struct PotSensor<'d> {
    saadc: Saadc<'d, 1>,
}

impl<'d> PotSensor<'d> {
    pub fn new(saadc: Saadc<'d, 1>) -> Self {
        Self { saadc }
    }
}

impl VolumeSensor for PotSensor<'_> {
    async fn read_raw(&mut self) -> u16 {
        let mut buf = [0i16; 1];
        self.saadc.sample(&mut buf).await;
        // Single-ended readings dip slightly below zero near ground.
        buf[0].clamp(0, ADC_MAX as i16) as u16
    }
}

/// Playback module UART.
pub struct UartLink<'d> {
    uart: BufferedUarte<'d, UARTE0, TIMER0>,
}

impl<'d> UartLink<'d> {
    pub fn new(uart: BufferedUarte<'d, UARTE0, TIMER0>) -> Self {
        Self { uart }
    }
}

impl Transport for UartLink<'_> {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = self.uart.write(rest).await.map_err(|_| Error::Transport)?;
            rest = &rest[n..];
        }
        self.uart.flush().await.map_err(|_| Error::Transport)
    }

    async fn recv_byte(&mut self, timeout_ms: u32) -> Result<Option<u8>, Error> {
        let mut byte = [0u8; 1];
        let read = self.uart.read(&mut byte);
        match with_timeout(Duration::from_millis(u64::from(timeout_ms)), read).await {
            Ok(Ok(_)) => Ok(Some(byte[0])),
            Ok(Err(_)) => Err(Error::Transport),
            Err(_) => Ok(None),
        }
    }
}
