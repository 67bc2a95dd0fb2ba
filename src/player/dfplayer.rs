//! UART driver for DFPlayer-compatible MP3 modules.
//!
//! Commands are sent with the feedback flag set by default, and each one
//! waits for the module's ack. Status frames that arrive in the meantime are
//! queued and handed out later by [`PlaybackModule::poll_event`]. Anything
//! still buffered when the next command goes out is read first, so a late
//! ack is never credited to the wrong command.

use super::frame::{Command, Frame, FrameDecoder, Response};
use super::{Equalizer, OutputDevice, PlaybackModule, Transport};
use crate::config::{PLAYER_EVENT_QUEUE, PLAYER_RESET_SETTLE_MS, PLAYER_TIMEOUT_MS, VOLUME_MAX};
use crate::error::Error;
use crate::fault::{Category, FaultCode};
use embedded_hal_async::delay::DelayNs;
use heapless::Deque;

/// Frames read while waiting for one ack or one online report before
/// giving up.
const MAX_FRAMES_PER_WAIT: usize = 8;

/// Highest track number in the `mp3` folder.
const MAX_TRACK: u16 = 9999;

pub struct DfPlayer<T, D> {
    transport: T,
    delay: D,
    decoder: FrameDecoder,
    pending: Deque<FaultCode, PLAYER_EVENT_QUEUE>,
    ack: bool,
    timeout_ms: u32,
}

/// Status code the reporter shows for a driver-side failure.
fn fault_for(e: Error) -> FaultCode {
    match e {
        Error::Frame(_) => FaultCode::wrong_stack(),
        _ => FaultCode::timeout(),
    }
}

fn is_online(code: &FaultCode) -> bool {
    matches!(
        code.category,
        Category::CardOnline | Category::UsbOnline | Category::CardUsbOnline
    )
}

impl<T: Transport, D: DelayNs> DfPlayer<T, D> {
    pub fn new(transport: T, delay: D) -> Self {
        Self {
            transport,
            delay,
            decoder: FrameDecoder::new(),
            pending: Deque::new(),
            ack: true,
            timeout_ms: PLAYER_TIMEOUT_MS,
        }
    }

    /// Request (or stop requesting) an ack for every command.
    pub fn with_ack(mut self, ack: bool) -> Self {
        self.ack = ack;
        self
    }

    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn enqueue(&mut self, code: FaultCode) {
        if self.pending.is_full() {
            warn!("Player: event queue full, dropping oldest");
            self.pending.pop_front();
        }
        let _ = self.pending.push_back(code);
    }

    /// Read one frame. The first byte may take `first_wait_ms`; once a
    /// frame has started every further byte gets the full timeout.
    async fn read_frame(&mut self, first_wait_ms: u32) -> Result<Option<Response>, Error> {
        loop {
            let wait = if self.decoder.in_progress() {
                self.timeout_ms
            } else {
                first_wait_ms
            };

            let Some(byte) = self.transport.recv_byte(wait).await? else {
                if self.decoder.in_progress() {
                    self.decoder.reset();
                    return Err(Error::Timeout);
                }
                return Ok(None);
            };

            if let Some(result) = self.decoder.push(byte) {
                let frame = result?;
                trace!("Player: rx cmd={=u8:x} param={}", frame.command, frame.param);
                return Ok(Some(Response::from(frame)));
            }
        }
    }

    async fn send(&mut self, command: Command, param: u16, ack: bool) -> Result<(), Error> {
        let bytes = Frame::new(command, param, ack).encode();
        trace!("Player: tx {} param={}", command, param);
        self.transport.send(&bytes).await
    }

    async fn wait_ack(&mut self) -> Result<(), Error> {
        for _ in 0..MAX_FRAMES_PER_WAIT {
            match self.read_frame(self.timeout_ms).await {
                Ok(Some(Response::Ack)) => return Ok(()),
                Ok(Some(Response::Status(code))) => self.enqueue(code),
                Ok(None) | Err(Error::Timeout) => break,
                Err(Error::Transport) => {
                    warn!("Player: UART read failed while waiting for ack");
                }
                Err(e) => {
                    warn!("Player: bad frame while waiting for ack: {}", e);
                    self.enqueue(fault_for(e));
                }
            }
        }

        // One timeout per failed wait, however many reads went wrong.
        warn!("Player: no ack within {} ms", self.timeout_ms);
        self.enqueue(FaultCode::timeout());
        Err(Error::Timeout)
    }

    /// Empty the receive side before a new command so that a late ack for
    /// the previous one is not taken as this one's. Status frames are kept.
    async fn drain(&mut self) {
        for _ in 0..MAX_FRAMES_PER_WAIT {
            match self.read_frame(0).await {
                Ok(None) => return,
                Ok(Some(Response::Ack)) => {
                    debug!("Player: dropping stale ack");
                }
                Ok(Some(Response::Status(code))) => self.enqueue(code),
                Err(Error::Transport) => {
                    warn!("Player: UART read failed");
                    return;
                }
                Err(e) => {
                    warn!("Player: {}", e);
                    self.enqueue(fault_for(e));
                }
            }
        }
    }

    async fn command(&mut self, command: Command, param: u16) -> Result<(), Error> {
        if self.ack {
            self.drain().await;
        }
        self.send(command, param, self.ack).await?;
        if self.ack {
            self.wait_ack().await?;
        }
        Ok(())
    }
}

impl<T: Transport, D: DelayNs> PlaybackModule for DfPlayer<T, D> {
    async fn begin(&mut self) -> Result<(), FaultCode> {
        self.decoder.reset();
        self.pending.clear();

        if let Err(e) = self.send(Command::Reset, 0, self.ack).await {
            error!("Player: reset not sent: {}", e);
            return Err(fault_for(e));
        }

        let mut last = FaultCode::timeout();
        for _ in 0..MAX_FRAMES_PER_WAIT {
            match self.read_frame(self.timeout_ms).await {
                Ok(Some(Response::Ack)) => continue,
                Ok(Some(Response::Status(code))) if is_online(&code) => {
                    info!("Player: online ({})", code.category);
                    self.delay.delay_ms(PLAYER_RESET_SETTLE_MS).await;
                    return Ok(());
                }
                Ok(Some(Response::Status(code))) => last = code,
                Ok(None) => break,
                Err(e) => {
                    last = fault_for(e);
                    if e == Error::Timeout {
                        break;
                    }
                }
            }
        }

        error!("Player: init failed, last status {}", last);
        Err(last)
    }

    async fn play_mp3_folder(&mut self, track: u16) -> Result<(), Error> {
        if track == 0 || track > MAX_TRACK {
            return Err(Error::ParameterOutOfRange);
        }
        self.command(Command::PlayMp3Folder, track).await
    }

    async fn set_volume(&mut self, level: u8) -> Result<(), Error> {
        let level = level.min(VOLUME_MAX);
        self.command(Command::SetVolume, u16::from(level)).await
    }

    async fn set_equalizer(&mut self, eq: Equalizer) -> Result<(), Error> {
        self.command(Command::SetEqualizer, eq as u16).await
    }

    async fn set_output_device(&mut self, device: OutputDevice) -> Result<(), Error> {
        self.command(Command::SetOutputDevice, device as u16).await?;
        // Module ignores commands while it switches storage.
        self.delay.delay_ms(PLAYER_RESET_SETTLE_MS).await;
        Ok(())
    }

    async fn poll_event(&mut self) -> Option<FaultCode> {
        if let Some(code) = self.pending.pop_front() {
            return Some(code);
        }

        loop {
            match self.read_frame(0).await {
                Ok(None) => return None,
                Ok(Some(Response::Ack)) => continue,
                Ok(Some(Response::Status(code))) => return Some(code),
                Err(Error::Transport) => {
                    warn!("Player: UART read failed");
                    return None;
                }
                Err(e) => {
                    warn!("Player: {}", e);
                    return Some(fault_for(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::collections::VecDeque;

    /// `rx` is readable right away, `answer` only once the next frame has
    /// been sent. The first `failed_reads` reads return an error.
    #[derive(Default)]
    struct Loopback {
        rx: VecDeque<u8>,
        answer: Vec<u8>,
        tx: Vec<u8>,
        failed_reads: usize,
    }

    fn encoded(command: u8, param: u16) -> [u8; 10] {
        let mut f = Frame::new(Command::Reset, param, false);
        f.command = command;
        f.encode()
    }

    impl Loopback {
        fn queue_reply(&mut self, command: u8, param: u16) {
            self.rx.extend(encoded(command, param));
        }

        fn answer_with(&mut self, command: u8, param: u16) {
            self.answer.extend(encoded(command, param));
        }
    }

    impl Transport for Loopback {
        async fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
            self.tx.extend_from_slice(bytes);
            self.rx.extend(self.answer.drain(..));
            Ok(())
        }

        async fn recv_byte(&mut self, _timeout_ms: u32) -> Result<Option<u8>, Error> {
            if self.failed_reads > 0 {
                self.failed_reads -= 1;
                return Err(Error::Transport);
            }
            Ok(self.rx.pop_front())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    fn player() -> DfPlayer<Loopback, NoDelay> {
        DfPlayer::new(Loopback::default(), NoDelay)
    }

    #[test]
    fn command_without_ack_mode() {
        let mut p = player().with_ack(false);
        block_on(p.play_mp3_folder(4)).unwrap();
        assert_eq!(p.transport().tx[3], 0x12);
        assert_eq!(p.transport().tx[4], 0x00);
        assert_eq!(p.transport().tx[6], 4);
    }

    #[test]
    fn ack_consumed_and_status_queued() {
        let mut p = player();
        p.transport_mut().answer_with(0x3D, 2);
        p.transport_mut().answer_with(0x41, 0);
        block_on(p.set_volume(12)).unwrap();
        assert_eq!(p.transport().tx[4], 0x01);

        let code = block_on(p.poll_event()).unwrap();
        assert_eq!(code, FaultCode::new(Category::PlayFinished, 2));
        assert_eq!(block_on(p.poll_event()), None);
    }

    #[test]
    fn missing_ack_queues_timeout() {
        let mut p = player();
        assert_eq!(block_on(p.set_equalizer(Equalizer::Normal)), Err(Error::Timeout));
        assert_eq!(block_on(p.poll_event()), Some(FaultCode::timeout()));
    }

    #[test]
    fn read_error_then_ack_succeeds() {
        let mut p = player();
        p.transport_mut().queue_reply(0x41, 0);
        p.transport_mut().failed_reads = 1;
        assert_eq!(block_on(p.wait_ack()), Ok(()));
        assert_eq!(block_on(p.poll_event()), None);
    }

    #[test]
    fn dead_uart_queues_one_timeout() {
        let mut p = player();
        p.transport_mut().failed_reads = usize::MAX;
        assert_eq!(block_on(p.set_volume(10)), Err(Error::Timeout));

        p.transport_mut().failed_reads = 0;
        assert_eq!(block_on(p.poll_event()), Some(FaultCode::timeout()));
        assert_eq!(block_on(p.poll_event()), None);
    }

    #[test]
    fn late_ack_not_taken_for_next_command() {
        let mut p = player();
        // Ack for an earlier command that arrived after its wait gave up.
        p.transport_mut().queue_reply(0x41, 0);
        p.transport_mut().queue_reply(0x3D, 7);
        assert_eq!(block_on(p.set_volume(20)), Err(Error::Timeout));

        assert_eq!(
            block_on(p.poll_event()),
            Some(FaultCode::new(Category::PlayFinished, 7))
        );
        assert_eq!(block_on(p.poll_event()), Some(FaultCode::timeout()));
        assert_eq!(block_on(p.poll_event()), None);
    }

    #[test]
    fn volume_is_clamped() {
        let mut p = player().with_ack(false);
        block_on(p.set_volume(99)).unwrap();
        assert_eq!(p.transport().tx[6], 30);
    }

    #[test]
    fn track_zero_rejected() {
        let mut p = player().with_ack(false);
        assert_eq!(block_on(p.play_mp3_folder(0)), Err(Error::ParameterOutOfRange));
        assert!(p.transport().tx.is_empty());
    }

    #[test]
    fn stalled_frame_reports_timeout() {
        let mut p = player();
        p.transport_mut().rx.extend([0x7E, 0xFF, 0x06]);
        assert_eq!(block_on(p.poll_event()), Some(FaultCode::timeout()));
        assert_eq!(block_on(p.poll_event()), None);
    }

    #[test]
    fn malformed_frame_reports_wrong_stack() {
        let mut p = player();
        p.transport_mut().rx.extend([0x7E, 0x00]);
        assert_eq!(block_on(p.poll_event()), Some(FaultCode::wrong_stack()));
    }

    #[test]
    fn queue_drops_oldest_when_full() {
        let mut p = player();
        for track in 1..=6u16 {
            p.transport_mut().answer_with(0x3D, track);
        }
        p.transport_mut().answer_with(0x41, 0);
        // Six statuses arrive before the ack; the queue keeps the newest four.
        block_on(p.set_volume(5)).unwrap();

        let mut seen = Vec::new();
        while let Some(code) = block_on(p.poll_event()) {
            seen.push(code.value);
        }
        assert_eq!(seen, vec![3, 4, 5, 6]);
    }

    #[test]
    fn begin_waits_for_online() {
        let mut p = player();
        p.transport_mut().queue_reply(0x41, 0);
        p.transport_mut().queue_reply(0x3F, 0x02);
        assert_eq!(block_on(p.begin()), Ok(()));
        assert_eq!(p.transport().tx[3], 0x0C);
    }

    #[test]
    fn begin_without_reply_times_out() {
        let mut p = player();
        assert_eq!(block_on(p.begin()), Err(FaultCode::timeout()));
    }

    #[test]
    fn begin_reports_missing_card() {
        let mut p = player();
        p.transport_mut().queue_reply(0x40, 1);
        assert_eq!(block_on(p.begin()), Err(FaultCode::module_error(1)));
    }
}
