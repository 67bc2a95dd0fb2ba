//! Host-side stand-ins for the board: pins, LED, delay, pot, transport and
//! playback module.

#![allow(dead_code)]

use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::digital::{self, ErrorType, InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use soundboard::config::NUM_SWITCHES;
use soundboard::player::frame::{Command, Frame};
use soundboard::{
    Equalizer, Error, FaultCode, OutputDevice, PlaybackModule, Soundboard, StatusLed, SwitchBank,
    Transport, VolumeController, VolumeSensor,
};

/// Switch contact; `true` = closed (pin pulled low). A broken switch fails
/// every read.
#[derive(Clone, Default)]
pub struct MockSwitch {
    closed: Rc<Cell<bool>>,
    broken: Rc<Cell<bool>>,
}

impl MockSwitch {
    pub fn press(&self) {
        self.closed.set(true);
    }

    pub fn release(&self) {
        self.closed.set(false);
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.set(broken);
    }

    fn read(&self) -> Result<bool, PinFault> {
        if self.broken.get() {
            return Err(PinFault);
        }
        Ok(self.closed.get())
    }
}

#[derive(Debug)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl ErrorType for MockSwitch {
    type Error = PinFault;
}

impl InputPin for MockSwitch {
    fn is_high(&mut self) -> Result<bool, PinFault> {
        self.read().map(|closed| !closed)
    }

    fn is_low(&mut self) -> Result<bool, PinFault> {
        self.read()
    }
}

/// Everything the LED and the delay did, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trace {
    Led(bool),
    Delay(u32),
}

pub type Timeline = Rc<RefCell<Vec<Trace>>>;

pub struct MockLed(pub Timeline);

impl ErrorType for MockLed {
    type Error = Infallible;
}

impl OutputPin for MockLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().push(Trace::Led(false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().push(Trace::Led(true));
        Ok(())
    }
}

pub struct MockDelay(pub Timeline);

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().push(Trace::Delay(ns / 1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(Trace::Delay(ms));
    }
}

/// Number of LED on-pulses in a timeline.
pub fn blinks(timeline: &[Trace]) -> usize {
    timeline.iter().filter(|t| **t == Trace::Led(true)).count()
}

#[derive(Clone, Default)]
pub struct MockPot(pub Rc<Cell<u16>>);

impl MockPot {
    pub fn set(&self, raw: u16) {
        self.0.set(raw);
    }
}

impl VolumeSensor for MockPot {
    async fn read_raw(&mut self) -> u16 {
        self.0.get()
    }
}

/// Commands the loop sent to the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sent {
    Play(u16),
    Volume(u8),
    Equalizer(Equalizer),
    Output(OutputDevice),
}

pub struct MockPlayer {
    pub begin: Result<(), FaultCode>,
    pub sent: Vec<Sent>,
    pub events: VecDeque<FaultCode>,
}

impl Default for MockPlayer {
    fn default() -> Self {
        Self {
            begin: Ok(()),
            sent: Vec::new(),
            events: VecDeque::new(),
        }
    }
}

impl MockPlayer {
    pub fn plays(&self) -> Vec<u16> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Play(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    pub fn volumes(&self) -> Vec<u8> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Volume(v) => Some(*v),
                _ => None,
            })
            .collect()
    }
}

impl PlaybackModule for MockPlayer {
    async fn begin(&mut self) -> Result<(), FaultCode> {
        self.begin
    }

    async fn play_mp3_folder(&mut self, track: u16) -> Result<(), Error> {
        self.sent.push(Sent::Play(track));
        Ok(())
    }

    async fn set_volume(&mut self, level: u8) -> Result<(), Error> {
        self.sent.push(Sent::Volume(level));
        Ok(())
    }

    async fn set_equalizer(&mut self, eq: Equalizer) -> Result<(), Error> {
        self.sent.push(Sent::Equalizer(eq));
        Ok(())
    }

    async fn set_output_device(&mut self, device: OutputDevice) -> Result<(), Error> {
        self.sent.push(Sent::Output(device));
        Ok(())
    }

    async fn poll_event(&mut self) -> Option<FaultCode> {
        self.events.pop_front()
    }
}

/// UART double: scripted replies in, sent bytes out.
#[derive(Default)]
pub struct ScriptedUart {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
}

impl ScriptedUart {
    pub fn reply(&mut self, command: u8, param: u16) {
        let mut frame = Frame::new(Command::Reset, param, false);
        frame.command = command;
        self.rx.extend(frame.encode());
    }

    /// Command bytes of every frame sent so far.
    pub fn sent_commands(&self) -> Vec<u8> {
        self.tx.chunks(10).map(|f| f[3]).collect()
    }
}

impl Transport for ScriptedUart {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.tx.extend_from_slice(bytes);
        Ok(())
    }

    async fn recv_byte(&mut self, _timeout_ms: u32) -> Result<Option<u8>, Error> {
        Ok(self.rx.pop_front())
    }
}

pub type TestBoard<M> = Soundboard<M, MockSwitch, MockPot, MockLed, MockDelay, NUM_SWITCHES>;

/// A board around `player`, with handles to the switches, pot and timeline.
pub struct Rig<M> {
    pub board: TestBoard<M>,
    pub switches: [MockSwitch; NUM_SWITCHES],
    pub pot: MockPot,
    pub timeline: Timeline,
}

pub fn rig<M: PlaybackModule>(player: M, pot_raw: u16) -> Rig<M> {
    let switches: [MockSwitch; NUM_SWITCHES] = Default::default();
    let pot = MockPot::default();
    pot.set(pot_raw);
    let timeline: Timeline = Rc::default();

    let bank = SwitchBank::new(switches.clone(), soundboard::config::DEBOUNCE_MS, 0);
    let board = Soundboard::new(
        player,
        bank,
        VolumeController::new(pot.clone()),
        StatusLed::new(MockLed(timeline.clone())),
        MockDelay(timeline.clone()),
    );

    Rig {
        board,
        switches,
        pot,
        timeline,
    }
}
