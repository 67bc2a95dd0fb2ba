//! Playback module frame codec.
//!
//! Layout (10 bytes, both directions):
//! ```text
//! Byte 0: 0x7E start
//! Byte 1: 0xFF version
//! Byte 2: 0x06 length (bytes 1..=6)
//! Byte 3: command
//! Byte 4: feedback (1 = module must answer with an ack frame)
//! Byte 5-6: parameter, big-endian
//! Byte 7-8: checksum, big-endian: 0 - sum(bytes 1..=6)
//! Byte 9: 0xEF end
//! ```

use crate::fault::{Category, FaultCode};

/// Frame size in bytes.
pub const FRAME_LEN: usize = 10;

const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LENGTH: u8 = 0x06;
const END: u8 = 0xEF;

/// Commands sent to the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    SetVolume = 0x06,
    SetEqualizer = 0x07,
    SetOutputDevice = 0x09,
    Reset = 0x0C,
    PlayMp3Folder = 0x12,
}

/// Reply command codes.
mod reply {
    pub const INSERTED: u8 = 0x3A;
    pub const REMOVED: u8 = 0x3B;
    pub const USB_FINISHED: u8 = 0x3C;
    pub const PLAY_FINISHED: u8 = 0x3D;
    pub const FLASH_FINISHED: u8 = 0x3E;
    pub const ONLINE: u8 = 0x3F;
    pub const ERROR: u8 = 0x40;
    pub const ACK: u8 = 0x41;
    pub const QUERY_FIRST: u8 = 0x42;
    pub const QUERY_LAST: u8 = 0x4F;
}

/// Device bits in insert/remove/online replies.
const DEVICE_USB: u16 = 0x01;
const DEVICE_CARD: u16 = 0x02;

/// Why a frame was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    Version(u8),
    Length(u8),
    End(u8),
    Checksum { expected: u16, actual: u16 },
}

/// A decoded frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub command: u8,
    pub feedback: bool,
    pub param: u16,
}

/// Checksum over version, length, command, feedback and parameter bytes.
pub fn checksum(body: &[u8]) -> u16 {
    let sum = body
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
    0u16.wrapping_sub(sum)
}

impl Frame {
    pub const fn new(command: Command, param: u16, feedback: bool) -> Self {
        Self {
            command: command as u8,
            feedback,
            param,
        }
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let [ph, pl] = self.param.to_be_bytes();
        let mut buf = [
            START,
            VERSION,
            LENGTH,
            self.command,
            u8::from(self.feedback),
            ph,
            pl,
            0,
            0,
            END,
        ];
        let [ch, cl] = checksum(&buf[1..7]).to_be_bytes();
        buf[7] = ch;
        buf[8] = cl;
        buf
    }
}

/// Byte-at-a-time frame decoder.
///
/// Bytes before a start marker are skipped. A bad version, length or end
/// byte, or a checksum mismatch, yields an error and resynchronises.
#[derive(Clone, Debug, Default)]
pub struct FrameDecoder {
    buf: [u8; FRAME_LEN],
    len: usize,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            buf: [0; FRAME_LEN],
            len: 0,
        }
    }

    /// True while a frame has started but not finished.
    pub fn in_progress(&self) -> bool {
        self.len > 0
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    pub fn push(&mut self, byte: u8) -> Option<Result<Frame, FrameError>> {
        if self.len == 0 {
            if byte == START {
                self.buf[0] = byte;
                self.len = 1;
            }
            return None;
        }

        let index = self.len;
        self.buf[index] = byte;
        self.len += 1;

        let err = match index {
            1 if byte != VERSION => Some(FrameError::Version(byte)),
            2 if byte != LENGTH => Some(FrameError::Length(byte)),
            9 if byte != END => Some(FrameError::End(byte)),
            _ => None,
        };
        if let Some(e) = err {
            self.reset();
            return Some(Err(e));
        }
        if index < FRAME_LEN - 1 {
            return None;
        }

        self.reset();
        let expected = checksum(&self.buf[1..7]);
        let actual = u16::from_be_bytes([self.buf[7], self.buf[8]]);
        if expected != actual {
            return Some(Err(FrameError::Checksum { expected, actual }));
        }

        Some(Ok(Frame {
            command: self.buf[3],
            feedback: self.buf[4] != 0,
            param: u16::from_be_bytes([self.buf[5], self.buf[6]]),
        }))
    }
}

/// Meaning of a frame received from the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Command acknowledged.
    Ack,
    /// Status code for the fault reporter.
    Status(FaultCode),
}

impl From<Frame> for Response {
    fn from(frame: Frame) -> Self {
        let param = frame.param;
        let status = |category| Response::Status(FaultCode::new(category, param));
        let by_device = |usb, card| {
            if param & DEVICE_USB != 0 {
                status(usb)
            } else if param & DEVICE_CARD != 0 {
                status(card)
            } else {
                status(Category::Feedback)
            }
        };

        match frame.command {
            reply::ACK => Response::Ack,
            reply::PLAY_FINISHED => status(Category::PlayFinished),
            reply::ONLINE => {
                if param & (DEVICE_USB | DEVICE_CARD) == DEVICE_USB | DEVICE_CARD {
                    status(Category::CardUsbOnline)
                } else {
                    by_device(Category::UsbOnline, Category::CardOnline)
                }
            }
            reply::INSERTED => by_device(Category::UsbInserted, Category::CardInserted),
            reply::REMOVED => by_device(Category::UsbRemoved, Category::CardRemoved),
            reply::ERROR => status(Category::Error),
            reply::USB_FINISHED | reply::FLASH_FINISHED => status(Category::Feedback),
            reply::QUERY_FIRST..=reply::QUERY_LAST => status(Category::Feedback),
            _ => Response::Status(FaultCode::wrong_stack()),
        }
    }
}
