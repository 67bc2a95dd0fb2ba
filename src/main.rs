//! Soundboard firmware entry point (nRF52840).
//!
//! Wires the panel switches, volume pot, status LED and the MP3 module UART
//! into [`Soundboard`] and runs its loop on a single embassy task. The loop
//! is strictly sequential; a `Restart` from boot or any step resets the chip.

#![no_std]
#![no_main]

mod board;

use board::{PotSensor, UartLink};
use defmt::info;
use embassy_executor::Spawner;
use embassy_nrf::buffered_uarte::{self, BufferedUarte};
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::saadc::{self, ChannelConfig, Gain, Reference, Resolution, Saadc};
use embassy_nrf::{bind_interrupts, peripherals, uarte};
use embassy_time::Delay;
use soundboard::config::{DEBOUNCE_MS, NUM_SWITCHES, PLAYER_BAUD};
use soundboard::{Control, DfPlayer, Soundboard, StatusLed, SwitchBank, VolumeController};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    UARTE0_UART0 => buffered_uarte::InterruptHandler<peripherals::UARTE0>;
});

// The UARTE baud rate below is hard-wired.
const _: () = assert!(PLAYER_BAUD == 9600);

static UART_RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static UART_TX_BUF: StaticCell<[u8; 32]> = StaticCell::new();

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("soundboard starting");

    // Status LED (active high, off until the module is up).
    let led = StatusLed::new(Output::new(p.P0_27, Level::Low, OutputDrive::Standard));

    // Track switches, pulled up, pressed = low.
    let pins: [Input<'static>; NUM_SWITCHES] = [
        Input::new(p.P1_01, Pull::Up),
        Input::new(p.P1_02, Pull::Up),
        Input::new(p.P1_03, Pull::Up),
        Input::new(p.P1_04, Pull::Up),
        Input::new(p.P1_05, Pull::Up),
        Input::new(p.P1_06, Pull::Up),
        Input::new(p.P1_07, Pull::Up),
        Input::new(p.P1_08, Pull::Up),
        Input::new(p.P1_10, Pull::Up),
        Input::new(p.P1_11, Pull::Up),
        Input::new(p.P1_12, Pull::Up),
        Input::new(p.P1_13, Pull::Up),
        Input::new(p.P1_14, Pull::Up),
        Input::new(p.P1_15, Pull::Up),
    ];
    let switches = SwitchBank::new(pins, DEBOUNCE_MS, board::now_ms());

    // Volume pot: 10-bit, full scale = VDD.
    let mut saadc_config = saadc::Config::default();
    saadc_config.resolution = Resolution::_10BIT;
    let mut channel = ChannelConfig::single_ended(p.P0_03);
    channel.gain = Gain::GAIN1_4;
    channel.reference = Reference::VDD1_4;
    let saadc = Saadc::new(p.SAADC, Irqs, saadc_config, [channel]);
    saadc.calibrate().await;
    let volume = VolumeController::new(PotSensor::new(saadc));

    // MP3 module UART, 9600 8N1.
    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = uarte::Baudrate::BAUD9600;
    let uart = BufferedUarte::new(
        p.UARTE0,
        p.TIMER0,
        p.PPI_CH0,
        p.PPI_CH1,
        p.PPI_GROUP0,
        Irqs,
        p.P0_22,
        p.P0_20,
        uart_config,
        UART_RX_BUF.init([0u8; 64]),
        UART_TX_BUF.init([0u8; 32]),
    );
    let player = DfPlayer::new(UartLink::new(uart), Delay);

    let mut soundboard = Soundboard::new(player, switches, volume, led, Delay);

    if soundboard.boot().await == Control::Restart {
        board::restart();
    }

    loop {
        if soundboard.step(board::now_ms()).await == Control::Restart {
            board::restart();
        }
    }
}
