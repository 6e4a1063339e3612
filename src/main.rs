//! Firmware for one node of a bus-connected music box ensemble.
//!
//! # Overview
//!
//! Up to sixteen nodes share an RS-485 bus with a host. The host loads a
//! song (a list of note, duration pairs) into each node, then starts them
//! together. Each node:
//! - Receives and checksums song transfers addressed to its node ID
//! - Plays the song on a buzzer, one note at a time
//! - Pauses at sync barriers until the host releases every node at once
//! - Acknowledges loads, and (node 0 only) reports song end and barrier arrival
//!
//! # Hardware
//!
//! - **MCU**: STM32L031G6U6 (Cortex-M0+)
//! - **Bus**: MAX485 half-duplex transceiver on USART2, 115200 8N1
//! - **Buzzer**: driven from a TIM2 PWM channel
//! - **Buttons**: two push buttons to select the node ID
//! - **Node ID storage**: reserved page at the top of program flash
//!
//! # Task Layout
//!
//! - The USART interrupt only moves bytes into ring buffers
//! - [`bus::bus_rx_task`] parses frames, stores song data, posts controls
//!   and acknowledgements
//! - [`bus::bus_tx_task`] transmits queued acknowledgements
//! - [`controls::controls_task`] debounces the node ID buttons
//! - The main loop owns playback: it applies controls, steps through the
//!   song and times each note with the embassy timer
//!
//! # Module Organization
//!
//! - [`bus`] - RS-485 receive and transmit tasks
//! - [`buzzer`] - PWM tone output
//! - [`controls`] - Node ID button debouncing
//! - [`config`] - Compile-time constants
//! - [`hardware`] - Pin mappings and peripheral initialization

#![no_std]
#![no_main]

mod bus;
mod buzzer;
mod config;
mod controls;
mod hardware;

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_stm32::{
    Config,
    rcc::{LsConfig, LseConfig, mux::ClockMux},
    time::Hertz,
};
use embassy_time::Timer;
use musicbox_core::{Mode, NodeSelector, NodeStore, PlayerPort, SharedState, Step};
use {defmt_rtt as _, panic_probe as _};

use bus::{bus_rx_task, bus_tx_task};
use buzzer::Buzzer;
#[cfg(feature = "debug-mode")]
use config::DEBUGGER_ATTACH_SECS;
use controls::{BUTTON_SIGNAL, Button, controls_task};
use hardware::Peripherals;

/// State shared between the bus tasks and the main loop.
static SHARED: SharedState = SharedState::new();

/// Creates the clock configuration for STM32L031.
///
/// # Clock Settings
///
/// - **HSI16**: 16 MHz internal oscillator as system clock, accurate enough
///   for 115200 baud
/// - **System clock**: HSI (no PLL)
/// - **LSE**: 32.768 kHz external crystal for RTC and the embassy time driver
/// - **Voltage scale**: Range 1 (1.8V core, required for 16 MHz)
///
/// # Returns
///
/// Configured RCC settings for embassy-stm32 initialization
fn create_clock_config() -> embassy_stm32::rcc::Config {
    embassy_stm32::rcc::Config {
        msi: None,
        hsi: true,
        hse: None,
        pll: None,
        sys: embassy_stm32::rcc::Sysclk::HSI,
        ahb_pre: embassy_stm32::rcc::AHBPrescaler::DIV1,
        apb1_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        apb2_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        ls: LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz::hz(32768),
                mode: embassy_stm32::rcc::LseMode::Oscillator(embassy_stm32::rcc::LseDrive::Low),
            }),
        },
        voltage_scale: embassy_stm32::rcc::VoltageScale::RANGE1,
        mux: ClockMux::default(),
    }
}

/// Main entry point for the music box node firmware.
///
/// # Initialization Sequence
///
/// 1. Configure clocks (16 MHz HSI)
/// 2. Initialize STM32 peripherals
/// 3. Restore the node ID from flash (corrupt or erased values become 0)
/// 4. Split the shared state into per-task ports
/// 5. Spawn the bus and button tasks
/// 6. Enter the playback loop
///
/// # Main Loop
///
/// Runs one iteration per [`Mode`]:
/// - Configuring: wait for a bus control or a button press
/// - Playing: play the next song entry
/// - BlockedOnSync: wait for the sync acknowledgement (or a stop)
///
/// # Spawned Tasks
///
/// - **bus_rx_task**: frame parsing and command dispatch
/// - **bus_tx_task**: acknowledgement transmission
/// - **controls_task**: node ID button debouncing
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = Config::default();
    config.rcc = create_clock_config();

    let p = embassy_stm32::init(config);

    info!("Music box node starting...");

    #[cfg(feature = "debug-mode")]
    {
        defmt::info!("Waiting {} seconds for debugger connection...", DEBUGGER_ATTACH_SECS);
        Timer::after_secs(DEBUGGER_ATTACH_SECS).await;
    }

    #[cfg(feature = "debug-mode")]
    defmt::info!("Initializing peripherals...");

    let Peripherals {
        bus,
        driver_enable,
        mut buzzer,
        buttons,
        store,
    } = Peripherals::new(p);

    let mut selector = NodeSelector::new(store);
    match selector.restore() {
        Ok(id) => info!("Restored node ID {}", id.get()),
        Err(e) => warn!("Node ID read failed: {}, using {}", e, selector.current().get()),
    }

    let (bus_port, mut player, responses) = SHARED.split().unwrap();
    player.set_node_id(selector.current()).unwrap();

    #[cfg(feature = "debug-mode")]
    defmt::info!("Spawning bus and button tasks...");

    let (tx, rx) = bus.split();
    spawner.spawn(bus_rx_task(rx, bus_port)).unwrap();
    spawner.spawn(bus_tx_task(tx, driver_enable, responses)).unwrap();
    spawner.spawn(controls_task(buttons)).unwrap();

    info!("Listening as node {}", player.node_id().get());

    loop {
        let previous = player.mode();
        match previous {
            Mode::Configuring => configure(&mut player, &mut selector).await,
            Mode::Playing => play_step(&mut player, &mut buzzer).await,
            Mode::BlockedOnSync => {
                let mode = player.wait_control().await;
                info!("Sync wait over, now {}", mode);
            }
        }

        // Presses made while playing are stale once the node is back in
        // configuration.
        if previous != Mode::Configuring && player.mode() == Mode::Configuring {
            BUTTON_SIGNAL.reset();
        }
    }
}

/// Waits in the configuring state for either a bus control or a button.
///
/// Button presses step the node ID and persist it.
async fn configure<S>(player: &mut PlayerPort<'static>, selector: &mut NodeSelector<S>)
where
    S: NodeStore,
    S::Error: defmt::Format,
{
    match select(player.wait_control(), BUTTON_SIGNAL.wait()).await {
        Either::First(Mode::Configuring) => {}
        Either::First(mode) => {
            if !player.data_ready() {
                warn!("Starting without a complete song");
            }
            info!("Playback started ({}), {} entries loaded", mode, SHARED.song_len());
        }
        Either::Second(button) => {
            let persisted = match button {
                Button::Up => selector.increment(),
                Button::Down => selector.decrement(),
            };
            if let Err(e) = persisted {
                warn!("Failed to persist node ID: {}", e);
            }

            let id = selector.current();
            match player.set_node_id(id) {
                Ok(()) => info!("Node ID set to {}", id.get()),
                Err(e) => warn!("Node ID change to {} refused: {}", id.get(), e),
            }
        }
    }
}

/// Plays one song entry, holding the tone or rest for its duration.
async fn play_step(player: &mut PlayerPort<'static>, buzzer: &mut Buzzer) {
    match player.step() {
        Step::Tone {
            pitch,
            reload,
            duration,
        } => {
            defmt::debug!("Note {} for {} ms", pitch, duration);

            buzzer.play(reload);
            Timer::after_millis(u64::from(duration)).await;
            buzzer.silence();
        }
        Step::Rest { duration } => Timer::after_millis(u64::from(duration)).await,
        Step::Ended { .. } => info!("Song ended"),
        Step::SyncWait { .. } => info!("Waiting for sync at entry {}", player.playback().cursor()),
        Step::Skipped { pitch } => warn!("Skipping unplayable pitch {}", pitch),
        Step::Idle => {}
    }
}
