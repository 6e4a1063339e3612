//! Hardware abstraction and peripheral initialization.
//!
//! This module defines the pin mappings and peripheral initialization
//! for the music box node board.
//!
//! # Pin Assignments
//!
//! ## RS-485 Bus (USART2 via MAX485)
//! - **PA9**: TX - Driver input (DI)
//! - **PA10**: RX - Receiver output (RO)
//! - **PA1**: DE/RE_N - Driver enable, tied to receiver enable (high = transmit)
//!
//! ## Buzzer
//! - **PA0**: TIM2_CH1 - Square wave to the buzzer driver
//!
//! ## Node ID Buttons (active-low, internal pull-up)
//! - **PB6**: KEY_UP - Increment node ID
//! - **PB7**: KEY_DOWN - Decrement node ID
//!
//! ## Low Power & RTC
//! - **PC14**: OSC32_IN - 32.768 kHz crystal input
//! - **PC15**: OSC32_OUT - 32.768 kHz crystal output
//!
//! ## Debug (SWD)
//! - **PA13**: SWDIO
//! - **PA14**: SWCLK
//!
//! # Node ID Storage
//!
//! The last [`STORE_PAGE_SIZE`] bytes of program flash hold the node ID.
//! Writes go through [`RmwNorFlashStorage`], which erases and rewrites the
//! page around the changed byte.

use embassy_stm32::exti::ExtiInput;
use embassy_stm32::flash::{Blocking, Flash};
use embassy_stm32::gpio::{Level, Output, OutputType, Pull, Speed};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::usart::{self, BufferedUart};
use embassy_stm32::{bind_interrupts, peripherals};
use embedded_storage::nor_flash::{ReadNorFlash, RmwNorFlashStorage};
use musicbox_core::StorageStore;
use static_cell::StaticCell;

use crate::buzzer::Buzzer;
use crate::config::{BUS_BAUD_RATE, BUS_RX_BUFFER_LEN, BUS_TX_BUFFER_LEN, BUZZER_IDLE_HZ, STORE_PAGE_SIZE};
use crate::controls::Buttons;

bind_interrupts!(struct Irqs {
    USART2 => usart::BufferedInterruptHandler<peripherals::USART2>;
});

/// Persistent node ID store on the reserved flash page.
pub type FlashStore = StorageStore<RmwNorFlashStorage<'static, Flash<'static, Blocking>>>;

static BUS_TX_BUFFER: StaticCell<[u8; BUS_TX_BUFFER_LEN]> = StaticCell::new();
static BUS_RX_BUFFER: StaticCell<[u8; BUS_RX_BUFFER_LEN]> = StaticCell::new();
static STORE_MERGE_BUFFER: StaticCell<[u8; STORE_PAGE_SIZE]> = StaticCell::new();

/// Top-level peripheral container for the music box node.
///
/// Owns all hardware drivers and provides initialization
/// from STM32 peripheral singleton.
pub struct Peripherals {
    /// Interrupt-buffered UART on the RS-485 bus
    pub bus: BufferedUart<'static>,
    /// RS-485 transceiver direction (high = driving the bus)
    pub driver_enable: Output<'static>,
    /// Tone output
    pub buzzer: Buzzer,
    /// Node ID selection buttons
    pub buttons: Buttons,
    /// Node ID persistence
    pub store: FlashStore,
}

impl Peripherals {
    /// Initializes all peripherals from STM32 peripheral singleton.
    ///
    /// # Initial States
    ///
    /// - PA1 (DE/RE_N): Low (listening on the bus)
    /// - TIM2_CH1: configured at [`BUZZER_IDLE_HZ`], output disabled
    /// - USART2: [`BUS_BAUD_RATE`] 8N1, receive interrupt running
    ///
    /// # Panics
    ///
    /// If the USART rejects its configuration or this is called twice
    /// (the static buffers can only be handed out once).
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        let mut uart_config = usart::Config::default();
        uart_config.baudrate = BUS_BAUD_RATE;

        let bus = BufferedUart::new(
            p.USART2,
            p.PA10,
            p.PA9,
            BUS_TX_BUFFER.init([0; BUS_TX_BUFFER_LEN]),
            BUS_RX_BUFFER.init([0; BUS_RX_BUFFER_LEN]),
            Irqs,
            uart_config,
        )
        .unwrap();

        let pwm = SimplePwm::new(
            p.TIM2,
            Some(PwmPin::new(p.PA0, OutputType::PushPull)),
            None,
            None,
            None,
            Hertz::hz(BUZZER_IDLE_HZ),
            CountingMode::EdgeAlignedUp,
        );

        let flash = Flash::new_blocking(p.FLASH);
        let store_base = (flash.capacity() - STORE_PAGE_SIZE) as u32;
        let storage = RmwNorFlashStorage::new(flash, STORE_MERGE_BUFFER.init([0; STORE_PAGE_SIZE]));

        Self {
            bus,
            driver_enable: Output::new(p.PA1, Level::Low, Speed::Low),
            buzzer: Buzzer::new(pwm),
            buttons: Buttons::new(
                ExtiInput::new(p.PB6, p.EXTI6, Pull::Up),
                ExtiInput::new(p.PB7, p.EXTI7, Pull::Up),
            ),
            store: StorageStore::new(storage, store_base),
        }
    }
}
