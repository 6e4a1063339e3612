//! Node ID selection buttons.
//!
//! Two active-low push buttons step the node ID up and down. Presses are
//! debounced here and forwarded to the main loop, which only acts on them
//! while the node is configuring.

use embassy_futures::select::{Either, select};
use embassy_stm32::exti::ExtiInput;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::Timer;

use crate::config::BUTTON_DEBOUNCE_MS;

/// A confirmed button press.
#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Button {
    /// Next node ID (15 wraps to 0)
    Up,
    /// Previous node ID (0 wraps to 15)
    Down,
}

/// Latest confirmed press, waiting for the main loop.
///
/// A press that arrives before the previous one was taken replaces it.
pub static BUTTON_SIGNAL: Signal<CriticalSectionRawMutex, Button> = Signal::new();

/// The two node ID buttons.
pub struct Buttons {
    /// Increment button (PB6)
    up: ExtiInput<'static>,
    /// Decrement button (PB7)
    down: ExtiInput<'static>,
}

impl Buttons {
    /// Creates the button pair from EXTI-capable inputs with pull-ups.
    pub fn new(up: ExtiInput<'static>, down: ExtiInput<'static>) -> Self {
        Self { up, down }
    }

    fn input(&mut self, button: Button) -> &mut ExtiInput<'static> {
        match button {
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
        }
    }
}

/// Async task that debounces both buttons.
///
/// Waits for a falling edge, lets the contacts settle for
/// [`BUTTON_DEBOUNCE_MS`], and signals the press if the button is still
/// held. It then waits for release so a held button counts once.
#[embassy_executor::task]
pub async fn controls_task(mut buttons: Buttons) {
    loop {
        let button = match select(
            buttons.up.wait_for_falling_edge(),
            buttons.down.wait_for_falling_edge(),
        )
        .await
        {
            Either::First(()) => Button::Up,
            Either::Second(()) => Button::Down,
        };

        Timer::after_millis(BUTTON_DEBOUNCE_MS).await;

        let input = buttons.input(button);
        if input.is_low() {
            BUTTON_SIGNAL.signal(button);
            input.wait_for_high().await;
        }
    }
}
