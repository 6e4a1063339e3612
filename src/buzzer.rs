//! Buzzer tone output.
//!
//! The buzzer is driven by TIM2 channel 1 in PWM mode at 50 % duty, which
//! gives the same square wave as toggling the line on every timer overflow
//! without waking the CPU. Pitches arrive as reload values from the pitch
//! tables and are converted back into a frequency with
//! [`TimerReload::tone_hz`].

use embassy_stm32::peripherals::TIM2;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use musicbox_core::TimerReload;

/// Square-wave buzzer on a single PWM channel.
pub struct Buzzer {
    /// TIM2 with channel 1 routed to the buzzer pin
    pwm: SimplePwm<'static, TIM2>,
}

impl Buzzer {
    /// Wraps a configured PWM timer and makes sure the output starts silent.
    pub fn new(pwm: SimplePwm<'static, TIM2>) -> Self {
        let mut buzzer = Self { pwm };
        buzzer.silence();
        buzzer
    }

    /// Starts a tone for `reload` and leaves it sounding.
    ///
    /// The reserved silent reload (and any reload below 1 Hz) keeps the
    /// output off.
    pub fn play(&mut self, reload: TimerReload) {
        let hz = reload.tone_hz();
        if hz == 0 {
            self.silence();
            return;
        }

        self.pwm.set_frequency(Hertz::hz(hz));
        // Max duty changes with the frequency, so set duty afterwards.
        let mut channel = self.pwm.ch1();
        channel.set_duty_cycle_percent(50);
        channel.enable();
    }

    /// Stops the output. The pin idles low.
    pub fn silence(&mut self) {
        self.pwm.ch1().disable();
    }
}
