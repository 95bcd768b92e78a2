//! Dimmer knob demo
//!
//! Auto-dimming display backlight on the Raspberry Pi Pico 2, with a rotary
//! encoder for manual brightness and a push button to switch modes.
//!
//! - Turning the knob sets the brightness by hand (automatic mode off).
//! - A short press applies the knob position again.
//! - A long press hands control back to the light sensor.
//!
//! # Wiring
//!
//! | Signal      | Pico 2 Pin | Notes                          |
//! |-------------|------------|--------------------------------|
//! | LDR divider | GP26       | ADC0                           |
//! | Backlight   | GP16       | PWM slice 0, channel A         |
//! | Knob A      | GP10       | Active-low, pull-up enabled    |
//! | Knob B      | GP11       | Active-low, pull-up enabled    |
//! | Button      | GP12       | Active-low, pull-up enabled    |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp as hal;
use embassy_rp::adc::{self, Adc, Channel};
use embassy_rp::block::ImageDef;
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::pwm::{self, Pwm};
use embassy_time::{Delay, Duration, Ticker};
use {defmt_rtt as _, panic_probe as _};

use common_controls::platform::{AnalogInput, EmbassyClock};
use common_controls::{BacklightController, ButtonReader, Press, QuadratureEncoder};

/// Tell the Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = hal::block::ImageDef::secure_exe();

/// Main loop period. Fast enough to poll the knob instead of using
/// pin interrupts.
const LOOP_PERIOD_MS: u64 = 1;

/// Light-dependent resistor on one ADC channel.
struct LightSensor<'d> {
    adc: Adc<'d, adc::Blocking>,
    channel: Channel<'d>,
}

impl AnalogInput for LightSensor<'_> {
    type Error = adc::Error;

    fn read(&mut self) -> Result<u16, Self::Error> {
        self.adc.blocking_read(&mut self.channel)
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("dimmer-knob starting");

    // --- Light sensor (GP26 = ADC0) ---
    let sensor = LightSensor {
        adc: Adc::new_blocking(p.ADC, adc::Config::default()),
        channel: Channel::new_pin(p.PIN_26, Pull::None),
    };

    // --- Backlight PWM (GP16), 8-bit resolution ---
    let mut pwm_config = pwm::Config::default();
    pwm_config.top = 255;
    let (led, _) = Pwm::new_output_a(p.PWM_SLICE0, p.PIN_16, pwm_config).split();
    let Some(led) = led else {
        error!("PWM channel A unavailable");
        return;
    };

    // --- Knob and button ---
    let knob_a = Input::new(p.PIN_10, Pull::Up);
    let knob_b = Input::new(p.PIN_11, Pull::Up);
    let button_pin = Input::new(p.PIN_12, Pull::Up);

    let mut backlight = BacklightController::new(sensor, led, EmbassyClock, Delay, 128);
    backlight.set_limits(50, 3000, 20, 255, false);
    if backlight.init().is_err() {
        warn!("Backlight init failed");
    }

    let mut knob = QuadratureEncoder::new(knob_a, knob_b, EmbassyClock, 0);
    knob.reset(i32::from(backlight.brightness()), 0, 255, 1, 8, false);

    let mut button = ButtonReader::polled(button_pin, EmbassyClock);

    info!("dimmer-knob running");

    let mut last_knob = knob.read();
    let mut ticker = Ticker::every(Duration::from_millis(LOOP_PERIOD_MS));
    loop {
        ticker.next().await;

        // Pin reads on embassy-rp are infallible.
        let _ = knob.change_intr();
        let position = knob.read();
        if position != last_knob {
            last_knob = position;
            debug!("Knob: {}", position);
            if backlight.set_brightness(position as u8).is_err() {
                warn!("Backlight write failed");
            }
        }

        match button.button_check() {
            Ok(Press::Short) => {
                info!("Manual brightness {}", position);
                if backlight.set_brightness(position as u8).is_err() {
                    warn!("Backlight write failed");
                }
            }
            Ok(Press::Long) => {
                info!("Automatic brightness");
                if backlight.turn_auto(true).is_err() {
                    warn!("Backlight adjust failed");
                }
            }
            Ok(Press::None) | Err(_) => {}
        }

        if backlight.adjust().is_err() {
            warn!("Backlight adjust failed");
        }
    }
}
