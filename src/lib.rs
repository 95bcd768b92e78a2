//! Backlight, button and rotary encoder helpers for small embedded devices.
//!
//! Three independent components, each owning the hardware it drives and
//! meant to be polled from a cooperative main loop or fed from pin
//! interrupts:
//!
//! - [`BacklightController`]: fades a PWM backlight towards a target derived
//!   from a smoothed light-sensor reading or a clock-based night window.
//! - [`ButtonReader`]: debounced push button with short/long press
//!   classification and auto-repeat ticks, polled or interrupt driven.
//! - [`QuadratureEncoder`]: interrupt-driven rotary encoder with
//!   acceleration and bounded or wrapping position.
//!
//! Hardware is injected: digital inputs and the PWM channel through
//! `embedded-hal` 1.0 traits, the light sensor, millisecond clock and wall
//! clock through the traits in [`platform`]. Wrap a component in
//! [`Shared`] to use it from both an interrupt and the main loop.
//!
//! # Quick start
//!
//! ```ignore
//! use common_controls::{BacklightController, ButtonReader, Press, QuadratureEncoder};
//! use common_controls::platform::EmbassyClock;
//!
//! let mut backlight = BacklightController::new(light_sensor, led_pwm, EmbassyClock, Delay, 128);
//! backlight.set_limits(50, 500, 20, 200, true);
//! backlight.init()?;
//!
//! let mut button = ButtonReader::polled(button_pin, EmbassyClock);
//! let mut knob = QuadratureEncoder::new(knob_a, knob_b, EmbassyClock, 0);
//! knob.reset(128, 0, 255, 1, 8, false);
//!
//! loop {
//!     knob.change_intr()?;
//!     if button.button_check()? == Press::Long {
//!         backlight.turn_auto(true)?;
//!     }
//!     backlight.adjust()?;
//! }
//! ```
//!
//! # Features
//!
//! - **`defmt`**: structured logging via `defmt` and `defmt::Format` on
//!   the public types.
//! - **`embassy`**: [`platform::EmbassyClock`], a [`platform::Clock`] backed
//!   by `embassy-time`.

#![no_std]

pub mod backlight;
pub mod button;
pub mod encoder;
pub mod error;
pub mod platform;
pub mod shared;

#[cfg(test)]
mod sim;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use backlight::{BacklightController, BacklightTiming, LightLimits};
pub use button::{ButtonReader, ButtonTiming, EdgeLatched, Polled, Press, PressClassifier};
pub use encoder::QuadratureEncoder;
pub use error::ControlError;
pub use shared::Shared;
