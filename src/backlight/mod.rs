//! Automatic display backlight driven by a light sensor.
//!
//! [`BacklightController`] owns the light sensor, the PWM channel of the
//! backlight LED, a millisecond [`Clock`] and a busy-wait delay. Call
//! [`adjust()`](BacklightController::adjust) from the main loop as often
//! as convenient; it does two independently rate-limited jobs:
//!
//! 1. **Ramp**: every [`BacklightTiming::ramp_period_ms`] the brightness
//!    moves one unit towards the target, so changes fade in.
//! 2. **Recompute**: every [`BacklightTiming::sample_period_ms`] the target
//!    is derived again from the night window or the smoothed light level.
//!
//! ```text
//!  target
//!  day ─────────────────────────────┐           ┌── 0 (off in daylight)
//!                               ╱   │           │
//!                           ╱       │           │
//!  night ───────────────╱           │           │
//!        ─────────────┴─────────────┴───────────┴──── smoothed light
//!                   dark        daylight
//! ```
//!
//! Manual control through [`set_brightness()`](BacklightController::set_brightness)
//! switches the automatic mode off until
//! [`turn_auto(true)`](BacklightController::turn_auto).

mod average;
mod night;

pub use average::ExpAverage;
pub use night::{NightWindow, SECONDS_PER_TICK, TICKS_PER_DAY};

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::{ErrorType, SetDutyCycle};

use crate::error::ControlError;
use crate::platform::{AnalogInput, Clock, NoWallClock, WallClock};

/// Error type of a [`BacklightController`] over sensor `S` and LED `L`.
pub type BacklightError<S, L> =
    ControlError<<S as AnalogInput>::Error, <L as ErrorType>::Error>;

/// Customary start brightness for [`BacklightController::new`].
pub const DEFAULT_BRIGHTNESS: u8 = 128;

// ── Configuration ────────────────────────────────────────────────────────

/// Light thresholds and the brightness range they map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightLimits {
    /// Smoothed sensor values below this are night. Default: 50.
    pub dark_threshold: u16,
    /// Smoothed sensor values above this are full daylight. Default: 500.
    pub daylight_threshold: u16,
    /// Brightness used at night. Default: 50.
    pub night_brightness: u8,
    /// Brightness at the daylight threshold. Default: 150.
    pub day_brightness: u8,
    /// Switch the backlight off above the daylight threshold. Default: false.
    pub off_in_daylight: bool,
}

impl Default for LightLimits {
    fn default() -> Self {
        Self {
            dark_threshold: 50,
            daylight_threshold: 500,
            night_brightness: 50,
            day_brightness: 150,
            off_in_daylight: false,
        }
    }
}

impl LightLimits {
    /// Target brightness for a smoothed light level.
    ///
    /// Between the thresholds the light level is mapped linearly onto
    /// `[night_brightness, day_brightness]`. Degenerate limits (equal or
    /// swapped thresholds) are tolerated and never panic.
    pub fn target_for(&self, light: u16) -> u8 {
        if light < self.dark_threshold {
            return self.night_brightness;
        }
        if self.off_in_daylight && light > self.daylight_threshold {
            return 0;
        }

        let (lo, hi) = (i32::from(self.dark_threshold), i32::from(self.daylight_threshold));
        let (out_lo, out_hi) = (i32::from(self.night_brightness), i32::from(self.day_brightness));
        let light = constrain(i32::from(light), lo, hi);
        let mapped = map_range(light, lo, hi, out_lo, out_hi);
        constrain(mapped, out_lo, out_hi) as u8
    }
}

/// Rate limits of the two jobs done by [`BacklightController::adjust`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BacklightTiming {
    /// Minimum time between two one-unit brightness steps. Default: 5 ms.
    pub ramp_period_ms: u32,
    /// Minimum time between two target recomputations. Default: 200 ms.
    pub sample_period_ms: u32,
    /// Raw samples averaged by the sensor darkness check. Default: 4.
    pub dark_samples: u8,
    /// Busy wait after each darkness sample. Default: 20 ms.
    pub dark_sample_delay_ms: u32,
}

impl Default for BacklightTiming {
    fn default() -> Self {
        Self {
            ramp_period_ms: 5,
            sample_period_ms: 200,
            dark_samples: 4,
            dark_sample_delay_ms: 20,
        }
    }
}

// ── Controller ───────────────────────────────────────────────────────────

/// Backlight controller.
///
/// * `S`: light sensor ([`AnalogInput`])
/// * `L`: backlight PWM channel ([`SetDutyCycle`]); brightness `b` is
///   written as the duty fraction `b / 255`
/// * `K`: millisecond [`Clock`]
/// * `D`: busy-wait delay ([`DelayNs`])
/// * `W`: optional [`WallClock`] for the night window
pub struct BacklightController<S, L, K, D, W = NoWallClock> {
    sensor: S,
    led: L,
    clock: K,
    delay: D,
    wall_clock: W,

    limits: LightLimits,
    timing: BacklightTiming,
    night: NightWindow,
    average: ExpAverage,

    default_brightness: u8,
    brightness: u8,
    target: u8,
    auto: bool,

    last_ramp: Option<u32>,
    last_sample: Option<u32>,
}

impl<S, L, K, D> BacklightController<S, L, K, D, NoWallClock>
where
    S: AnalogInput,
    L: SetDutyCycle,
    K: Clock,
    D: DelayNs,
{
    /// Create a controller that will start at `default_brightness`.
    ///
    /// Nothing touches the hardware until [`init()`](Self::init).
    pub fn new(sensor: S, led: L, clock: K, delay: D, default_brightness: u8) -> Self {
        Self {
            sensor,
            led,
            clock,
            delay,
            wall_clock: NoWallClock,
            limits: LightLimits::default(),
            timing: BacklightTiming::default(),
            night: NightWindow::default(),
            average: ExpAverage::new(),
            default_brightness,
            brightness: default_brightness,
            target: default_brightness,
            auto: true,
            last_ramp: None,
            last_sample: None,
        }
    }
}

impl<S, L, K, D, W> BacklightController<S, L, K, D, W>
where
    S: AnalogInput,
    L: SetDutyCycle,
    K: Clock,
    D: DelayNs,
    W: WallClock,
{
    /// Attach a wall clock so [`set_night_period()`](Self::set_night_period)
    /// can take effect.
    pub fn with_wall_clock<W2: WallClock>(self, wall_clock: W2) -> BacklightController<S, L, K, D, W2> {
        BacklightController {
            sensor: self.sensor,
            led: self.led,
            clock: self.clock,
            delay: self.delay,
            wall_clock,
            limits: self.limits,
            timing: self.timing,
            night: self.night,
            average: self.average,
            default_brightness: self.default_brightness,
            brightness: self.brightness,
            target: self.target,
            auto: self.auto,
            last_ramp: self.last_ramp,
            last_sample: self.last_sample,
        }
    }

    pub fn with_limits(mut self, limits: LightLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_timing(mut self, timing: BacklightTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Bring the controller to its start state and run one
    /// [`adjust()`](Self::adjust).
    ///
    /// Clears the light average and the night window, sets both current
    /// and target brightness to the default, writes it to the LED and
    /// enables automatic mode.
    pub fn init(&mut self) -> Result<(), BacklightError<S, L>> {
        self.average.reset();
        self.night = NightWindow::default();
        self.target = self.default_brightness;
        self.last_ramp = None;
        self.last_sample = None;
        self.auto = true;
        self.write_led(self.default_brightness)?;
        self.adjust()
    }

    /// Poll entry point: one ramp step and one target recompute, each only
    /// when its period has passed.
    ///
    /// Does nothing while automatic mode is off. A failed step or recompute
    /// leaves its gate open, so the next call retries it.
    ///
    /// # Errors
    /// * [`ControlError::Input`] if the light sensor cannot be read
    /// * [`ControlError::Output`] if the LED duty cycle cannot be set
    pub fn adjust(&mut self) -> Result<(), BacklightError<S, L>> {
        if !self.auto {
            return Ok(());
        }

        let now = self.clock.now_ms();

        if self.brightness != self.target && elapsed(self.last_ramp, now, self.timing.ramp_period_ms) {
            let next = if self.target > self.brightness {
                self.brightness + 1
            } else {
                self.brightness - 1
            };
            self.write_led(next)?;
            self.last_ramp = Some(now);
        }

        if !elapsed(self.last_sample, now, self.timing.sample_period_ms) {
            return Ok(());
        }

        let target = if self.is_dark()? {
            self.limits.night_brightness
        } else {
            let raw = self.sensor.read().map_err(ControlError::Input)?;
            self.limits.target_for(self.average.update(raw))
        };
        self.last_sample = Some(now);
        self.set_target(target);
        Ok(())
    }

    /// One raw light sensor reading.
    pub fn sensor_value(&mut self) -> Result<u16, BacklightError<S, L>> {
        self.sensor.read().map_err(ControlError::Input)
    }

    /// Set the brightness immediately and switch automatic mode off.
    ///
    /// Nothing changes if the LED cannot be written.
    pub fn set_brightness(&mut self, brightness: u8) -> Result<(), BacklightError<S, L>> {
        self.write_led(brightness)?;
        self.auto = false;
        #[cfg(feature = "defmt")]
        defmt::debug!("backlight: manual brightness {}", brightness);
        Ok(())
    }

    /// Switch automatic mode on or off.
    ///
    /// Either way the next [`adjust()`](Self::adjust) recomputes the target
    /// at once; when enabling, that `adjust()` runs right here.
    pub fn turn_auto(&mut self, enabled: bool) -> Result<(), BacklightError<S, L>> {
        self.auto = enabled;
        self.last_sample = None;
        #[cfg(feature = "defmt")]
        defmt::debug!("backlight: automatic mode {}", enabled);
        if enabled {
            self.adjust()?;
        }
        Ok(())
    }

    /// Replace the light thresholds and brightness range.
    pub fn set_limits(
        &mut self,
        dark: u16,
        daylight: u16,
        night_brightness: u8,
        day_brightness: u8,
        off_in_daylight: bool,
    ) {
        self.limits = LightLimits {
            dark_threshold: dark,
            daylight_threshold: daylight,
            night_brightness,
            day_brightness,
            off_in_daylight,
        };
    }

    /// Use the wall clock for night detection, with night from `evening`
    /// to `morning`, both in 10-minute ticks since midnight.
    ///
    /// Returns `false` and changes nothing unless
    /// `morning < evening <= 144`.
    pub fn set_night_period(&mut self, evening: u8, morning: u8) -> bool {
        let accepted = self.night.set(evening, morning);
        if !accepted {
            #[cfg(feature = "defmt")]
            defmt::warn!("backlight: night period {}..{} rejected", evening, morning);
        }
        accepted
    }

    /// Whether it is night.
    ///
    /// With a night window set and the wall clock running, this is a pure
    /// time check. Otherwise the sensor is sampled a few times with a busy
    /// wait after each sample, and the plain average is compared with the
    /// dark threshold.
    pub fn is_dark(&mut self) -> Result<bool, BacklightError<S, L>> {
        if self.night.period().is_some() {
            if let Some(seconds) = self.wall_clock.seconds_since_midnight() {
                return Ok(self.night.contains(seconds));
            }
        }

        let samples = self.timing.dark_samples.max(1);
        let mut sum = 0u32;
        for _ in 0..samples {
            sum += u32::from(self.sensor.read().map_err(ControlError::Input)?);
            self.delay.delay_ms(self.timing.dark_sample_delay_ms);
        }
        Ok(sum / u32::from(samples) < u32::from(self.limits.dark_threshold))
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Brightness currently written to the LED.
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Brightness the ramp is heading for.
    pub fn target_brightness(&self) -> u8 {
        self.target
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    pub fn limits(&self) -> &LightLimits {
        &self.limits
    }

    /// `(evening, morning)` ticks if clock-based night detection is on.
    pub fn night_period(&self) -> Option<(u8, u8)> {
        self.night.period()
    }

    /// Smoothed light level as of the last recompute.
    pub fn smoothed_light(&self) -> u16 {
        self.average.value()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn set_target(&mut self, target: u8) {
        if target != self.target {
            #[cfg(feature = "defmt")]
            defmt::debug!("backlight: target {} -> {}", self.target, target);
        }
        self.target = target;
    }

    /// Brightness only changes once the LED has accepted it.
    fn write_led(&mut self, brightness: u8) -> Result<(), BacklightError<S, L>> {
        self.led
            .set_duty_cycle_fraction(u16::from(brightness), u16::from(u8::MAX))
            .map_err(ControlError::Output)?;
        self.brightness = brightness;
        Ok(())
    }
}

/// `true` if the gate never fired or at least `period` ms have passed.
fn elapsed(last: Option<u32>, now: u32, period: u32) -> bool {
    last.map_or(true, |t| now.wrapping_sub(t) >= period)
}

fn constrain(x: i32, lo: i32, hi: i32) -> i32 {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

/// Linear interpolation with truncating integer division.
fn map_range(x: i32, in_lo: i32, in_hi: i32, out_lo: i32, out_hi: i32) -> i32 {
    if in_hi == in_lo {
        return out_lo;
    }
    (x - in_lo) * (out_hi - out_lo) / (in_hi - in_lo) + out_lo
}
