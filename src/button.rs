//! Debounced push button with short/long press classification.
//!
//! The button is wired active-low with a pull-up: the pin reads low while
//! the button is held. [`ButtonReader`] tracks when the current press began
//! and hands every pin sample to a [`PressClassifier`] strategy, chosen at
//! construction:
//!
//! - [`Polled`]: sample once per main-loop iteration with
//!   [`button_check()`](ButtonReader::button_check). Releases sooner than
//!   [`ButtonTiming::bounce_ms`] after the press are treated as contact
//!   bounce.
//! - [`EdgeLatched`]: call [`change_intr()`](ButtonReader::change_intr)
//!   from the pin-change interrupt and collect the result later with
//!   [`int_button_status()`](ButtonReader::int_button_status).
//!
//! Either way, [`button_tick()`](ButtonReader::button_tick) produces
//! auto-repeat ticks while a long press is held.

use embedded_hal::digital::InputPin;

use crate::error::ControlError;
use crate::platform::Clock;

/// Outcome of a completed press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Press {
    /// No press completed.
    #[default]
    None = 0,
    /// Released before [`ButtonTiming::short_press_ms`].
    Short = 1,
    /// Held for at least [`ButtonTiming::short_press_ms`].
    Long = 2,
}

impl From<Press> for u8 {
    fn from(press: Press) -> Self {
        press as u8
    }
}

impl Press {
    fn from_held(held_ms: u32, timing: &ButtonTiming) -> Self {
        if held_ms < timing.short_press_ms {
            Press::Short
        } else {
            Press::Long
        }
    }
}

/// Button timing in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonTiming {
    /// Releases sooner than this after the press are ignored (poll path
    /// only). Default: 50.
    pub bounce_ms: u32,
    /// Presses shorter than this are short, the rest long. Default: 900.
    pub short_press_ms: u32,
    /// Period of auto-repeat ticks during a long press. Default: 200.
    pub tick_period_ms: u32,
    /// A press older than this is considered stale and restarted on the
    /// next pressed sample. Default: 3000.
    pub max_held_ms: u32,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self {
            bounce_ms: 50,
            short_press_ms: 900,
            tick_period_ms: 200,
            max_held_ms: 3000,
        }
    }
}

/// Start time of the press in progress, shared by every strategy and by
/// the tick generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PressTracker {
    started: Option<u32>,
}

impl PressTracker {
    /// Note a pressed sample. Starts a new press unless one is already
    /// tracked and younger than `max_held_ms`.
    pub fn pressed(&mut self, now: u32, timing: &ButtonTiming) {
        let stale = self
            .started
            .map_or(true, |t| now.wrapping_sub(t) > timing.max_held_ms);
        if stale {
            self.started = Some(now);
        }
    }

    /// How long the tracked press has been held.
    pub fn held_ms(&self, now: u32) -> Option<u32> {
        self.started.map(|t| now.wrapping_sub(t))
    }

    pub fn clear(&mut self) {
        self.started = None;
    }

    pub fn is_tracking(&self) -> bool {
        self.started.is_some()
    }
}

/// Strategy turning pin samples into [`Press`] results.
pub trait PressClassifier {
    /// Handle one sample of the pin. `pressed` is the logical state (pin
    /// low). Returns the press completed by this sample, if any.
    fn classify(
        &mut self,
        tracker: &mut PressTracker,
        pressed: bool,
        now: u32,
        timing: &ButtonTiming,
    ) -> Press;

    /// Return the latched result and reset it to [`Press::None`].
    ///
    /// Classifiers that hand every result straight back from `classify`
    /// latch nothing.
    fn take(&mut self) -> Press {
        Press::None
    }

    /// Drop any pending result.
    fn clear(&mut self) {
        self.take();
    }
}

/// Main-loop polling with debounce.
#[derive(Debug, Clone, Copy, Default)]
pub struct Polled;

impl PressClassifier for Polled {
    fn classify(
        &mut self,
        tracker: &mut PressTracker,
        pressed: bool,
        now: u32,
        timing: &ButtonTiming,
    ) -> Press {
        if pressed {
            tracker.pressed(now, timing);
            return Press::None;
        }

        let Some(held) = tracker.held_ms(now) else {
            return Press::None;
        };
        // Bounce: keep tracking, the press is not over yet.
        if held < timing.bounce_ms {
            return Press::None;
        }
        tracker.clear();
        Press::from_held(held, timing)
    }
}

/// Pin-change interrupt with a read-and-reset latch.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeLatched {
    latch: Press,
}

impl PressClassifier for EdgeLatched {
    fn classify(
        &mut self,
        tracker: &mut PressTracker,
        pressed: bool,
        now: u32,
        timing: &ButtonTiming,
    ) -> Press {
        if pressed {
            tracker.pressed(now, timing);
            return Press::None;
        }

        match tracker.held_ms(now) {
            Some(held) => {
                tracker.clear();
                self.latch = Press::from_held(held, timing);
                self.latch
            }
            None => Press::None,
        }
    }

    fn take(&mut self) -> Press {
        core::mem::take(&mut self.latch)
    }
}

/// Push button on one active-low digital input.
pub struct ButtonReader<P, K, C = Polled> {
    pin: P,
    clock: K,
    classifier: C,
    timing: ButtonTiming,
    tracker: PressTracker,
    last_tick: Option<u32>,
}

impl<P, K> ButtonReader<P, K, Polled>
where
    P: InputPin,
    K: Clock,
{
    /// Button read from the main loop with [`button_check()`](Self::button_check).
    ///
    /// Starts with [`ButtonTiming::default()`]; change the stale-press
    /// timeout with [`set_timeout()`](Self::set_timeout) or the whole
    /// timing with [`with_timing()`](Self::with_timing).
    pub fn polled(pin: P, clock: K) -> Self {
        Self::new(pin, clock, Polled)
    }

    /// Sample the button; call once per main-loop iteration.
    ///
    /// Returns the press that ended with this sample, if any.
    pub fn button_check(&mut self) -> Result<Press, ControlError<P::Error>> {
        self.update()
    }
}

impl<P, K> ButtonReader<P, K, EdgeLatched>
where
    P: InputPin,
    K: Clock,
{
    /// Button fed from the pin-change interrupt with
    /// [`change_intr()`](Self::change_intr).
    ///
    /// Timing defaults as for [`polled()`](ButtonReader::polled).
    pub fn edge_triggered(pin: P, clock: K) -> Self {
        Self::new(pin, clock, EdgeLatched::default())
    }

    /// Pin-change handler.
    pub fn change_intr(&mut self) -> Result<(), ControlError<P::Error>> {
        self.update().map(|_| ())
    }

    /// Press latched by the interrupt handler since the last call.
    ///
    /// Reading resets the latch, so each press is reported once.
    pub fn int_button_status(&mut self) -> Press {
        self.classifier.take()
    }
}

impl<P, K, C> ButtonReader<P, K, C>
where
    P: InputPin,
    K: Clock,
    C: PressClassifier,
{
    pub fn new(pin: P, clock: K, classifier: C) -> Self {
        Self {
            pin,
            clock,
            classifier,
            timing: ButtonTiming::default(),
            tracker: PressTracker::default(),
            last_tick: None,
        }
    }

    pub fn with_timing(mut self, timing: ButtonTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Forget any press in progress and any pending result.
    ///
    /// The pull-up is configured by the HAL when the pin is created.
    pub fn init(&mut self) {
        self.tracker.clear();
        self.classifier.clear();
        self.last_tick = None;
    }

    /// Set how long a press may last before it is treated as stale.
    pub fn set_timeout(&mut self, ms: u32) {
        self.timing.max_held_ms = ms;
    }

    pub fn timing(&self) -> &ButtonTiming {
        &self.timing
    }

    /// Read the pin and run it through the classifier.
    pub fn update(&mut self) -> Result<Press, ControlError<P::Error>> {
        let pressed = self.pin.is_low().map_err(ControlError::Input)?;
        let now = self.clock.now_ms();
        let press = self
            .classifier
            .classify(&mut self.tracker, pressed, now, &self.timing);

        if press != Press::None {
            #[cfg(feature = "defmt")]
            defmt::debug!("button: {}", press);
        }
        Ok(press)
    }

    /// Auto-repeat while the button is held.
    ///
    /// Once a press has lasted longer than
    /// [`short_press_ms`](ButtonTiming::short_press_ms), returns `true` at
    /// most once per [`tick_period_ms`](ButtonTiming::tick_period_ms),
    /// starting right away. Returns `false` and restarts the tick period
    /// when the button is up or no press is tracked.
    pub fn button_tick(&mut self) -> Result<bool, ControlError<P::Error>> {
        let pressed = self.pin.is_low().map_err(ControlError::Input)?;
        let now = self.clock.now_ms();

        let held = match self.tracker.held_ms(now) {
            Some(held) if pressed => held,
            _ => {
                self.last_tick = None;
                return Ok(false);
            }
        };
        if held <= self.timing.short_press_ms {
            return Ok(false);
        }

        let due = self
            .last_tick
            .map_or(true, |t| now.wrapping_sub(t) > self.timing.tick_period_ms);
        if due {
            self.last_tick = Some(now);
        }
        Ok(due)
    }
}
