//! Interrupt-driven quadrature rotary encoder.
//!
//! [`QuadratureEncoder`] decodes a mechanical two-channel encoder wired
//! active-low with pull-ups. Channel A is the "main" channel: every level
//! change on it should end in a call to
//! [`change_intr()`](QuadratureEncoder::change_intr), normally from the pin
//! interrupt. Channel B is only sampled, at the moment channel A goes low,
//! and its level at that moment gives the direction of rotation.
//!
//! ```text
//!          ┌───┐   ┌───       A falls: remember B
//!   A  ────┘   └───┘          A rises: step (B high ⇒ down, B low ⇒ up)
//!        ┌───┐   ┌───
//!   B  ──┘   └───┘
//! ```
//!
//! The position is bounded to `[min, max]`. Stepping past a bound either
//! clamps or, when the encoder is looped, wraps to the opposite bound.
//! Detents closer together than [`FAST_TURN_MS`] use the fast increment.

use embedded_hal::digital::InputPin;

use crate::error::ControlError;
use crate::platform::Clock;

/// Detents closer together than this (ms) count as fast rotation.
pub const FAST_TURN_MS: u32 = 300;

/// A transition on channel A that has not completed within this many ms is
/// discarded instead of producing a step.
pub const EDGE_TIMEOUT_MS: u32 = 1000;

/// Lower bound used until [`reset()`](QuadratureEncoder::reset) is called.
pub const DEFAULT_MIN: i32 = -32767;

/// Upper bound used until [`reset()`](QuadratureEncoder::reset) is called.
pub const DEFAULT_MAX: i32 = 32766;

/// Quadrature encoder on two digital inputs.
///
/// The encoder owns both channel pins and a [`Clock`]. To share it between
/// an interrupt handler and the main loop, put it in a
/// [`Shared`](crate::shared::Shared).
///
/// # Example
///
/// ```ignore
/// let mut knob = QuadratureEncoder::new(pin_a, pin_b, EmbassyClock, 0);
/// knob.reset(50, 0, 100, 1, 5, false);
///
/// // In the channel A edge handler:
/// knob.change_intr()?;
///
/// // In the main loop:
/// let value = knob.read();
/// ```
pub struct QuadratureEncoder<A, B, K> {
    pin_a: A,
    pin_b: B,
    clock: K,

    position: i32,
    min_pos: i32,
    max_pos: i32,
    looped: bool,
    increment: u8,
    fast_increment: u8,

    /// When channel A went low for the transition in progress.
    edge_start: Option<u32>,
    /// When the last step was applied.
    last_step: Option<u32>,
    /// Channel B level sampled when channel A went low.
    channel_b: bool,
}

impl<A, B, K> QuadratureEncoder<A, B, K>
where
    A: InputPin,
    B: InputPin<Error = A::Error>,
    K: Clock,
{
    /// Create an encoder at `init_pos` with the default bounds
    /// ([`DEFAULT_MIN`]..=[`DEFAULT_MAX`]), increment 1 and no wraparound.
    ///
    /// `init_pos` is taken as is; call [`reset()`](Self::reset) to apply
    /// bounds and increments together.
    pub fn new(pin_a: A, pin_b: B, clock: K, init_pos: i32) -> Self {
        Self {
            pin_a,
            pin_b,
            clock,
            position: init_pos,
            min_pos: DEFAULT_MIN,
            max_pos: DEFAULT_MAX,
            looped: false,
            increment: 1,
            fast_increment: 1,
            edge_start: None,
            last_step: None,
            channel_b: false,
        }
    }

    /// Forget any transition in progress.
    ///
    /// Pin direction and pull-ups are configured by the HAL when the pins
    /// are created; this only brings the decoder to a known state.
    pub fn init(&mut self) {
        self.edge_start = None;
        self.last_step = None;
        self.channel_b = false;
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Set the step applied per detent at normal speed.
    pub fn set_increment(&mut self, inc: u8) {
        self.increment = inc;
    }

    /// Step applied per detent at normal speed.
    pub fn increment(&self) -> u8 {
        self.increment
    }

    /// Step applied per detent during fast rotation.
    pub fn fast_increment(&self) -> u8 {
        self.fast_increment
    }

    /// Inclusive `(min, max)` bounds of the position.
    pub fn bounds(&self) -> (i32, i32) {
        (self.min_pos, self.max_pos)
    }

    /// Whether stepping past a bound wraps to the opposite bound.
    pub fn is_looped(&self) -> bool {
        self.looped
    }

    /// Replace bounds, increments and loop mode in one go.
    ///
    /// * Inverted bounds are swapped, so `low` is always the minimum.
    /// * `init_pos` becomes the position if it lies within the bounds,
    ///   otherwise the position falls back to the minimum.
    /// * `fast_inc` is only used when it is larger than `inc`; otherwise
    ///   fast rotation steps by `inc` as well.
    pub fn reset(&mut self, init_pos: i32, low: i32, upp: i32, inc: u8, fast_inc: u8, looped: bool) {
        let (low, upp) = if low <= upp { (low, upp) } else { (upp, low) };
        self.min_pos = low;
        self.max_pos = upp;
        if !self.write(init_pos) {
            #[cfg(feature = "defmt")]
            defmt::warn!("encoder: initial position {} outside [{}, {}]", init_pos, low, upp);
            self.position = low;
        }
        self.increment = inc;
        self.fast_increment = if fast_inc > inc { fast_inc } else { inc };
        self.looped = looped;
    }

    // -----------------------------------------------------------------------
    // Position
    // -----------------------------------------------------------------------

    /// Current position.
    pub fn read(&self) -> i32 {
        self.position
    }

    /// Move to `pos` if it lies within the bounds.
    ///
    /// Returns `false` and leaves the position untouched otherwise; the
    /// value is never clamped.
    pub fn write(&mut self, pos: i32) -> bool {
        if (self.min_pos..=self.max_pos).contains(&pos) {
            self.position = pos;
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    /// Channel A edge handler.
    ///
    /// Reads both channels and advances the decoder. Calling it again while
    /// channel A holds its level changes nothing, so it can also be polled
    /// from a fast loop instead of an interrupt.
    ///
    /// # Errors
    /// * [`ControlError::Input`] if a channel cannot be read
    pub fn change_intr(&mut self) -> Result<(), ControlError<A::Error>> {
        let a_low = self.pin_a.is_low().map_err(ControlError::Input)?;
        let now = self.clock.now_ms();

        if a_low {
            let stale = self
                .edge_start
                .map_or(true, |t| now.wrapping_sub(t) > EDGE_TIMEOUT_MS);
            if stale {
                self.channel_b = self.pin_b.is_high().map_err(ControlError::Input)?;
                self.edge_start = Some(now);
            }
            return Ok(());
        }

        if let Some(start) = self.edge_start.take() {
            if now.wrapping_sub(start) < EDGE_TIMEOUT_MS {
                let fast = self
                    .last_step
                    .is_some_and(|t| now.wrapping_sub(t) < FAST_TURN_MS);
                let inc = i32::from(if fast { self.fast_increment } else { self.increment });
                self.last_step = Some(now);
                self.step(if self.channel_b { -inc } else { inc });
            }
        }
        Ok(())
    }

    fn step(&mut self, delta: i32) {
        let next = self.position.saturating_add(delta);
        let bounded = if next > self.max_pos {
            if self.looped { self.min_pos } else { self.max_pos }
        } else if next < self.min_pos {
            if self.looped { self.max_pos } else { self.min_pos }
        } else {
            next
        };

        if next != bounded {
            #[cfg(feature = "defmt")]
            defmt::debug!("encoder: {} out of range, now {}", next, bounded);
        }
        self.position = bounded;
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::sim::{Faulty, SimClock, SimFault, SimPin};

    struct Rig {
        now: Cell<u32>,
        a: Cell<bool>,
        b: Cell<bool>,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                now: Cell::new(10_000),
                a: Cell::new(true),
                b: Cell::new(true),
            }
        }

        fn encoder(&self, init: i32) -> QuadratureEncoder<SimPin<'_>, SimPin<'_>, SimClock<'_>> {
            QuadratureEncoder::new(SimPin(&self.a), SimPin(&self.b), SimClock(&self.now), init)
        }

        fn advance(&self, ms: u32) {
            self.now.set(self.now.get().wrapping_add(ms));
        }

        /// One full detent: A falls with B at `b_high`, 5 ms later A rises.
        fn detent(&self, enc: &mut QuadratureEncoder<SimPin<'_>, SimPin<'_>, SimClock<'_>>, b_high: bool) {
            self.b.set(b_high);
            self.a.set(false);
            enc.change_intr().unwrap();
            self.advance(5);
            self.b.set(!b_high);
            self.a.set(true);
            enc.change_intr().unwrap();
        }

        fn up(&self, enc: &mut QuadratureEncoder<SimPin<'_>, SimPin<'_>, SimClock<'_>>) {
            self.detent(enc, false);
        }

        fn down(&self, enc: &mut QuadratureEncoder<SimPin<'_>, SimPin<'_>, SimClock<'_>>) {
            self.detent(enc, true);
        }
    }

    // ── Construction and configuration ──────────────────────────────

    #[test]
    fn new_uses_default_bounds() {
        let rig = Rig::new();
        let enc = rig.encoder(7);
        assert_eq!(enc.read(), 7);
        assert_eq!(enc.bounds(), (DEFAULT_MIN, DEFAULT_MAX));
        assert_eq!(enc.increment(), 1);
        assert!(!enc.is_looped());
    }

    #[test]
    fn reset_keeps_in_range_position() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(5, -10, 10, 2, 4, true);
        assert_eq!(enc.read(), 5);
        assert_eq!(enc.bounds(), (-10, 10));
        assert_eq!(enc.increment(), 2);
        assert_eq!(enc.fast_increment(), 4);
        assert!(enc.is_looped());
    }

    #[test]
    fn reset_out_of_range_falls_back_to_low() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(50, 3, 10, 1, 0, false);
        assert_eq!(enc.read(), 3);

        enc.reset(-50, -5, 5, 1, 0, false);
        assert_eq!(enc.read(), -5);
    }

    #[test]
    fn reset_fast_increment_never_below_increment() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(0, -10, 10, 3, 0, false);
        assert_eq!(enc.fast_increment(), 3);

        enc.reset(0, -10, 10, 3, 3, false);
        assert_eq!(enc.fast_increment(), 3);

        enc.reset(0, -10, 10, 3, 7, false);
        assert_eq!(enc.fast_increment(), 7);
    }

    #[test]
    fn set_increment_round_trips() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.set_increment(9);
        assert_eq!(enc.increment(), 9);
    }

    // ── write ───────────────────────────────────────────────────────

    #[test]
    fn write_inside_bounds() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(0, -10, 10, 1, 0, false);
        assert!(enc.write(-10));
        assert_eq!(enc.read(), -10);
        assert!(enc.write(10));
        assert_eq!(enc.read(), 10);
    }

    #[test]
    fn write_outside_bounds_is_rejected() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(4, -10, 10, 1, 0, false);
        assert!(!enc.write(11));
        assert!(!enc.write(-11));
        assert!(!enc.write(i32::MAX));
        assert_eq!(enc.read(), 4);
    }

    // ── Decoding ────────────────────────────────────────────────────

    #[test]
    fn channel_b_low_counts_up_high_counts_down() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        rig.up(&mut enc);
        assert_eq!(enc.read(), 1);

        rig.advance(500);
        rig.down(&mut enc);
        assert_eq!(enc.read(), 0);

        rig.advance(500);
        rig.down(&mut enc);
        assert_eq!(enc.read(), -1);
    }

    #[test]
    fn rising_edge_without_falling_edge_is_ignored() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.change_intr().unwrap();
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 0);
    }

    #[test]
    fn repeated_calls_at_same_level_step_once() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        rig.b.set(false);
        rig.a.set(false);
        enc.change_intr().unwrap();
        rig.advance(2);
        enc.change_intr().unwrap();
        rig.advance(2);
        rig.a.set(true);
        enc.change_intr().unwrap();
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 1);
    }

    #[test]
    fn channel_b_is_sampled_on_the_falling_edge() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        rig.b.set(false);
        rig.a.set(false);
        enc.change_intr().unwrap();
        // B changes before A rises; direction must not follow it.
        rig.b.set(true);
        rig.advance(3);
        rig.a.set(true);
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 1);
    }

    #[test]
    fn stale_transition_is_discarded() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        rig.b.set(false);
        rig.a.set(false);
        enc.change_intr().unwrap();
        rig.advance(EDGE_TIMEOUT_MS);
        rig.a.set(true);
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 0);

        // The decoder is ready for the next detent.
        rig.advance(10);
        rig.up(&mut enc);
        assert_eq!(enc.read(), 1);
    }

    #[test]
    fn stale_falling_edge_restarts_transition() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        rig.b.set(true);
        rig.a.set(false);
        enc.change_intr().unwrap();

        // Still low long after; a fresh falling edge resamples B.
        rig.advance(EDGE_TIMEOUT_MS + 1);
        rig.b.set(false);
        enc.change_intr().unwrap();
        rig.advance(5);
        rig.a.set(true);
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 1);
    }

    #[test]
    fn fast_rotation_uses_fast_increment() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(0, -100, 100, 1, 5, false);

        rig.up(&mut enc);
        assert_eq!(enc.read(), 1);

        rig.advance(FAST_TURN_MS - 50);
        rig.up(&mut enc);
        assert_eq!(enc.read(), 6);

        rig.advance(FAST_TURN_MS + 10);
        rig.up(&mut enc);
        assert_eq!(enc.read(), 7);
    }

    #[test]
    fn first_step_is_never_fast() {
        let now = Cell::new(0);
        let a = Cell::new(true);
        let b = Cell::new(false);
        let mut enc = QuadratureEncoder::new(SimPin(&a), SimPin(&b), SimClock(&now), 0);
        enc.reset(0, -100, 100, 1, 5, false);

        a.set(false);
        enc.change_intr().unwrap();
        now.set(5);
        a.set(true);
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 1);
    }

    #[test]
    fn survives_clock_wrap() {
        let rig = Rig::new();
        rig.now.set(u32::MAX - 2);
        let mut enc = rig.encoder(0);
        rig.up(&mut enc);
        assert_eq!(enc.read(), 1);
    }

    // ── Bounds ──────────────────────────────────────────────────────

    #[test]
    fn looped_encoder_wraps_exactly_once() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(0, -10, 10, 1, 3, true);

        for expected in 1..=10 {
            rig.advance(FAST_TURN_MS + 50);
            rig.up(&mut enc);
            assert_eq!(enc.read(), expected);
        }

        rig.advance(FAST_TURN_MS + 50);
        rig.up(&mut enc);
        assert_eq!(enc.read(), -10);
    }

    #[test]
    fn looped_encoder_wraps_below_min() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(-10, -10, 10, 1, 0, true);
        rig.down(&mut enc);
        assert_eq!(enc.read(), 10);
    }

    #[test]
    fn unlooped_encoder_clamps() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(9, 0, 10, 1, 0, false);

        for _ in 0..5 {
            rig.advance(FAST_TURN_MS + 50);
            rig.up(&mut enc);
        }
        assert_eq!(enc.read(), 10);

        for _ in 0..15 {
            rig.advance(FAST_TURN_MS + 50);
            rig.down(&mut enc);
        }
        assert_eq!(enc.read(), 0);
    }

    #[test]
    fn position_stays_in_bounds_under_fast_steps() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(0, -7, 7, 2, 9, false);

        for i in 0..40u32 {
            rig.advance(if i % 3 == 0 { 400 } else { 20 });
            if i % 7 < 4 {
                rig.up(&mut enc);
            } else {
                rig.down(&mut enc);
            }
            let pos = enc.read();
            assert!((-7..=7).contains(&pos), "position {} out of bounds", pos);
        }
    }

    #[test]
    fn init_forgets_pending_transition() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        rig.b.set(false);
        rig.a.set(false);
        enc.change_intr().unwrap();
        enc.init();
        rig.a.set(true);
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 0);
    }

    // ── Pin errors ───────────────────────────────────────────────────

    #[test]
    fn reset_swaps_inverted_bounds() {
        let rig = Rig::new();
        let mut enc = rig.encoder(0);
        enc.reset(20, 10, -10, 1, 1, false);
        assert_eq!(enc.bounds(), (-10, 10));
        assert_eq!(enc.read(), -10);
        rig.down(&mut enc);
        assert_eq!(enc.read(), -10);
        rig.up(&mut enc);
        assert_eq!(enc.read(), -9);
    }

    #[test]
    fn pin_errors_do_not_step() {
        let rig = Rig::new();
        let a_faults = Cell::new(0);
        let b_faults = Cell::new(0);
        let mut enc = QuadratureEncoder::new(
            Faulty { inner: SimPin(&rig.a), faults: &a_faults },
            Faulty { inner: SimPin(&rig.b), faults: &b_faults },
            SimClock(&rig.now),
            0,
        );

        // Channel A unreadable on the falling edge.
        rig.b.set(false);
        rig.a.set(false);
        a_faults.set(1);
        assert_eq!(enc.change_intr(), Err(ControlError::Input(SimFault)));

        // Channel B unreadable: the edge is not recorded either.
        b_faults.set(1);
        assert_eq!(enc.change_intr(), Err(ControlError::Input(SimFault)));
        rig.advance(5);
        rig.a.set(true);
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 0);

        // Healthy detent afterwards counts normally.
        rig.advance(500);
        rig.a.set(false);
        enc.change_intr().unwrap();
        rig.advance(5);
        rig.a.set(true);
        enc.change_intr().unwrap();
        assert_eq!(enc.read(), 1);
    }
}
