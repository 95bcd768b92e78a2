/// Fixed-point scale of the accumulator. Each new sample gets a weight of
/// `1 / SCALE`.
pub const SCALE: i32 = 8;

/// Exponential moving average in integer arithmetic.
///
/// The accumulator holds the average multiplied by [`SCALE`], so no
/// floating point is needed and the result is rounded to the nearest
/// integer. With a constant input the output settles within ±1 of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExpAverage {
    acc: i32,
}

impl ExpAverage {
    pub const fn new() -> Self {
        Self { acc: 0 }
    }

    /// Drop all history; the next sample is averaged against zero.
    pub fn reset(&mut self) {
        self.acc = 0;
    }

    /// Feed one sample and return the new average.
    pub fn update(&mut self, sample: u16) -> u16 {
        let half = SCALE / 2;
        self.acc += (i32::from(sample) * SCALE - self.acc + half) / SCALE;
        self.value()
    }

    /// Current average without feeding a sample.
    pub fn value(&self) -> u16 {
        ((self.acc + SCALE / 2) / SCALE).clamp(0, i32::from(u16::MAX)) as u16
    }
}
