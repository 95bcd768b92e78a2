/// Number of 10-minute ticks in a day.
pub const TICKS_PER_DAY: u8 = 144;

/// Length of one tick in seconds.
pub const SECONDS_PER_TICK: u32 = 600;

/// Clock-based night period, stored in 10-minute ticks since midnight.
///
/// Night runs from `evening` to midnight and from midnight to `morning`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NightWindow {
    evening: u8,
    morning: u8,
    enabled: bool,
}

impl NightWindow {
    /// Set the window and enable it.
    ///
    /// Rejected, leaving the previous window in place, unless
    /// `morning < evening <= TICKS_PER_DAY`.
    pub fn set(&mut self, evening: u8, morning: u8) -> bool {
        if evening <= morning || evening > TICKS_PER_DAY {
            return false;
        }
        self.evening = evening;
        self.morning = morning;
        self.enabled = true;
        true
    }

    /// `(evening, morning)` ticks if the window is enabled.
    pub fn period(&self) -> Option<(u8, u8)> {
        self.enabled.then_some((self.evening, self.morning))
    }

    /// Whether `seconds` since midnight fall into the night.
    pub fn contains(&self, seconds: u32) -> bool {
        seconds < u32::from(self.morning) * SECONDS_PER_TICK
            || seconds >= u32::from(self.evening) * SECONDS_PER_TICK
    }
}
