//! Hardware capabilities injected into the components.
//!
//! Digital inputs, the PWM actuator and busy-wait delays come straight from
//! `embedded-hal` 1.0. The traits here cover what `embedded-hal` does not:
//! an analog light sensor, a free-running millisecond clock and an optional
//! wall clock for the night window.

/// Free-running millisecond counter.
///
/// The counter is allowed to wrap. Components only ever compare two
/// readings through `wrapping_sub`, so a wrap between two readings is
/// harmless as long as they are less than ~49 days apart.
pub trait Clock {
    /// Milliseconds since an arbitrary epoch.
    fn now_ms(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        T::now_ms(self)
    }
}

/// Single analog channel, e.g. a photoresistor behind an ADC.
pub trait AnalogInput {
    /// Error reported by the converter.
    type Error;

    /// Take one raw sample.
    fn read(&mut self) -> Result<u16, Self::Error>;
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    type Error = T::Error;

    fn read(&mut self) -> Result<u16, Self::Error> {
        T::read(self)
    }
}

/// Local time of day, used for the clock-based night window.
pub trait WallClock {
    /// Current `(hour, minute, second)`, or `None` while the clock has not
    /// been set.
    fn time_of_day(&self) -> Option<(u8, u8, u8)>;

    /// Seconds elapsed since local midnight.
    fn seconds_since_midnight(&self) -> Option<u32> {
        self.time_of_day()
            .map(|(h, m, s)| (u32::from(h) * 60 + u32::from(m)) * 60 + u32::from(s))
    }
}

/// Wall clock for boards without an RTC. Never reports a time, so the
/// backlight always falls back to the light sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWallClock;

impl WallClock for NoWallClock {
    fn time_of_day(&self) -> Option<(u8, u8, u8)> {
        None
    }
}

/// [`Clock`] backed by the Embassy time driver.
#[cfg(feature = "embassy")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy")]
impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        embassy_time::Instant::now().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTime(u8, u8, u8);

    impl WallClock for FixedTime {
        fn time_of_day(&self) -> Option<(u8, u8, u8)> {
            Some((self.0, self.1, self.2))
        }
    }

    #[test]
    fn seconds_since_midnight_from_hms() {
        assert_eq!(FixedTime(0, 0, 0).seconds_since_midnight(), Some(0));
        assert_eq!(FixedTime(1, 2, 3).seconds_since_midnight(), Some(3723));
        assert_eq!(FixedTime(23, 59, 59).seconds_since_midnight(), Some(86_399));
    }

    #[test]
    fn no_wall_clock_never_reports_time() {
        assert_eq!(NoWallClock.time_of_day(), None);
        assert_eq!(NoWallClock.seconds_since_midnight(), None);
    }
}
