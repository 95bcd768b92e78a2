//! Simulated hardware for unit tests.
//!
//! Every simulated device borrows a `Cell` owned by the test, so the test
//! can move time forward and flip pin levels while a component holds the
//! device.

use core::cell::Cell;
use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::platform::{AnalogInput, Clock, WallClock};

#[derive(Clone, Copy)]
pub struct SimClock<'a>(pub &'a Cell<u32>);

impl Clock for SimClock<'_> {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

/// Digital line, `true` is high.
pub struct SimPin<'a>(pub &'a Cell<bool>);

impl digital::ErrorType for SimPin<'_> {
    type Error = Infallible;
}

impl InputPin for SimPin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.get())
    }
}

/// PWM channel with an 8-bit range, so the duty equals the brightness.
pub struct SimPwm<'a> {
    pub duty: &'a Cell<u16>,
    pub writes: &'a Cell<u32>,
}

impl pwm::ErrorType for SimPwm<'_> {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm<'_> {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty.set(duty);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

pub struct SimSensor<'a> {
    pub value: &'a Cell<u16>,
    pub reads: &'a Cell<u32>,
}

impl AnalogInput for SimSensor<'_> {
    type Error = Infallible;

    fn read(&mut self) -> Result<u16, Self::Error> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.value.get())
    }
}

/// Busy wait that advances the simulated clock instead of spinning.
pub struct SimDelay<'a> {
    pub now: &'a Cell<u32>,
    pub waited_ms: &'a Cell<u32>,
}

impl DelayNs for SimDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
        self.waited_ms.set(self.waited_ms.get() + ms);
    }
}

pub struct SimWallClock<'a>(pub &'a Cell<Option<(u8, u8, u8)>>);

impl WallClock for SimWallClock<'_> {
    fn time_of_day(&self) -> Option<(u8, u8, u8)> {
        self.0.get()
    }
}

/// Error reported by a [`Faulty`] device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimFault;

impl digital::Error for SimFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl pwm::Error for SimFault {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

/// Wraps a simulated device and fails its next `faults` accesses.
pub struct Faulty<'a, T> {
    pub inner: T,
    pub faults: &'a Cell<u32>,
}

impl<T> Faulty<'_, T> {
    fn trip(&self) -> Result<(), SimFault> {
        match self.faults.get() {
            0 => Ok(()),
            n => {
                self.faults.set(n - 1);
                Err(SimFault)
            }
        }
    }
}

impl digital::ErrorType for Faulty<'_, SimPin<'_>> {
    type Error = SimFault;
}

impl InputPin for Faulty<'_, SimPin<'_>> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.trip()?;
        Ok(self.inner.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.trip()?;
        Ok(!self.inner.0.get())
    }
}

impl pwm::ErrorType for Faulty<'_, SimPwm<'_>> {
    type Error = SimFault;
}

impl SetDutyCycle for Faulty<'_, SimPwm<'_>> {
    fn max_duty_cycle(&self) -> u16 {
        self.inner.max_duty_cycle()
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.trip()?;
        self.inner.set_duty_cycle(duty).map_err(|e| match e {})
    }
}

impl AnalogInput for Faulty<'_, SimSensor<'_>> {
    type Error = SimFault;

    fn read(&mut self) -> Result<u16, Self::Error> {
        self.trip()?;
        self.inner.read().map_err(|e| match e {})
    }
}
