//! Error types for the control components.

use core::convert::Infallible;
use core::fmt;

/// Errors raised while talking to the hardware behind a component.
///
/// Invalid configuration is never an error here: out-of-range values are
/// clamped or ignored by the components themselves. Only failures reported
/// by the injected pins, sensor or actuator end up in this type.
///
/// Input-only components (buttons, encoders) leave `O` at its
/// [`Infallible`] default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError<I, O = Infallible> {
    /// Reading a digital input or the light sensor failed.
    Input(I),

    /// Writing the backlight actuator failed.
    Output(O),
}

impl<I: fmt::Debug, O: fmt::Debug> fmt::Display for ControlError<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlError::Input(e) => write!(f, "input error: {:?}", e),
            ControlError::Output(e) => write!(f, "output error: {:?}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl<I: defmt::Format, O: defmt::Format> defmt::Format for ControlError<I, O> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ControlError::Input(e) => defmt::write!(f, "input error: {}", e),
            ControlError::Output(e) => defmt::write!(f, "output error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::format;

    #[test]
    fn display_names_the_failing_side() {
        let input: ControlError<u8, u8> = ControlError::Input(3);
        let output: ControlError<u8, u8> = ControlError::Output(7);
        assert_eq!(format!("{}", input), "input error: 3");
        assert_eq!(format!("{}", output), "output error: 7");
    }
}
