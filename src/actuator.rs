// The output seam between the controller and a PWM-like actuator
// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use num_traits::float::FloatCore;

/// A device accepting an unsigned command in `0..=max_command()`, typically a PWM duty cycle.
///
/// A command of zero always means "off". The controller writes zero whenever it is reconfigured
/// or shut down, and otherwise maps its clamped output linearly from
/// `[lower_limit, upper_limit]` onto `0..=max_command()`.
pub trait Actuator {
    /// The command corresponding to the upper output limit, e.g. a timer's auto-reload value
    fn max_command(&self) -> u16;

    /// Applies a command. Must not block.
    fn write(&mut self, command: u16);
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn max_command(&self) -> u16 {
        (**self).max_command()
    }

    fn write(&mut self, command: u16) {
        (**self).write(command)
    }
}

/// Placeholder actuator type for controllers that only compute and never drive hardware.
///
/// It has no values, so a controller parameterized with it can never hold an actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActuator {}

impl Actuator for NoActuator {
    fn max_command(&self) -> u16 {
        match *self {}
    }

    fn write(&mut self, _command: u16) {
        match *self {}
    }
}

/// Maps `output` from `[lower, upper]` onto `0..=max_command`, rounding to the nearest step.
///
/// Returns `None` if the limits are degenerate or the result is not a number, in which case the
/// caller must not write anything.
pub(crate) fn scale_command<T: FloatCore>(
    output: T,
    lower: T,
    upper: T,
    max_command: u16,
) -> Option<u16> {
    let span = upper - lower;
    if span <= T::zero() {
        return None;
    }
    let full_scale = T::from(max_command)?;
    let scaled = num_traits::clamp((output - lower) / span * full_scale, T::zero(), full_scale);
    scaled.round().to_u16()
}
