// Instant types with wraparound-safe elapsed time, and the clock capability the controller reads
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

use core::cell::Cell;
use core::ops::Add;
use core::time::Duration;

use core::fmt::Debug;

/// A trait for time-like objects that can be used to measure elapsed time.
///
/// The PID controller measures the time elapsed between two consecutive computations with this
/// trait; there is no fixed sampling period. Counter-based implementations must subtract with
/// wrapping arithmetic, so that a counter overflowing between two samples still yields the
/// short interval that actually elapsed.
pub trait InstantLike:
    Sized + Add<Duration, Output = Self> + Clone + Copy + Debug + PartialEq<Self> + Send + Sync
{
    /// Returns the amount of time elapsed from another instant to this one
    #[must_use]
    fn duration_since(&self, earlier: Self) -> Duration;
}

/// A wrapper around an unsigned 64-bit integer representing milliseconds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u64);

impl InstantLike for Millis {
    fn duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.wrapping_sub(earlier.0))
    }
}

impl Add<Duration> for Millis {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Millis(self.0.wrapping_add(rhs.as_millis() as u64))
    }
}

/// A wrapper around an unsigned 64-bit integer representing microseconds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Micros(pub u64);

impl InstantLike for Micros {
    fn duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.wrapping_sub(earlier.0))
    }
}

impl Add<Duration> for Micros {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Micros(self.0.wrapping_add(rhs.as_micros() as u64))
    }
}

/// A free-running 32-bit microsecond counter, as exposed by most microcontroller timer HALs.
///
/// The counter wraps roughly every 71.6 minutes. Elapsed time is computed modulo 2³², which is
/// correct as long as consecutive samples are less than one full period apart.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Micros32(pub u32);

impl InstantLike for Micros32 {
    fn duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(u64::from(self.0.wrapping_sub(earlier.0)))
    }
}

impl Add<Duration> for Micros32 {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Micros32(self.0.wrapping_add(rhs.as_micros() as u32))
    }
}

/// Seconds since an arbitrary epoch, e.g. simulation time
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeF64(pub f64);

impl InstantLike for TimeF64 {
    fn duration_since(&self, earlier: Self) -> Duration {
        let secs = self.0 - earlier.0;
        if secs < 0.0 || secs.is_nan() {
            Duration::from_secs(0) // saturate
        } else {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        }
    }
}

impl Add<Duration> for TimeF64 {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        TimeF64(self.0 + rhs.as_secs_f64())
    }
}

impl TimeF64 {
    /// Constructs a new TimeF64 from raw seconds.
    pub fn from_secs(secs: f64) -> Self {
        TimeF64(secs)
    }

    /// Returns the underlying seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }
}

/// A monotonic clock the stateful controller samples on every computation.
///
/// Injecting the clock instead of reading a hardware timer inside the control law is what lets
/// tests drive the controller with exact, repeatable time steps.
pub trait Clock {
    /// The instant type produced by this clock
    type Instant: InstantLike;

    /// Returns the current instant
    fn now(&self) -> Self::Instant;
}

impl<I, F> Clock for F
where
    I: InstantLike,
    F: Fn() -> I,
{
    type Instant = I;

    fn now(&self) -> I {
        self()
    }
}

/// A clock that only moves when told to.
///
/// Useful for tests and simulations: the owner of the controller advances time explicitly between
/// calls to `compute`.
#[derive(Debug, Clone)]
pub struct ManualClock<I: InstantLike> {
    now: Cell<I>,
}

impl<I: InstantLike> ManualClock<I> {
    /// Creates a clock frozen at `start`
    pub fn new(start: I) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Moves the clock forward by `step`
    pub fn advance(&self, step: Duration) {
        self.now.set(self.now.get() + step);
    }

    /// Jumps the clock to an arbitrary instant
    pub fn set(&self, instant: I) {
        self.now.set(instant);
    }
}

impl<I: InstantLike> Clock for ManualClock<I> {
    type Instant = I;

    fn now(&self) -> I {
        self.now.get()
    }
}

/// A convenient wrapper around `std::time::Instant` satisfying the `InstantLike` trait.
#[cfg(feature = "std")]
mod std_instant {

    use super::{Add, Clock, Duration, InstantLike};

    /// `std::time::Instant` as an [`InstantLike`]
    #[derive(Debug, Clone, Copy)]
    pub struct StdInstant(pub std::time::Instant);

    impl StdInstant {
        /// Reads the system monotonic clock
        pub fn now() -> Self {
            StdInstant(std::time::Instant::now())
        }
    }

    impl InstantLike for StdInstant {
        fn duration_since(&self, other: Self) -> Duration {
            self.0.saturating_duration_since(other.0)
        }
    }

    impl Add<Duration> for StdInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            StdInstant(self.0 + rhs)
        }
    }

    impl PartialEq for StdInstant {
        fn eq(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    /// The system monotonic clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct StdClock;

    impl Clock for StdClock {
        type Instant = StdInstant;

        fn now(&self) -> StdInstant {
            StdInstant::now()
        }
    }

    /// Tests that StdInstant is just one constructor call away from std::time::Instant
    /// and calling duration_since is equivalent to calling the same method on the underlying Instant.
    #[cfg(test)]
    #[test]
    fn test_std_instant_wrapper() {
        let start = StdInstant::now();
        let end = StdInstant(std::time::Instant::now());
        let result = end.duration_since(start);
        let expected = end.0.duration_since(start.0);
        assert_eq!(result, expected);
    }
}

#[cfg(feature = "std")]
pub use std_instant::{StdClock, StdInstant};
