// Debounced edge-interval speed sensor shared between an interrupt handler and a polling loop
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
use core::time::Duration;

use critical_section::Mutex;
use num_traits::float::FloatCore;

use crate::fmt::as_f32;
use crate::time::InstantLike;

/// Physical description of the sensed shaft.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateSensorConfig {
    /// State changes of the input line per shaft revolution.
    /// Defaults to 4, e.g. a two-pulse fan tachometer counting both edges.
    pub edges_per_revolution: u32,

    /// Highest physically possible speed in revolutions per minute. Readings are clamped to 120 %
    /// of this value.
    /// Defaults to 3000.
    pub max_rate: f32,

    /// Edges closer than this to the previous accepted edge are treated as contact bounce.
    /// Defaults to 5ms.
    pub debounce: Duration,
}

impl RateSensorConfig {
    /// Creates a configuration with the default 5ms debounce window
    pub const fn new(edges_per_revolution: u32, max_rate: f32) -> Self {
        Self {
            edges_per_revolution,
            max_rate,
            debounce: Duration::from_millis(5),
        }
    }

    /// Returns the clamp applied to every reading
    pub fn plausible_max(&self) -> f64 {
        1.2 * f64::from(self.max_rate)
    }
}

impl Default for RateSensorConfig {
    fn default() -> Self {
        Self::new(4, 3000.0)
    }
}

#[derive(Copy, Clone, Debug)]
struct EdgeState<I> {
    level: bool,
    last_edge: Option<I>,
    last_interval: Option<Duration>,
    edges: u32,
}

impl<I> EdgeState<I> {
    const fn idle(level: bool) -> Self {
        Self {
            level,
            last_edge: None,
            last_interval: None,
            edges: 0,
        }
    }
}

/// Measures shaft speed from the time between state changes of a digital input.
///
/// [`on_edge`](Self::on_edge) is meant to run in the pin-change interrupt and
/// [`measure_rate`](Self::measure_rate) in the control loop. Both take `&self`; the edge
/// bookkeeping is kept as a single value behind a critical section, so a reader never sees an
/// interval from one edge paired with the timestamp of another. Declare the sensor as a `static`
/// to share it with the handler.
///
/// ```rust
/// use core::time::Duration;
/// use trapezoidal_pid::sensor::{RateSensor, RateSensorConfig};
/// use trapezoidal_pid::time::Micros32;
///
/// static TACHO: RateSensor<Micros32> = RateSensor::new(RateSensorConfig::new(4, 3000.0));
///
/// TACHO.attach(false);
/// TACHO.on_edge(true, Micros32(10_000));
/// TACHO.on_edge(false, Micros32(20_000)); // 10ms per edge, 40ms per revolution
///
/// let rpm: f32 = TACHO.measure_rate(Micros32(20_000));
/// assert_eq!(rpm, 1500.0);
/// ```
pub struct RateSensor<I: InstantLike> {
    config: RateSensorConfig,
    state: Mutex<Cell<EdgeState<I>>>,
}

impl<I: InstantLike> RateSensor<I> {
    /// Creates a sensor with no edge history, assuming the line starts low
    pub const fn new(config: RateSensorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(Cell::new(EdgeState::idle(false))),
        }
    }

    /// Returns the sensor configuration
    pub fn config(&self) -> &RateSensorConfig {
        &self.config
    }

    /// Latches the current level of the input line and clears the edge history.
    /// Call once after configuring the pin and before enabling its interrupt.
    pub fn attach(&self, level: bool) {
        critical_section::with(|cs| self.state.borrow(cs).set(EdgeState::idle(level)));
        debug!("rate sensor attached, line level {=bool}", level);
    }

    /// Records a state change of the input line observed at `now`.
    ///
    /// Spurious calls are ignored: the level must differ from the last accepted one, and more
    /// than the debounce window must have passed since the last accepted edge.
    ///
    /// # Returns
    /// `true` if the edge was accepted.
    pub fn on_edge(&self, level: bool, now: I) -> bool {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            if level == state.level {
                return false;
            }
            // The first edge after attach only starts the clock
            let interval = match state.last_edge {
                Some(last) => {
                    let interval = now.duration_since(last);
                    if interval <= self.config.debounce {
                        return false;
                    }
                    Some(interval)
                }
                None => None,
            };
            state.level = level;
            state.last_interval = interval;
            state.last_edge = Some(now);
            state.edges = state.edges.wrapping_add(1);
            cell.set(state);
            true
        })
    }

    /// Returns the shaft speed in revolutions per minute as of `now`.
    ///
    /// The speed is zero until two edges have been seen. If more time has passed since the last
    /// edge than the last measured interval, the elapsed time is used instead, so a stalling shaft
    /// reads as decaying towards zero rather than holding its last speed.
    ///
    /// An edge recorded after `now` was sampled, i.e. by an interrupt landing between reading the
    /// clock and calling this method, counts as zero elapsed time. For wrapping counters "after"
    /// means less than half a counter period ahead of `now`.
    pub fn measure_rate<T: FloatCore>(&self, now: I) -> T {
        let state = critical_section::with(|cs| self.state.borrow(cs).get());
        let (Some(last_edge), Some(last_interval)) = (state.last_edge, state.last_interval) else {
            return T::zero();
        };

        let elapsed = now.duration_since(last_edge);
        let ahead = last_edge.duration_since(now);
        // Saturating instants report zero here whenever `now` is the later one
        let elapsed = if !ahead.is_zero() && ahead < elapsed {
            Duration::ZERO
        } else {
            elapsed
        };
        let interval = elapsed.max(last_interval);
        if interval.is_zero() || self.config.edges_per_revolution == 0 {
            return T::zero();
        }

        let seconds_per_revolution =
            interval.as_secs_f64() * f64::from(self.config.edges_per_revolution);
        let rate = 60.0 / seconds_per_revolution;
        let ceiling = self.config.plausible_max();
        if rate > ceiling {
            trace!("rate {=f32} rpm above plausible maximum", as_f32(rate));
        }
        T::from(rate.min(ceiling)).unwrap_or_else(T::zero)
    }

    /// Returns the number of accepted edges since the sensor was attached (wrapping)
    pub fn edge_count(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow(cs).get().edges)
    }

    /// Returns the last accepted level of the input line
    pub fn level(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).get().level)
    }
}
