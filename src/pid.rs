// Variable-interval PID with trapezoidal integration and back-calculation anti-windup
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

use core::time::Duration;

use num_traits::float::FloatCore;

use crate::actuator::{scale_command, Actuator, NoActuator};
use crate::fmt::as_f32;
use crate::time::{Clock, InstantLike};

/// Configuration of the PID controller.
///
/// The configuration is a two-way contract: when handed to [`PidController::configure`] or
/// [`FuncPidController::configure`], invalid combinations are corrected in place so the caller
/// sees the values the controller actually runs with.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidConfig<T: FloatCore> {
    /// Value the measurement is driven towards.
    /// Defaults to 0.
    pub setpoint: T,

    /// Proportional gain. May be negative for inverse-acting plants, e.g. a cooler whose output
    /// falls as the command rises.
    /// Defaults to 1.
    pub kp: T,

    /// Integral time constant in seconds. Zero disables the integral term.
    /// Defaults to 0.
    pub ti: T,

    /// Derivative time constant in seconds. Zero disables the derivative term.
    /// Defaults to 0.
    pub td: T,

    /// Upper bound of the output and of the integral term.
    /// Defaults to 0, i.e. no limit as long as the lower bound is also 0.
    pub upper_limit: T,

    /// Lower bound of the output and of the integral term.
    /// Defaults to 0.
    pub lower_limit: T,

    /// Whether to compensate the integral term while the output saturates.
    /// Only honoured when the limits are active.
    /// Defaults to false.
    pub anti_windup: bool,
}

impl<T: FloatCore> Default for PidConfig<T> {
    fn default() -> Self {
        PidConfig {
            setpoint: T::zero(),
            kp: T::one(),
            ti: T::zero(),
            td: T::zero(),
            upper_limit: T::zero(),
            lower_limit: T::zero(),
            anti_windup: false,
        }
    }
}

impl<T: FloatCore> PidConfig<T> {
    /// Returns whether output (and integral) limiting is in effect, i.e. the limits differ.
    pub fn limits_active(&self) -> bool {
        self.upper_limit != self.lower_limit
    }

    /// Requests anti-windup compensation.
    ///
    /// # Returns
    /// The resolved flag: `false` whenever the limits are inactive, regardless of `enabled`.
    pub fn set_anti_windup(&mut self, enabled: bool) -> bool {
        self.anti_windup = enabled && self.limits_active();
        self.anti_windup
    }

    /// Corrects the configuration in place instead of rejecting it.
    ///
    /// - Non-finite limits switch limiting off; both limits become zero.
    /// - Inverted limits are swapped.
    /// - Anti-windup is switched off unless the limits are active.
    pub fn normalize(&mut self) {
        if !self.upper_limit.is_finite() || !self.lower_limit.is_finite() {
            warn!("output limits not finite, limiting disabled");
            self.upper_limit = T::zero();
            self.lower_limit = T::zero();
        }
        if self.upper_limit < self.lower_limit {
            warn!(
                "output limits inverted ({=f32} < {=f32}), swapping",
                as_f32(self.upper_limit),
                as_f32(self.lower_limit)
            );
            core::mem::swap(&mut self.upper_limit, &mut self.lower_limit);
        }
        let requested = self.anti_windup;
        if !self.set_anti_windup(requested) && requested {
            warn!("anti-windup requested without output limits, disabled");
        }
    }
}

/// Errors raised by [`PidConfigBuilder::build`] for values that cannot be normalized.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum PidConfigError {
    /// The setpoint is NaN or infinite
    #[cfg_attr(feature = "std", error("setpoint must be finite"))]
    InvalidSetpoint,

    /// The proportional gain is NaN or infinite
    #[cfg_attr(feature = "std", error("proportional gain must be finite"))]
    InvalidProportionalGain,

    /// The integral time is negative, NaN or infinite
    #[cfg_attr(
        feature = "std",
        error("integral time must be finite and non-negative (0 disables the integral term)")
    )]
    InvalidIntegralTime,

    /// The derivative time is negative, NaN or infinite
    #[cfg_attr(
        feature = "std",
        error("derivative time must be finite and non-negative (0 disables the derivative term)")
    )]
    InvalidDerivativeTime,

    /// Either output limit is NaN or infinite
    #[cfg_attr(feature = "std", error("output limits must be finite"))]
    InvalidOutputLimits,
}

/// Builder for [`PidConfig`], validating every value at `build` time.
///
/// ```rust
/// use trapezoidal_pid::pid::PidConfigBuilder;
///
/// let config = PidConfigBuilder::default()
///     .kp(0.8)
///     .ti(1.5)
///     .output_limits(100.0, 0.0) // inverted on purpose
///     .anti_windup(true)
///     .build()
///     .expect("finite values");
///
/// assert_eq!((config.lower_limit, config.upper_limit), (0.0, 100.0));
/// assert!(config.anti_windup);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct PidConfigBuilder<T: FloatCore> {
    config: PidConfig<T>,
}

impl<T: FloatCore> Default for PidConfigBuilder<T> {
    fn default() -> Self {
        Self {
            config: PidConfig::default(),
        }
    }
}

impl<T: FloatCore> PidConfigBuilder<T> {
    /// Sets the setpoint
    pub fn setpoint(mut self, setpoint: T) -> Self {
        self.config.setpoint = setpoint;
        self
    }

    /// Sets the proportional gain
    pub fn kp(mut self, kp: T) -> Self {
        self.config.kp = kp;
        self
    }

    /// Sets the integral time constant in seconds
    pub fn ti(mut self, ti: T) -> Self {
        self.config.ti = ti;
        self
    }

    /// Sets the derivative time constant in seconds
    pub fn td(mut self, td: T) -> Self {
        self.config.td = td;
        self
    }

    /// Sets both output limits. Passing them in the wrong order is harmless.
    pub fn output_limits(mut self, lower: T, upper: T) -> Self {
        self.config.lower_limit = lower;
        self.config.upper_limit = upper;
        self
    }

    /// Requests anti-windup compensation
    pub fn anti_windup(mut self, enabled: bool) -> Self {
        self.config.anti_windup = enabled;
        self
    }

    /// Validates and normalizes the configuration.
    pub fn build(self) -> Result<PidConfig<T>, PidConfigError> {
        let mut config = self.config;
        if !config.setpoint.is_finite() {
            return Err(PidConfigError::InvalidSetpoint);
        }
        if !config.kp.is_finite() {
            return Err(PidConfigError::InvalidProportionalGain);
        }
        if !config.ti.is_finite() || config.ti < T::zero() {
            return Err(PidConfigError::InvalidIntegralTime);
        }
        if !config.td.is_finite() || config.td < T::zero() {
            return Err(PidConfigError::InvalidDerivativeTime);
        }
        if !config.upper_limit.is_finite() || !config.lower_limit.is_finite() {
            return Err(PidConfigError::InvalidOutputLimits);
        }
        config.normalize();
        Ok(config)
    }
}

/// Snapshot of the last computation, for diagnostics. Never recomputed on read.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidInfo<T: FloatCore> {
    /// The command returned by the last computation
    pub output: T,
    /// Proportional component of the last output
    pub proportional: T,
    /// Integral component of the last output; this is also the running accumulator
    pub integral: T,
    /// Derivative component of the last output
    pub derivative: T,
    /// Anti-windup compensation applied by the last computation
    pub compensation: T,
    /// Measurement passed to the last computation
    pub last_measurement: T,
    /// Whether output limiting was in effect
    pub limiting: bool,
}

impl<T: FloatCore> Default for PidInfo<T> {
    fn default() -> Self {
        Self {
            output: T::zero(),
            proportional: T::zero(),
            integral: T::zero(),
            derivative: T::zero(),
            compensation: T::zero(),
            last_measurement: T::zero(),
            limiting: false,
        }
    }
}

/// The mutable state of a PID controller.
///
/// The context remembers when the last computation happened, the last error and anti-windup
/// compensation (both needed by the trapezoidal integrator), and a snapshot of the last result.
#[derive(Copy, Clone, Debug)]
pub struct PidContext<I: InstantLike, T: FloatCore> {
    last_time: Option<I>,
    last_error: T,
    last_compensation: T,
    info: PidInfo<T>,
}

impl<I: InstantLike, T: FloatCore> Default for PidContext<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: InstantLike, T: FloatCore> PidContext<I, T> {
    /// Creates a context with no computation history and a zero integral
    pub fn new() -> Self {
        Self {
            last_time: None,
            last_error: T::zero(),
            last_compensation: T::zero(),
            info: PidInfo::default(),
        }
    }

    /// Returns the timestamp of the last computation, `None` until the first one after a reset
    pub fn last_time(&self) -> Option<I> {
        self.last_time
    }

    /// Returns the snapshot of the last computation
    pub fn info(&self) -> PidInfo<T> {
        self.info
    }

    /// Returns the last computed output
    pub fn output(&self) -> T {
        self.info.output
    }

    /// Forgets the timing and error history, so the next computation skips the integral and
    /// derivative updates. The integral accumulated so far is kept.
    pub fn restart(&mut self) {
        self.last_time = None;
        self.last_error = T::zero();
        self.last_compensation = T::zero();
    }

    /// Forgets the history and zeroes the proportional, integral and derivative terms.
    /// The last output and measurement remain readable.
    pub fn shutdown(&mut self) {
        self.restart();
        self.info.proportional = T::zero();
        self.info.integral = T::zero();
        self.info.derivative = T::zero();
    }
}

fn secs<T: FloatCore>(duration: Duration) -> T {
    T::from(duration.as_secs_f64()).unwrap_or_else(T::infinity)
}

/// A functional implementation of the PID controller.
///
/// The controller holds only its (normalized) configuration; `compute` takes a context by value
/// and returns the updated one, so it is pure and trivially testable.
#[derive(Copy, Clone, Debug)]
pub struct FuncPidController<T: FloatCore> {
    config: PidConfig<T>,
}

impl<T: FloatCore> FuncPidController<T> {
    /// Creates a controller, normalizing `config` first
    pub fn new(mut config: PidConfig<T>) -> Self {
        config.normalize();
        Self { config }
    }

    /// Returns the configuration in effect
    pub fn config(&self) -> &PidConfig<T> {
        &self.config
    }

    /// Normalizes `config` in place and adopts it.
    ///
    /// The caller is responsible for restarting any context used with this controller.
    pub fn configure(&mut self, config: &mut PidConfig<T>) {
        config.normalize();
        self.config = *config;
    }

    /// Requests anti-windup compensation, returning the resolved flag
    pub fn set_anti_windup(&mut self, enabled: bool) -> bool {
        self.config.set_anti_windup(enabled)
    }

    /// Computes the control output for one sample.
    ///
    /// # Arguments
    /// - `ctx`: The context produced by the previous call (or a fresh one).
    /// - `measurement`: The process value fed back from the plant.
    /// - `setpoint`: The value to drive `measurement` towards.
    /// - `timestamp`: When `measurement` was taken.
    ///
    /// # Returns
    /// The (clamped, if limits are active) output and the updated context.
    pub fn compute<I: InstantLike>(
        &self,
        mut ctx: PidContext<I, T>,
        measurement: T,
        setpoint: T,
        timestamp: I,
    ) -> (T, PidContext<I, T>) {
        let cfg = &self.config;
        let limiting = cfg.limits_active();
        let two = T::one() + T::one();

        let elapsed = ctx
            .last_time
            .map(|last| secs::<T>(timestamp.duration_since(last)));
        let error = setpoint - measurement;

        let proportional = cfg.kp * error;

        // Colliding timestamps carry no slope information
        let derivative = match elapsed {
            Some(dt) if cfg.td != T::zero() && dt > T::zero() => {
                cfg.kp * cfg.td * (error - ctx.last_error) / dt
            }
            _ => T::zero(),
        };

        // Provisional output uses the integral from the previous sample
        let provisional = proportional + ctx.info.integral + derivative;
        let compensation = if limiting && cfg.anti_windup {
            if provisional > cfg.upper_limit {
                provisional - cfg.upper_limit
            } else if provisional < cfg.lower_limit {
                provisional - cfg.lower_limit
            } else {
                T::zero()
            }
        } else {
            T::zero()
        };

        let mut integral = ctx.info.integral;
        if let Some(dt) = elapsed {
            if cfg.ti != T::zero() {
                integral = integral
                    + (cfg.kp * (error + ctx.last_error) - (compensation + ctx.last_compensation))
                        * dt
                        / (two * cfg.ti);
                // Also catches windup left over from gain or limit changes
                if limiting {
                    integral = num_traits::clamp(integral, cfg.lower_limit, cfg.upper_limit);
                }
            }
        }

        let mut output = proportional + integral + derivative;
        if limiting {
            output = num_traits::clamp(output, cfg.lower_limit, cfg.upper_limit);
        }

        trace!(
            "pid e={=f32} p={=f32} i={=f32} d={=f32} out={=f32}",
            as_f32(error),
            as_f32(proportional),
            as_f32(integral),
            as_f32(derivative),
            as_f32(output)
        );

        ctx.last_time = Some(timestamp);
        ctx.last_error = error;
        ctx.last_compensation = compensation;
        ctx.info = PidInfo {
            output,
            proportional,
            integral,
            derivative,
            compensation,
            last_measurement: measurement,
            limiting,
        };
        (output, ctx)
    }
}

/// A stateful implementation of the PID controller.
///
/// Owns its context, reads time from an injected [`Clock`] and, optionally, drives an
/// [`Actuator`]. Call [`compute`](Self::compute) from a polling loop at any cadence; the elapsed
/// time between calls is measured, not assumed.
///
/// ```rust
/// use core::time::Duration;
/// use trapezoidal_pid::pid::{PidConfigBuilder, PidController};
/// use trapezoidal_pid::time::{ManualClock, Micros32};
///
/// let config = PidConfigBuilder::default()
///     .kp(2.0)
///     .setpoint(10.0)
///     .build()
///     .unwrap();
/// let mut pid = PidController::new(ManualClock::new(Micros32(0)), config);
///
/// assert_eq!(pid.compute(4.0, None), 12.0);
///
/// pid.clock().advance(Duration::from_millis(10));
/// assert_eq!(pid.compute(4.0, Some(5.0)), 2.0);
/// assert_eq!(pid.config().setpoint, 5.0);
/// ```
#[derive(Debug)]
pub struct PidController<C: Clock, T: FloatCore, A: Actuator = NoActuator> {
    ctx: PidContext<C::Instant, T>,
    controller: FuncPidController<T>,
    clock: C,
    actuator: Option<A>,
}

impl<C: Clock, T: FloatCore> PidController<C, T, NoActuator> {
    /// Creates a controller that only computes, without driving hardware
    pub fn new(clock: C, config: PidConfig<T>) -> Self {
        Self {
            ctx: PidContext::new(),
            controller: FuncPidController::new(config),
            clock,
            actuator: None,
        }
    }
}

impl<C: Clock, T: FloatCore, A: Actuator> PidController<C, T, A> {
    /// Creates a controller that writes every limited output to `actuator`.
    ///
    /// The actuator is commanded to zero immediately.
    pub fn with_actuator(clock: C, actuator: A, config: PidConfig<T>) -> Self {
        let mut pid = Self {
            ctx: PidContext::new(),
            controller: FuncPidController::new(config),
            clock,
            actuator: Some(actuator),
        };
        pid.stop_actuator();
        pid
    }

    /// Replaces the configuration, normalizing `config` in place.
    ///
    /// Resets the timing and error history (the accumulated integral is kept) and commands zero to
    /// the actuator, if any.
    pub fn configure(&mut self, config: &mut PidConfig<T>) {
        self.controller.configure(config);
        self.ctx.restart();
        self.stop_actuator();
        debug!(
            "pid configured: limiting={=bool} anti_windup={=bool}",
            config.limits_active(),
            config.anti_windup
        );
    }

    /// Computes the control output for a new measurement taken now.
    ///
    /// If `setpoint` is given, it replaces the configured setpoint before computing.
    /// With an actuator attached and limits active, the output is also written to the actuator.
    pub fn compute(&mut self, measurement: T, setpoint: Option<T>) -> T {
        if let Some(setpoint) = setpoint {
            self.controller.config.setpoint = setpoint;
        }
        let timestamp = self.clock.now();
        let (output, ctx) = self.controller.compute(
            self.ctx,
            measurement,
            self.controller.config.setpoint,
            timestamp,
        );
        self.ctx = ctx;

        let cfg = self.controller.config;
        if let Some(actuator) = self.actuator.as_mut() {
            if cfg.limits_active() {
                let max_command = actuator.max_command();
                if let Some(command) =
                    scale_command(output, cfg.lower_limit, cfg.upper_limit, max_command)
                {
                    actuator.write(command);
                }
            }
        }
        output
    }

    /// Stops the loop while keeping the configuration.
    ///
    /// Clears the history and the three terms and commands zero to the actuator. The next
    /// `compute` behaves exactly like the first one on a fresh controller.
    pub fn shutdown(&mut self) {
        self.ctx.shutdown();
        self.stop_actuator();
        debug!("pid shut down");
    }

    /// Requests anti-windup compensation, returning the resolved flag
    pub fn set_anti_windup(&mut self, enabled: bool) -> bool {
        self.controller.set_anti_windup(enabled)
    }

    /// Returns whether anti-windup compensation is in effect
    pub fn is_anti_windup_enabled(&self) -> bool {
        self.controller.config.anti_windup
    }

    /// Returns whether output limiting is in effect
    pub fn is_limiting(&self) -> bool {
        self.controller.config.limits_active()
    }

    /// Returns a copy of the configuration in effect
    pub fn config(&self) -> PidConfig<T> {
        self.controller.config
    }

    /// Returns the snapshot of the last computation
    pub fn info(&self) -> PidInfo<T> {
        self.ctx.info()
    }

    /// Returns the last computed output
    pub fn output(&self) -> T {
        self.ctx.output()
    }

    /// Returns the timestamp of the last computation, `None` until the first one after a reset
    pub fn last_time(&self) -> Option<C::Instant> {
        self.ctx.last_time()
    }

    /// Returns the clock this controller samples
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the attached actuator, if any
    pub fn actuator(&self) -> Option<&A> {
        self.actuator.as_ref()
    }

    fn stop_actuator(&mut self) {
        if let Some(actuator) = self.actuator.as_mut() {
            actuator.write(0);
        }
    }
}
