#![warn(missing_docs)]

//! # Trapezoidal PID Controller Library
//!
//! A discrete PID (Proportional-Integral-Derivative) controller for closed-loop actuation on
//! small targets, such as holding a fan at a commanded speed.
//!
//! ## Features
//!
//! - **Variable sampling interval**: every computation measures the time elapsed since the
//!   previous one, so the loop tolerates irregular polling. Counter-based instants subtract with
//!   wrapping arithmetic.
//! - **Trapezoidal integration** of the error, with the integral expressed through the integral
//!   time constant `ti` (seconds) and the derivative through `td` (seconds). Zero disables a term.
//! - **Saturation and anti-windup**: optional output limits, which also bound the integral, and
//!   optional back-calculation of the saturation excess out of the integral.
//! - **Normalizing configuration**: inverted limits are swapped and impossible anti-windup
//!   requests are downgraded, with the corrections written back to the caller's record.
//! - **Injected clock and actuator**, so the control law runs against a fake clock in tests.
//! - A **debounced tachometer** whose state is shared safely between an interrupt handler and
//!   the control loop.
//!
//! ## Usage
//!
//! ### Functional PID Controller
//!
//! The functional controller holds only its configuration; the state travels in a `PidContext`
//! that `compute` takes and returns.
//!
//! ```rust
//! use trapezoidal_pid::pid::{FuncPidController, PidConfigBuilder, PidContext};
//! use trapezoidal_pid::time::Millis;
//!
//! let config = PidConfigBuilder::default()
//!     .kp(2.0)
//!     .ti(0.5)
//!     .output_limits(0.0, 100.0)
//!     .anti_windup(true)
//!     .build()
//!     .expect("Invalid PID config");
//! let pid = FuncPidController::new(config);
//! let ctx = PidContext::<Millis, f64>::new();
//!
//! let (output, ctx) = pid.compute(ctx, 1200.0, 1500.0, Millis(0));
//! assert_eq!(output, 100.0);
//! assert_eq!(ctx.info().proportional, 600.0);
//! ```
//!
//! ### Stateful PID Controller
//!
//! The stateful controller owns its context, samples an injected clock and can drive an
//! actuator.
//!
//! ```rust
//! use trapezoidal_pid::actuator::Actuator;
//! use trapezoidal_pid::pid::{PidConfigBuilder, PidController};
//! use trapezoidal_pid::time::StdClock;
//!
//! struct Pwm(u16);
//!
//! impl Actuator for Pwm {
//!     fn max_command(&self) -> u16 {
//!         255
//!     }
//!
//!     fn write(&mut self, command: u16) {
//!         self.0 = command;
//!     }
//! }
//!
//! let mut config = PidConfigBuilder::default()
//!     .kp(0.05)
//!     .ti(2.0)
//!     .output_limits(0.0, 1.0)
//!     .build()
//!     .unwrap();
//! let mut pid = PidController::with_actuator(StdClock, Pwm(0), config);
//!
//! let duty = pid.compute(0.0, Some(1500.0));
//! assert_eq!(duty, 1.0);
//! assert_eq!(pid.actuator().map(|pwm| pwm.0), Some(255));
//!
//! // Reconfiguring parks the actuator
//! config.kp = 0.01;
//! pid.configure(&mut config);
//! assert_eq!(pid.actuator().map(|pwm| pwm.0), Some(0));
//! ```
//!
//! ### Plugging in your Instant type
//!
//! ``` rust
//! use core::ops::Add;
//! use core::time::Duration;
//! use trapezoidal_pid::pid::{PidConfig, PidController};
//! use trapezoidal_pid::time::InstantLike;
//!
//! #[derive(Copy, Clone, Debug, PartialEq)]
//! struct Ticks(u16); // 1 tick = 1ms, wraps every 65.5s
//!
//! impl InstantLike for Ticks {
//!     fn duration_since(&self, other: Self) -> Duration {
//!         Duration::from_millis(u64::from(self.0.wrapping_sub(other.0)))
//!     }
//! }
//!
//! impl Add<Duration> for Ticks {
//!     type Output = Self;
//!
//!     fn add(self, rhs: Duration) -> Self {
//!         Ticks(self.0.wrapping_add(rhs.as_millis() as u16))
//!     }
//! }
//!
//! let mut pid = PidController::new(|| Ticks(0), PidConfig::<f32>::default());
//! let output = pid.compute(0.0, Some(1.0));
//! assert_eq!(output, 1.0);
//! ```
//!
//! ## Cargo features
//!
//! - `std` (default): `StdInstant`/`StdClock` and `std::error::Error` for `PidConfigError`.
//! - `defmt`: log configuration changes and computations through `defmt`, and derive
//!   `defmt::Format` for the public data types.
//! - `simulation`: plant models used by the closed-loop tests and demos.
#![no_std]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

/// The main module for the PID controller library.
pub mod pid;

/// The module containing time-related utilities to support elapsed-time measurement
pub mod time;

/// The output seam between the controller and the driven hardware
pub mod actuator;

/// The feedback seam: a debounced, interrupt-safe edge-rate sensor
pub mod sensor;

#[doc(hidden)]
#[cfg(feature = "simulation")]
pub mod sim;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
