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

use fixtures::test_pid;

use trapezoidal_pid::pid::{PidConfig, PidConfigBuilder, PidConfigError};

use approx::assert_relative_eq;
use trapezoidal_pid::time::Micros32;

/// Deterministic pseudo-random sequence in [-1, 1), good enough to shake the controller
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }
}

mod test_pid_config {

    use super::*;

    // (upper, lower) pairs, each with upper < lower
    const INVERTED_LIMITS: &[(f64, f64); 4] = &[(0.0, 10.0), (-5.0, 0.0), (-1e6, 1e6), (3.25, 3.5)];

    #[test]
    fn test_defaults() {
        let config = PidConfig::<f64>::default();
        assert_eq!(config.setpoint, 0.0);
        assert_eq!(config.kp, 1.0);
        assert_eq!(config.ti, 0.0);
        assert_eq!(config.td, 0.0);
        assert!(!config.limits_active());
        assert!(!config.anti_windup);
    }

    #[test]
    fn test_inverted_limits_are_swapped() {
        for (upper, lower) in INVERTED_LIMITS {
            let mut config = PidConfig {
                upper_limit: *upper,
                lower_limit: *lower,
                ..Default::default()
            };
            config.normalize();
            assert!(config.upper_limit >= config.lower_limit);
            assert_eq!((config.lower_limit, config.upper_limit), (*upper, *lower));
            assert!(config.limits_active());
        }
    }

    #[test]
    fn test_anti_windup_requires_limits() {
        let mut config = PidConfig::<f64>::default();
        assert!(!config.set_anti_windup(true));
        assert!(!config.anti_windup);

        config.lower_limit = 5.0;
        config.upper_limit = 5.0;
        assert!(!config.set_anti_windup(true));

        config.upper_limit = 6.0;
        assert!(config.set_anti_windup(true));
        assert!(!config.set_anti_windup(false));
    }

    #[test]
    fn test_normalize_downgrades_anti_windup() {
        let mut config = PidConfig {
            anti_windup: true,
            ..PidConfig::<f64>::default()
        };
        config.normalize();
        assert!(!config.anti_windup);

        // Normalizing twice changes nothing
        let mut limited = PidConfig {
            upper_limit: -1.0,
            lower_limit: 1.0,
            anti_windup: true,
            ..PidConfig::<f64>::default()
        };
        limited.normalize();
        let once = limited;
        limited.normalize();
        assert_eq!(once, limited);
        assert!(limited.anti_windup);
    }

    #[test]
    fn test_build_valid_config() {
        let config = PidConfigBuilder::default()
            .setpoint(1500.0)
            .kp(-0.5)
            .ti(2.0)
            .td(0.1)
            .output_limits(0.0, 255.0)
            .anti_windup(true)
            .build();
        assert_eq!(
            config,
            Ok(PidConfig {
                setpoint: 1500.0,
                kp: -0.5,
                ti: 2.0,
                td: 0.1,
                upper_limit: 255.0,
                lower_limit: 0.0,
                anti_windup: true,
            })
        );
    }

    #[test]
    fn test_build_normalizes_rather_than_rejects() {
        let config = PidConfigBuilder::<f32>::default()
            .output_limits(1.0, -1.0)
            .build()
            .unwrap();
        assert_eq!((config.lower_limit, config.upper_limit), (-1.0, 1.0));

        let config = PidConfigBuilder::<f32>::default()
            .anti_windup(true)
            .build()
            .unwrap();
        assert!(!config.anti_windup);
    }

    #[test]
    fn test_build_rejects_non_finite_values() {
        for it in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(
                PidConfigBuilder::default().setpoint(it).build().map(|_| ()),
                Err(PidConfigError::InvalidSetpoint)
            );
            assert_eq!(
                PidConfigBuilder::default().kp(it).build().map(|_| ()),
                Err(PidConfigError::InvalidProportionalGain)
            );
            assert_eq!(
                PidConfigBuilder::default().ti(it).build().map(|_| ()),
                Err(PidConfigError::InvalidIntegralTime)
            );
            assert_eq!(
                PidConfigBuilder::default().td(it).build().map(|_| ()),
                Err(PidConfigError::InvalidDerivativeTime)
            );
            assert_eq!(
                PidConfigBuilder::default()
                    .output_limits(0.0, it)
                    .build()
                    .map(|_| ()),
                Err(PidConfigError::InvalidOutputLimits)
            );
            assert_eq!(
                PidConfigBuilder::default()
                    .output_limits(it, 0.0)
                    .build()
                    .map(|_| ()),
                Err(PidConfigError::InvalidOutputLimits)
            );
        }
    }

    #[test]
    fn test_build_rejects_negative_time_constants() {
        assert_eq!(
            PidConfigBuilder::default().ti(-1.0).build().map(|_| ()),
            Err(PidConfigError::InvalidIntegralTime)
        );
        assert_eq!(
            PidConfigBuilder::default().td(-0.01).build().map(|_| ()),
            Err(PidConfigError::InvalidDerivativeTime)
        );
        // Zero is the off switch, not an error
        assert!(PidConfigBuilder::default().ti(0.0).td(0.0).build().is_ok());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PidConfigError::InvalidOutputLimits.to_string(),
            "output limits must be finite"
        );
    }

    #[test]
    fn test_configure_writes_corrections_back() {
        let mut pid = test_pid::make_stateful_controller(PidConfig::default());

        let mut config = PidConfig {
            upper_limit: 0.0,
            lower_limit: 10.0,
            anti_windup: true,
            ..Default::default()
        };
        pid.configure(&mut config);
        assert_eq!((config.lower_limit, config.upper_limit), (0.0, 10.0));
        assert!(config.anti_windup);
        assert_eq!(pid.config(), config);
        assert!(pid.is_limiting());

        let mut unlimited = PidConfig {
            upper_limit: 3.0,
            lower_limit: 3.0,
            anti_windup: true,
            ..Default::default()
        };
        pid.configure(&mut unlimited);
        assert!(!unlimited.anti_windup);
        assert!(!pid.is_anti_windup_enabled());
        assert!(!pid.is_limiting());
    }

    #[test]
    fn test_non_finite_limits_disable_limiting() {
        let mut pid = test_pid::make_stateful_controller(PidConfig::default());

        for (lower, upper) in [
            (0.0, f64::NAN),
            (f64::NAN, 10.0),
            (f64::NEG_INFINITY, f64::INFINITY),
        ] {
            let mut config = PidConfig {
                upper_limit: upper,
                lower_limit: lower,
                anti_windup: true,
                ..Default::default()
            };
            pid.configure(&mut config);
            assert_eq!((config.lower_limit, config.upper_limit), (0.0, 0.0));
            assert!(!config.anti_windup);
            assert!(!pid.is_limiting());

            assert_eq!(pid.compute(1.0, Some(2.0)), 1.0);
        }
    }

    #[test]
    fn test_set_anti_windup_is_gated_by_limits() {
        let mut pid = test_pid::make_stateful_controller(PidConfig::default());
        assert!(!pid.set_anti_windup(true));
        assert!(!pid.is_anti_windup_enabled());

        let mut config = PidConfig {
            upper_limit: 100.0,
            ..Default::default()
        };
        pid.configure(&mut config);
        assert!(pid.set_anti_windup(true));
        assert!(pid.is_anti_windup_enabled());
        assert!(pid.config().anti_windup);
    }
}

mod test_pid_computation {

    use super::test_pid::*;
    use super::*;

    mod p_control {
        use super::*;

        #[test]
        fn test_pure_proportional_control() {
            let config = PidConfigBuilder::default()
                .kp(2.0)
                .setpoint(10.0)
                .build()
                .unwrap();
            let (pid, ctx) = make_controller(config);

            let (output, ctx) = pid.compute(ctx, 4.0, pid.config().setpoint, Micros32(0));
            assert_eq!(output, 12.0);
            assert_eq!(ctx.info().proportional, 12.0);
            assert_eq!(ctx.info().integral, 0.0);
            assert_eq!(ctx.info().derivative, 0.0);
        }

        #[test]
        fn test_saturated_proportional_control() {
            let config = PidConfigBuilder::default()
                .kp(50.0)
                .setpoint(10.0)
                .output_limits(0.0, 100.0)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);

            assert_eq!(pid.compute(0.0, None), 100.0);
            assert_eq!(pid.info().proportional, 500.0);
            assert!(pid.info().limiting);
        }

        #[test]
        fn test_inverse_acting_plant() {
            let config = PidConfigBuilder::default()
                .kp(-1.0)
                .setpoint(10.0)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);
            assert_eq!(pid.compute(4.0, None), -6.0);
        }

        #[test]
        fn test_equal_limits_do_not_clamp() {
            let config = PidConfigBuilder::default()
                .kp(10.0)
                .setpoint(10.0)
                .output_limits(1.0, 1.0)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);
            assert_eq!(pid.compute(0.0, None), 100.0);
            assert!(!pid.info().limiting);
        }

        #[test]
        fn test_setpoint_argument_replaces_configured_setpoint() {
            let mut pid = make_stateful_controller(PidConfig::default());

            assert_eq!(pid.compute(1.0, Some(4.0)), 3.0);
            assert_eq!(pid.config().setpoint, 4.0);

            pid.clock().advance(STEP);
            // Sticks for later calls without a setpoint
            assert_eq!(pid.compute(1.0, None), 3.0);
        }
    }

    mod i_control {
        use super::*;

        fn make_integrating_config() -> PidConfig<f64> {
            PidConfigBuilder::default()
                .kp(1.0)
                .ti(1.0)
                .setpoint(2.0)
                .build()
                .unwrap()
        }

        #[test]
        fn test_first_computation_does_not_integrate() {
            let (pid, ctx) = make_controller(make_integrating_config());
            let (output, ctx) = pid.compute(ctx, 0.0, 2.0, Micros32(123));
            assert_eq!(output, 2.0);
            assert_eq!(ctx.info().integral, 0.0);
        }

        #[test]
        fn test_trapezoidal_accumulation() {
            let (pid, mut ctx) = make_controller(make_integrating_config());

            for _ in 0..11 {
                (_, ctx) = pid.compute(ctx, 0.0, 2.0, get_next_timestamp(&ctx));
            }
            // 10 intervals of 10ms, each adding kp * (2 + 2) / 2 * dt / ti
            assert_relative_eq!(ctx.info().integral, 0.2, epsilon = 1e-12);
            assert_relative_eq!(ctx.output(), 2.2, epsilon = 1e-12);
        }

        #[test]
        fn test_trapezoid_averages_consecutive_errors() {
            let (pid, ctx) = make_controller(make_integrating_config());

            let (_, ctx) = pid.compute(ctx, 2.0, 2.0, Micros32(0));
            let (output, ctx) = pid.compute(ctx, -2.0, 2.0, Micros32(10_000));

            assert_relative_eq!(ctx.info().integral, 0.02, epsilon = 1e-15);
            assert_relative_eq!(output, 4.02, epsilon = 1e-12);
        }

        #[test]
        fn test_integral_follows_elapsed_time() {
            let (pid, ctx) = make_controller(make_integrating_config());

            // Irregular polling: 10ms, then 30ms
            let (_, ctx) = pid.compute(ctx, 0.0, 2.0, Micros32(0));
            let (_, ctx) = pid.compute(ctx, 0.0, 2.0, Micros32(10_000));
            let (_, ctx) = pid.compute(ctx, 0.0, 2.0, Micros32(40_000));
            assert_relative_eq!(ctx.info().integral, 2.0 * 0.04, epsilon = 1e-12);
        }

        #[test]
        fn test_zero_ti_disables_integral() {
            let config = PidConfigBuilder::default()
                .kp(3.0)
                .td(0.05)
                .output_limits(-50.0, 50.0)
                .anti_windup(true)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);
            let mut rng = Lcg(7);

            for _ in 0..500 {
                pid.compute(100.0 * rng.next(), Some(100.0 * rng.next()));
                assert_eq!(pid.info().integral, 0.0);
                pid.clock().advance(STEP);
            }
        }

        #[test]
        fn test_integral_clamped_without_anti_windup() {
            let config = PidConfigBuilder::default()
                .kp(1.0)
                .ti(0.01)
                .setpoint(100.0)
                .output_limits(-1.0, 1.0)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);
            assert!(!pid.is_anti_windup_enabled());

            for _ in 0..5 {
                pid.compute(0.0, None);
                pid.clock().advance(STEP);
            }
            assert_eq!(pid.info().integral, 1.0);
            assert_eq!(pid.output(), 1.0);

            // And symmetrically on the lower side
            for _ in 0..5 {
                pid.compute(200.0, None);
                pid.clock().advance(STEP);
            }
            assert_eq!(pid.info().integral, -1.0);
            assert_eq!(pid.output(), -1.0);
        }
    }

    mod anti_windup {
        use super::*;

        #[test]
        fn test_compensation_is_signed_excess() {
            let config = PidConfigBuilder::default()
                .kp(1.0)
                .output_limits(0.0, 100.0)
                .anti_windup(true)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);

            assert_eq!(pid.compute(50.0, Some(0.0)), 0.0);
            assert_eq!(pid.info().compensation, -50.0);

            pid.clock().advance(STEP);
            assert_eq!(pid.compute(0.0, Some(130.0)), 100.0);
            assert_eq!(pid.info().compensation, 30.0);

            pid.clock().advance(STEP);
            assert_eq!(pid.compute(0.0, Some(60.0)), 60.0);
            assert_eq!(pid.info().compensation, 0.0);
        }

        #[test]
        fn test_no_compensation_when_disabled() {
            let config = PidConfigBuilder::default()
                .kp(1.0)
                .output_limits(0.0, 100.0)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);
            assert_eq!(pid.compute(0.0, Some(500.0)), 100.0);
            assert_eq!(pid.info().compensation, 0.0);
        }

        #[test]
        fn test_constant_saturation_does_not_wind_up() {
            let config = PidConfigBuilder::default()
                .kp(50.0)
                .ti(0.1)
                .setpoint(10.0)
                .output_limits(0.0, 100.0)
                .anti_windup(true)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);

            for _ in 0..1000 {
                assert_eq!(pid.compute(0.0, None), 100.0);
                assert!(pid.info().integral <= 100.0);
                pid.clock().advance(STEP);
            }
        }

        /// Closed loop around a first-order plant, `y' = (30 * u - y) / 0.5`, with the output
        /// saturating between 0 and 100. Returns the peak overshoot above the setpoint and the
        /// integral term while the output was still saturated.
        fn run_first_order_loop(anti_windup: bool) -> (f64, f64) {
            const SETPOINT: f64 = 1500.0;
            const DT: f64 = 0.01;

            let config = PidConfigBuilder::default()
                .kp(0.2)
                .ti(0.5)
                .setpoint(SETPOINT)
                .output_limits(0.0, 100.0)
                .anti_windup(anti_windup)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);

            let mut y = 0.0;
            let mut peak: f64 = 0.0;
            let mut saturated_integral = 0.0;
            for i in 0..1000 {
                let u = pid.compute(y, None);
                if i == 20 {
                    saturated_integral = pid.info().integral;
                }
                y += (30.0 * u - y) / 0.5 * DT;
                peak = peak.max(y);
                pid.clock().advance(STEP);
            }
            assert_relative_eq!(y, SETPOINT, epsilon = 1e-3);
            (peak - SETPOINT, saturated_integral)
        }

        #[test]
        fn test_anti_windup_limits_overshoot() {
            let (overshoot_aw, integral_aw) = run_first_order_loop(true);
            let (overshoot_plain, integral_plain) = run_first_order_loop(false);

            assert!(
                integral_aw < integral_plain,
                "Expected compensated integral ({integral_aw}) below plain integral ({integral_plain})"
            );
            assert!(
                overshoot_plain > 100.0,
                "Expected the plain loop to overshoot, got {overshoot_plain}"
            );
            assert!(
                overshoot_aw < overshoot_plain,
                "Expected less overshoot with anti-windup ({overshoot_aw}) than without ({overshoot_plain})"
            );
        }
    }

    mod d_control {
        use super::*;

        #[test]
        fn test_derivative_of_error() {
            let config = PidConfigBuilder::default()
                .kp(2.0)
                .td(0.1)
                .build()
                .unwrap();
            let (pid, ctx) = make_controller(config);

            let (_, ctx) = pid.compute(ctx, 0.0, 1.0, Micros32(0));
            assert_eq!(ctx.info().derivative, 0.0);

            let (output, ctx) = pid.compute(ctx, 0.0, 3.0, Micros32(10_000));
            // kp * td * (3 - 1) / 0.01s
            assert_relative_eq!(ctx.info().derivative, 40.0, epsilon = 1e-9);
            assert_relative_eq!(output, 6.0 + 40.0, epsilon = 1e-9);
        }

        #[test]
        fn test_colliding_timestamps_do_not_divide_by_zero() {
            let config = PidConfigBuilder::default()
                .kp(2.0)
                .ti(0.5)
                .td(0.1)
                .build()
                .unwrap();
            let (pid, ctx) = make_controller(config);

            let (_, ctx) = pid.compute(ctx, 0.0, 1.0, Micros32(5_000));
            let (output, ctx) = pid.compute(ctx, 0.0, 3.0, Micros32(5_000));
            assert!(output.is_finite());
            assert_eq!(ctx.info().derivative, 0.0);
            assert_eq!(ctx.info().integral, 0.0);
            assert_eq!(output, 6.0);
        }

        #[test]
        fn test_zero_td_disables_derivative() {
            let config = PidConfigBuilder::default()
                .kp(3.0)
                .ti(0.2)
                .output_limits(-50.0, 50.0)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);
            let mut rng = Lcg(11);

            for _ in 0..500 {
                pid.compute(100.0 * rng.next(), Some(100.0 * rng.next()));
                assert_eq!(pid.info().derivative, 0.0);
                pid.clock().advance(STEP);
            }
        }
    }

    mod safety_and_lifecycle {
        use super::*;

        use core::time::Duration;
        use trapezoidal_pid::pid::PidController;
        use trapezoidal_pid::time::{Clock, ManualClock};

        #[test]
        fn test_output_within_limits() {
            let mut rng = Lcg(42);
            for anti_windup in [false, true] {
                let config = PidConfigBuilder::default()
                    .kp(4.0)
                    .ti(0.05)
                    .td(0.02)
                    .output_limits(20.0, -5.0)
                    .anti_windup(anti_windup)
                    .build()
                    .unwrap();
                let mut pid = make_stateful_controller(config);

                for _ in 0..2000 {
                    let output = pid.compute(1000.0 * rng.next(), Some(100.0 * rng.next()));
                    assert!((-5.0..=20.0).contains(&output), "{output} escaped the limits");
                    assert!((-5.0..=20.0).contains(&pid.info().integral));
                    // Irregular polling between 1ms and 21ms
                    let jitter = (rng.next() + 1.0) * 10_000.0;
                    pid.clock().advance(Duration::from_micros(1_000 + jitter as u64));
                }
            }
        }

        #[test]
        fn test_result_queries() {
            let config = PidConfigBuilder::default()
                .kp(1.5)
                .ti(0.3)
                .td(0.01)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);

            for (input, setpoint) in [
                (0.0, 1.5),
                (1.5, 1.0),
                (0.2, -1.0),
                (-1.0, 0.2),
                (-1.0, -2.2),
                (-2.3, -2.0),
            ] {
                let expected = pid.compute(input, Some(setpoint));
                let info = pid.info();

                assert_eq!(pid.output(), expected);
                assert_eq!(info.output, expected);
                assert_eq!(info.last_measurement, input);
                assert_eq!(
                    info.output,
                    info.proportional + info.integral + info.derivative
                );
                pid.clock().advance(STEP);
            }
        }

        #[test]
        fn test_shutdown_then_compute_matches_fresh_controller() {
            let config = PidConfigBuilder::default()
                .kp(0.8)
                .ti(0.4)
                .td(0.05)
                .setpoint(1200.0)
                .output_limits(0.0, 100.0)
                .anti_windup(true)
                .build()
                .unwrap();
            let mut used = make_stateful_controller(config);
            let mut rng = Lcg(3);
            for _ in 0..50 {
                used.compute(1200.0 + 300.0 * rng.next(), None);
                used.clock().advance(STEP);
            }
            assert_ne!(used.info().integral, 0.0);

            used.shutdown();
            assert_eq!(used.info().proportional, 0.0);
            assert_eq!(used.info().integral, 0.0);
            assert_eq!(used.info().derivative, 0.0);
            assert_eq!(used.last_time(), None);
            assert_eq!(used.config(), config);

            let mut fresh = PidController::new(ManualClock::new(Micros32(777)), config);
            for measurement in [1100.0, 1150.0, 1190.0, 1210.0, 1195.0] {
                assert_eq!(
                    used.compute(measurement, None),
                    fresh.compute(measurement, None)
                );
                assert_eq!(used.info(), fresh.info());
                used.clock().advance(STEP);
                fresh.clock().advance(STEP);
            }
        }

        #[test]
        fn test_configure_keeps_integral_but_restarts_history() {
            let mut config = PidConfigBuilder::default()
                .kp(1.0)
                .ti(1.0)
                .setpoint(2.0)
                .build()
                .unwrap();
            let mut pid = make_stateful_controller(config);
            for _ in 0..11 {
                pid.compute(0.0, None);
                pid.clock().advance(STEP);
            }
            let integral = pid.info().integral;
            assert_relative_eq!(integral, 0.2, epsilon = 1e-12);

            pid.configure(&mut config);
            assert_eq!(pid.last_time(), None);
            assert_eq!(pid.info().integral, integral);

            // First computation after configure does not integrate
            assert_eq!(pid.compute(0.0, None), 2.0 + integral);
            assert_eq!(pid.info().integral, integral);
        }

        #[test]
        fn test_elapsed_time_across_clock_wraparound() {
            let config = PidConfigBuilder::default()
                .kp(1.0)
                .ti(1.0)
                .td(0.01)
                .setpoint(2.0)
                .build()
                .unwrap();
            let mut wrapping =
                PidController::new(ManualClock::new(Micros32(u32::MAX - 15_000)), config);
            let mut reference = make_stateful_controller(config);

            for measurement in [0.0, 0.5, 1.0, 1.5, 1.75] {
                assert_eq!(
                    wrapping.compute(measurement, None),
                    reference.compute(measurement, None)
                );
                wrapping.clock().advance(STEP);
                reference.clock().advance(STEP);
            }
            // The clock really did wrap
            assert!(wrapping.clock().now() < Micros32(u32::MAX - 15_000));
        }
    }
}

mod test_actuator {
    use super::test_pid::*;
    use super::*;

    fn make_limited_config() -> PidConfig<f64> {
        PidConfigBuilder::default()
            .kp(1.0)
            .setpoint(50.0)
            .output_limits(0.0, 100.0)
            .build()
            .unwrap()
    }

    fn commands(pid: &DrivingPid) -> Vec<u16> {
        pid.actuator().map(|a| a.commands.clone()).unwrap_or_default()
    }

    #[test]
    fn test_construction_parks_actuator() {
        let pid = make_driving_controller(make_limited_config());
        assert_eq!(commands(&pid), vec![0]);
    }

    #[test]
    fn test_output_is_scaled_to_actuator_range() {
        let mut pid = make_driving_controller(make_limited_config());
        assert_eq!(pid.compute(0.0, None), 50.0);
        pid.clock().advance(STEP);
        assert_eq!(pid.compute(-100.0, None), 100.0);
        pid.clock().advance(STEP);
        assert_eq!(pid.compute(75.0, None), 0.0);
        pid.clock().advance(STEP);
        assert_eq!(pid.compute(49.0, None), 1.0);
        assert_eq!(commands(&pid), vec![0, 500, 1000, 0, 10]);
    }

    #[test]
    fn test_no_writes_without_limits() {
        let config = PidConfigBuilder::default().kp(1.0).build().unwrap();
        let mut pid = make_driving_controller(config);
        pid.compute(3.0, Some(10.0));
        assert_eq!(commands(&pid), vec![0]);
    }

    #[test]
    fn test_configure_and_shutdown_park_actuator() {
        let mut config = make_limited_config();
        let mut pid = make_driving_controller(config);

        pid.compute(0.0, None);
        assert_eq!(pid.actuator().and_then(|a| a.last()), Some(500));

        pid.shutdown();
        assert_eq!(pid.actuator().and_then(|a| a.last()), Some(0));

        pid.compute(0.0, None);
        config.kp = 0.5;
        pid.configure(&mut config);
        assert_eq!(commands(&pid), vec![0, 500, 0, 500, 0]);
    }

    #[test]
    fn test_borrowed_actuator() {
        use trapezoidal_pid::pid::PidController;
        use trapezoidal_pid::time::ManualClock;

        let mut pwm = RecordingActuator::new(255);
        {
            let mut pid = PidController::with_actuator(
                ManualClock::new(Micros32(0)),
                &mut pwm,
                make_limited_config(),
            );
            pid.compute(0.0, None);
        }
        assert_eq!(pwm.commands, vec![0, 128]);
    }
}
