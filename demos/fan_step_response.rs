//! Step response of a PWM-driven fan under PID speed control, read through a tachometer.
//! This example requires the `--features simulation` flag to be enabled. It prints CSV to stdout.
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

#[cfg(feature = "simulation")]
pub fn main() {
    use nalgebra as na;

    use std::f64::consts::FRAC_PI_2;
    use std::time::Duration;

    use trapezoidal_pid::{
        actuator::Actuator,
        pid::{PidConfigBuilder, PidController},
        sensor::{RateSensor, RateSensorConfig},
        sim::{self, SignalGenerator},
        time::{Clock, ManualClock, Micros32},
    };

    /// 8-bit PWM stage
    struct Pwm(u16);

    impl Actuator for Pwm {
        fn max_command(&self) -> u16 {
            255
        }

        fn write(&mut self, command: u16) {
            self.0 = command;
        }
    }

    const SIM_STEP: Duration = Duration::from_millis(1);
    const CONTROL_PERIOD_MS: u32 = 10;

    static TACHO: RateSensor<Micros32> = RateSensor::new(RateSensorConfig::new(4, 4000.0));

    let mdl = sim::FanMotor::default();
    let cfg = PidConfigBuilder::default()
        .kp(0.05)
        .ti(0.3)
        .output_limits(0.0, 100.0)
        .anti_windup(true)
        .build()
        .unwrap();
    let mut pid = PidController::with_actuator(ManualClock::new(Micros32(0)), Pwm(0), cfg);

    // Alternate between 1000 and 2000 rpm every 2s
    let square = SignalGenerator::new(sim::WaveForm::Square, Micros32(0), 4.0, 500.0, 1500.0);

    let mut state = na::Vector2::<f64>::zeros();
    let mut angle = 0.0;
    let mut level = false;
    TACHO.attach(level);

    println!("time_s,setpoint_rpm,measured_rpm,true_rpm,output,pwm");
    for ms in 0..8000u32 {
        let now = pid.clock().now();
        if ms % CONTROL_PERIOD_MS == 0 {
            let setpoint = square.generate(now);
            let measured: f64 = TACHO.measure_rate(now);
            let output = pid.compute(measured, Some(setpoint));
            let pwm = pid.actuator().map_or(0, |pwm| pwm.0);
            println!(
                "{:.3},{setpoint:.1},{measured:.1},{:.1},{output:.2},{pwm}",
                f64::from(ms) * 1e-3,
                mdl.h(state),
            );
        }

        // The plant sees the quantized command, like the real PWM stage
        let duty = f64::from(pid.actuator().map_or(0, |pwm| pwm.0)) / 255.0;
        state = sim::rk4_step(|x| mdl.f(x, duty), state, SIM_STEP.as_secs_f64());
        angle += state[1] * SIM_STEP.as_secs_f64();
        while angle >= FRAC_PI_2 {
            angle -= FRAC_PI_2;
            level = !level;
            TACHO.on_edge(level, now + SIM_STEP);
        }
        pid.clock().advance(SIM_STEP);
    }

    pid.shutdown();
}

#[cfg(not(feature = "simulation"))]
fn main() {
    eprintln!("This example requires `--features simulation` to run.");
}
