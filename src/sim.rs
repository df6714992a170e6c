use crate::time::InstantLike;
use nalgebra as na;

pub enum WaveForm {
    Sine,
    Square,
}

pub struct SignalGenerator<I: InstantLike> {
    fcn: fn(f64) -> f64,
    initial_time: I,
    period: f64,
    amplitude: f64,
    offset: f64,
}

impl<I: InstantLike> SignalGenerator<I> {
    /// `period` is in seconds
    pub fn new(
        waveform: WaveForm,
        initial_time: I,
        period: f64,
        amplitude: f64,
        offset: f64,
    ) -> Self {
        Self {
            fcn: match waveform {
                WaveForm::Sine => f64::sin,
                WaveForm::Square => |x| x.sin().signum(),
            },
            initial_time,
            period,
            amplitude,
            offset,
        }
    }

    pub fn generate(&self, time: I) -> f64 {
        let phase = time.duration_since(self.initial_time).as_secs_f64() / self.period;
        self.amplitude * (self.fcn)(2.0 * core::f64::consts::PI * phase) + self.offset
    }
}

/// Classic fourth-order Runge-Kutta step of `x' = f(x)`
pub fn rk4_step<F>(f: F, x: na::Vector2<f64>, h: f64) -> na::Vector2<f64>
where
    F: Fn(na::Vector2<f64>) -> na::Vector2<f64>,
{
    let k1 = f(x);
    let k2 = f(x + k1 * (h / 2.0));
    let k3 = f(x + k2 * (h / 2.0));
    let k4 = f(x + k3 * h);
    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (h / 6.0)
}

/// A brushed DC fan driven by a PWM stage from a fixed supply.
pub struct FanMotor {
    pub supply_voltage: f64,
    pub resistance: f64,
    pub inductance: f64,
    /// Back-EMF constant, V·s/rad. Numerically equal to the torque constant in SI units.
    pub motor_constant: f64,
    pub inertia: f64,
    pub viscous_friction: f64,
}

impl Default for FanMotor {
    /// A small 12V fan topping out a little above 3700 rpm
    fn default() -> Self {
        Self {
            supply_voltage: 12.0,
            resistance: 2.0,
            inductance: 0.01,
            motor_constant: 0.03,
            inertia: 1e-4,
            viscous_friction: 1e-5,
        }
    }
}

impl FanMotor {
    /// Implements the state-space realization of the armature circuit and the rotor:
    /// ┌    ┐   ┌               ┐┌   ┐   ┌     ┐
    /// │ i' │ = │ -R/L   -K/L   ││ i │ + │ V/L │ d
    /// │ ω' │   │  K/J   -b/J   ││ ω │   │ 0   │
    /// └    ┘   └               ┘└   ┘   └     ┘
    ///
    /// where `d` is the PWM duty cycle, saturated into [0, 1].
    pub fn f(&self, x: na::Vector2<f64>, duty: f64) -> na::Vector2<f64> {
        let duty = duty.clamp(0.0, 1.0);
        let mat_a = na::Matrix2::new(
            -self.resistance / self.inductance,
            -self.motor_constant / self.inductance,
            self.motor_constant / self.inertia,
            -self.viscous_friction / self.inertia,
        );
        let mat_b = na::Vector2::new(self.supply_voltage / self.inductance, 0.0);

        mat_a * x + mat_b * duty
    }

    /// Shaft speed in revolutions per minute
    pub fn h(&self, x: na::Vector2<f64>) -> f64 {
        x[1] * 60.0 / (2.0 * core::f64::consts::PI)
    }

    /// Steady-state speed in rpm at full duty
    pub fn top_speed(&self) -> f64 {
        let omega = self.motor_constant * self.supply_voltage
            / (self.resistance * self.viscous_friction + self.motor_constant.powi(2));
        omega * 60.0 / (2.0 * core::f64::consts::PI)
    }
}
