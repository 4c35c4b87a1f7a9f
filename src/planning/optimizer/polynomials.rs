//! Boundary-value polynomials for 1D motion profiles

use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

/// Polynomial in t with coefficients stored lowest order first
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    /// Quintic fixing position, velocity and acceleration at t = 0 and t = `time`
    pub fn quintic(start: [f64; 3], end: [f64; 3], time: f64) -> Self {
        let [x0, v0, a0] = start;
        let [xe, ve, ae] = end;
        let (t2, t3, t4, t5) = (time.powi(2), time.powi(3), time.powi(4), time.powi(5));

        #[rustfmt::skip]
        let lhs = Matrix3::new(
            t3, t4, t5,
            3.0 * t2, 4.0 * t3, 5.0 * t4,
            6.0 * time, 12.0 * t2, 20.0 * t3,
        );
        let rhs = Vector3::new(
            xe - x0 - v0 * time - 0.5 * a0 * t2,
            ve - v0 - a0 * time,
            ae - a0,
        );
        let upper = lhs.lu().solve(&rhs).unwrap_or_else(Vector3::zeros);

        Self {
            coeffs: vec![x0, v0, 0.5 * a0, upper[0], upper[1], upper[2]],
        }
    }

    /// Quartic fixing the start state and the end velocity and acceleration,
    /// leaving the end position free
    pub fn quartic(start: [f64; 3], end_rate: [f64; 2], time: f64) -> Self {
        let [x0, v0, a0] = start;
        let [ve, ae] = end_rate;
        let (t2, t3) = (time.powi(2), time.powi(3));

        #[rustfmt::skip]
        let lhs = Matrix2::new(
            3.0 * t2, 4.0 * t3,
            6.0 * time, 12.0 * t2,
        );
        let rhs = Vector2::new(ve - v0 - a0 * time, ae - a0);
        let upper = lhs.lu().solve(&rhs).unwrap_or_else(Vector2::zeros);

        Self {
            coeffs: vec![x0, v0, 0.5 * a0, upper[0], upper[1]],
        }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// `order`-th derivative at t, Horner's scheme over the falling-factorial
    /// scaled coefficients
    pub fn derivative(&self, order: usize, t: f64) -> f64 {
        self.coeffs
            .iter()
            .enumerate()
            .skip(order)
            .rev()
            .fold(0.0, |acc, (k, c)| {
                let scale: f64 = (k - order + 1..=k).map(|m| m as f64).product();
                acc * t + scale * c
            })
    }

    pub fn calc_point(&self, t: f64) -> f64 {
        self.derivative(0, t)
    }

    pub fn calc_first_derivative(&self, t: f64) -> f64 {
        self.derivative(1, t)
    }

    pub fn calc_second_derivative(&self, t: f64) -> f64 {
        self.derivative(2, t)
    }

    pub fn calc_third_derivative(&self, t: f64) -> f64 {
        self.derivative(3, t)
    }
}
