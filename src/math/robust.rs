// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Robust kernels turning the least squares problem into
//! an iteratively reweighted least squares (IRLS) one.
//!
//! For a loss `p(r)`, the weight of a residual is `w(r) = p'(r) / r`.
//! Notations follow "Analysis of Robust Functions for Registration Algorithms",
//! Babin et al.

use serde::{Deserialize, Serialize};

/// Residuals below this magnitude are considered zero by the L1 kernel.
const L1_EPSILON: f64 = 1e-8;

/// Loss function used to weight each residual.
/// The parameter of each variant is its scaling parameter `k`.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub enum RobustKernel {
    /// `p(r) = r^2 / 2`.
    L2,
    /// `p(r) = |r|`.
    L1,
    /// Quadratic below `k`, linear above.
    Huber(f64),
    /// `p(r) = (k^2 / 2) log(1 + (r / k)^2)`.
    Cauchy(f64),
    /// Geman-McClure: `p(r) = (r^2 / 2) / (1 + (r / k)^2)`.
    GemanMcClure(f64),
    /// Completely suppresses residuals above `k`.
    Tukey(f64),
}

impl Default for RobustKernel {
    fn default() -> Self {
        RobustKernel::L2
    }
}

impl RobustKernel {
    /// IRLS weight of a residual.
    pub fn weight(&self, residual: f64) -> f64 {
        let r_abs = residual.abs();
        match *self {
            RobustKernel::L2 => 1.0,
            RobustKernel::L1 => 1.0 / r_abs.max(L1_EPSILON),
            RobustKernel::Huber(k) => {
                if r_abs <= k {
                    1.0
                } else {
                    k / r_abs
                }
            }
            RobustKernel::Cauchy(k) => 1.0 / (1.0 + (residual / k).powi(2)),
            RobustKernel::GemanMcClure(k) => k / (k + residual * residual).powi(2),
            RobustKernel::Tukey(k) => {
                if r_abs <= k {
                    (1.0 - (residual / k).powi(2)).powi(2)
                } else {
                    0.0
                }
            }
        }
    }

    /// Scaling parameter of the kernel, if any.
    pub fn scale(&self) -> Option<f64> {
        match *self {
            RobustKernel::L2 | RobustKernel::L1 => None,
            RobustKernel::Huber(k)
            | RobustKernel::Cauchy(k)
            | RobustKernel::GemanMcClure(k)
            | RobustKernel::Tukey(k) => Some(k),
        }
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;
    use quickcheck_macros;

    #[test]
    fn huber_is_l2_below_threshold() {
        let huber = RobustKernel::Huber(0.5);
        assert_eq!(1.0, huber.weight(0.3));
        assert_eq!(1.0, huber.weight(-0.5));
        approx::assert_relative_eq!(0.5, huber.weight(-1.0));
    }

    #[test]
    fn tukey_rejects_outliers() {
        let tukey = RobustKernel::Tukey(0.1);
        assert_eq!(0.0, tukey.weight(0.2));
        assert_eq!(1.0, tukey.weight(0.0));
    }

    #[test]
    fn l1_at_zero_is_finite() {
        assert!(RobustKernel::L1.weight(0.0).is_finite());
    }

    #[test]
    fn cauchy_halves_at_scale() {
        approx::assert_relative_eq!(0.5, RobustKernel::Cauchy(2.0).weight(2.0));
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn weights_are_in_unit_range(r: i16, k: u8) -> bool {
        let residual = f64::from(r) / 1000.0;
        let k = 0.01 + f64::from(k) / 100.0;
        [
            RobustKernel::L2,
            RobustKernel::Huber(k),
            RobustKernel::Cauchy(k),
            RobustKernel::Tukey(k),
        ]
        .iter()
        .all(|kernel| {
            let w = kernel.weight(residual);
            w >= 0.0 && w <= 1.0
        })
    }

    #[quickcheck_macros::quickcheck]
    fn weights_are_symmetric(r: i16, k: u8) -> bool {
        let residual = f64::from(r) / 1000.0;
        let k = 0.01 + f64::from(k) / 100.0;
        [
            RobustKernel::L1,
            RobustKernel::Huber(k),
            RobustKernel::Cauchy(k),
            RobustKernel::GemanMcClure(k),
            RobustKernel::Tukey(k),
        ]
        .iter()
        .all(|kernel| kernel.weight(residual) == kernel.weight(-residual))
    }
}
