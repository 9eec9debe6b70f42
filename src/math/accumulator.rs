// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper types to accumulate (sum) a lot of values,
//! typically the normal equations of a Gauss-Newton iteration.

use nalgebra::SVector;

use crate::misc::type_aliases::{Mat6d, Vec6d};

const SYM_MAT_6_THRESHOLD: u32 = 100;

/// The 21 coefficients of the lower triangle of a 6x6 symmetric matrix.
type SymData = SVector<f64, 21>;

/// Symmetric matrix accumulator.
#[derive(Clone)]
pub struct SymMat6 {
    nb_data: u32,
    data: SymData,
    data_hundreds: SymData,
}

impl Default for SymMat6 {
    fn default() -> Self {
        Self::new()
    }
}

impl SymMat6 {
    /// Initialize with zeros.
    #[inline]
    pub fn new() -> Self {
        Self {
            nb_data: 0,
            data: SymData::zeros(),
            data_hundreds: SymData::zeros(),
        }
    }

    /// Add a term w * vv^t to the symmetric matrix accumulator.
    #[inline]
    pub fn add_vec_weighted(&mut self, weight: f64, vec: &Vec6d) {
        let mut vec_data = SymData::zeros();
        let mut index = 0_usize;
        for j in 0..6 {
            let data_j = weight * vec[j];
            for i in j..6 {
                vec_data[index] = data_j * vec[i];
                index += 1;
            }
        }
        if self.nb_data < SYM_MAT_6_THRESHOLD {
            self.nb_data += 1;
            self.data += vec_data;
        } else {
            self.nb_data = 1;
            self.data_hundreds += self.data;
            self.data = vec_data;
        }
    }

    /// Accumulate all values into the field used in the `to_mat` function.
    /// Clear the other fields.
    #[inline]
    pub fn flush(&mut self) {
        if self.nb_data > 0 {
            self.data_hundreds += self.data;
            self.data = SymData::zeros();
            self.nb_data = 0;
        }
    }

    /// Convert the `SymMat6` into a normal matrix `Mat6d`.
    /// Requires the use of `flush()` before.
    #[inline]
    pub fn to_mat(&self) -> Mat6d {
        let mut mat = Mat6d::zeros();
        let mut index = 0_usize;
        for j in 0..6 {
            for i in j..6 {
                let data_ij = self.data_hundreds[index];
                mat[(i, j)] = data_ij;
                mat[(j, i)] = data_ij;
                index += 1;
            }
        }
        mat
    }
}

/// Normal equations `J^t W J delta = - J^t W r` of one Gauss-Newton iteration.
#[derive(Clone, Default)]
pub struct NormalEquations {
    hessian: SymMat6,
    gradient: Vec6d,
    squared_residuals: f64,
    nb_inliers: usize,
}

impl NormalEquations {
    /// Empty system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the contribution of one residual and its jacobian,
    /// weighted by a robust kernel weight.
    #[inline]
    pub fn add(&mut self, jacobian: &Vec6d, residual: f64, weight: f64) {
        self.accumulate(jacobian, residual, weight);
        self.nb_inliers += 1;
    }

    /// Add several residuals stemming from the same correspondence.
    /// They count as a single inlier and their squared values are summed.
    pub fn add_terms(&mut self, terms: &[(Vec6d, f64, f64)]) {
        for (jacobian, residual, weight) in terms {
            self.accumulate(jacobian, *residual, *weight);
        }
        self.nb_inliers += 1;
    }

    #[inline]
    fn accumulate(&mut self, jacobian: &Vec6d, residual: f64, weight: f64) {
        self.hessian.add_vec_weighted(weight, jacobian);
        self.gradient += (weight * residual) * jacobian;
        self.squared_residuals += residual * residual;
    }

    /// Number of residuals accumulated.
    pub fn nb_inliers(&self) -> usize {
        self.nb_inliers
    }

    /// Mean squared residual, 0 if there is no inlier.
    #[allow(clippy::cast_precision_loss)]
    pub fn residual(&self) -> f64 {
        if self.nb_inliers == 0 {
            0.0
        } else {
            self.squared_residuals / self.nb_inliers as f64
        }
    }

    /// Solve the system with a Cholesky decomposition.
    ///
    /// Returns `None` if the system is degenerate:
    /// no inlier, not positive definite, or a non finite solution.
    pub fn solve(&self) -> Option<Vec6d> {
        if self.nb_inliers == 0 {
            return None;
        }
        let mut hessian = self.hessian.clone();
        hessian.flush();
        let cholesky = hessian.to_mat().cholesky()?;
        let delta = cholesky.solve(&(-self.gradient));
        if delta.iter().all(|x| x.is_finite()) {
            Some(delta)
        } else {
            None
        }
    }
}

// TESTS #############################################################
