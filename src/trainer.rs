// src/trainer.rs

use log::{debug, info, trace, warn};
use ndarray::{Array1, Array2, Axis, ShapeBuilder};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::linalg_backends::{BackendSVD, LinAlgBackendProvider, SVDOutput};
use crate::linear_machine::LinearMachine;
use crate::sample_store::{ElementType, SampleStore};

/// Trains a [`LinearMachine`] to perform principal component analysis.
///
/// The principal directions come from a singular value decomposition of the
/// centered sample matrix, which avoids forming the covariance matrix and the
/// loss of precision that goes with squaring the data.
///
/// The trainer holds no state besides its configuration; one value can run any
/// number of independent fits, including concurrently on distinct machines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvdPcaTrainer {
    /// Divide every output component by its standard deviation, so that the
    /// projected training data has unit variance per component.
    pub normalize_by_variance: bool,
}

/// A freshly trained machine together with the variance it explains.
#[derive(Clone, Debug, PartialEq)]
pub struct PcaFit {
    pub machine: LinearMachine,
    /// Sample-covariance eigenvalues, one per output of `machine`, in
    /// non-increasing order.
    pub eigenvalues: Array1<f64>,
}

impl SvdPcaTrainer {
    pub fn new(normalize_by_variance: bool) -> Self {
        Self {
            normalize_by_variance,
        }
    }

    /// Fits `machine` to `samples` and returns the eigenvalues of the sample
    /// covariance matrix, in non-increasing order.
    ///
    /// With `F` features per sample and `N` samples, the machine is resized to
    /// `F` inputs and `K = min(F, N)` outputs. Its weight rows are the
    /// orthonormal principal directions, ordered like the eigenvalues; its input
    /// subtraction is the sample mean, its biases are zero, and its division is
    /// one, or the square root of each eigenvalue when `normalize_by_variance`
    /// is set.
    ///
    /// Element type and rank are checked once, from the store's metadata. The
    /// store must hold samples of one shape.
    ///
    /// # Errors
    /// - `Error::TypeMismatch` if the samples are not 64-bit floats.
    /// - `Error::ShapeMismatch` if the samples are not 1-dimensional.
    /// - `Error::EmptyFeatures` if the samples have no elements.
    /// - `Error::InsufficientSamples` if fewer than 2 samples are given.
    /// - `Error::FactorizationFailure` if a sample holds a NaN or infinite
    ///   value, or if the SVD does not converge.
    ///
    /// `machine` is left untouched when any of these is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use svd_pca::{LinearMachine, SvdPcaTrainer};
    ///
    /// let data = array![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]];
    /// let mut machine = LinearMachine::default();
    /// let eigenvalues = SvdPcaTrainer::new(false).fit(&mut machine, &data).unwrap();
    /// assert_eq!(machine.output_size(), 2);
    /// assert!(eigenvalues[0] >= eigenvalues[1]);
    /// ```
    pub fn fit<S>(&self, machine: &mut LinearMachine, samples: &S) -> Result<Array1<f64>>
    where
        S: SampleStore + ?Sized,
    {
        let found_type = samples.element_type();
        if found_type != ElementType::Float64 {
            return Err(Error::TypeMismatch {
                found: found_type,
                expected: ElementType::Float64,
            });
        }
        if samples.ndim() != 1 {
            return Err(Error::ShapeMismatch {
                found: samples.ndim(),
                expected: 1,
            });
        }

        let n_samples = samples.len();
        let n_features = samples.sample_shape()[0];
        if n_features == 0 {
            return Err(Error::EmptyFeatures);
        }
        if n_samples < 2 {
            return Err(Error::InsufficientSamples {
                found: n_samples,
                required: 2,
            });
        }

        info!(
            "Fitting SVD PCA on {} samples with {} features (normalize_by_variance={}).",
            n_samples, n_features, self.normalize_by_variance
        );
        let fit_start_time = Instant::now();

        // One sample per column; column-major so each sample is contiguous.
        let mut data_matrix = Array2::<f64>::zeros((n_features, n_samples).f());
        for (index, column) in data_matrix.axis_iter_mut(Axis(1)).enumerate() {
            samples.read_sample(index, column);
        }
        debug!("Staged {}x{} sample matrix in {:?}", n_features, n_samples, fit_start_time.elapsed());

        if let Some(index) = data_matrix
            .axis_iter(Axis(1))
            .position(|column| column.iter().any(|v| !v.is_finite()))
        {
            return Err(Error::FactorizationFailure(format!(
                "sample {} contains a non-finite value",
                index
            )));
        }

        let mean_vector = data_matrix.mean_axis(Axis(1)).ok_or(Error::InsufficientSamples {
            found: n_samples,
            required: 2,
        })?;
        for mut column in data_matrix.axis_iter_mut(Axis(1)) {
            column -= &mean_vector;
        }

        let n_components = n_features.min(n_samples);
        let factorization_start_time = Instant::now();
        let SVDOutput { u, s: singular_values, .. } = LinAlgBackendProvider::<f64>::new()
            .svd_into(data_matrix, true, false)
            .map_err(|e| Error::FactorizationFailure(e.to_string()))?;
        let principal_axes = u.ok_or_else(|| {
            Error::FactorizationFailure("left singular vectors were not returned".to_string())
        })?;
        debug!("Computed SVD in {:?}", factorization_start_time.elapsed());
        trace!(
            "SVD shapes: U {:?}, singular values {}",
            principal_axes.dim(),
            singular_values.len()
        );
        if principal_axes.dim() != (n_features, n_components) || singular_values.len() != n_components {
            return Err(Error::FactorizationFailure(format!(
                "expected a thin factorization with U of shape {:?} and {} singular values, got {:?} and {}",
                (n_features, n_components),
                n_components,
                principal_axes.dim(),
                singular_values.len()
            )));
        }

        let eigenvalues = singular_values.mapv(|sigma| sigma * sigma / (n_samples - 1) as f64);

        machine.resize(n_features, n_components);
        machine.set_input_subtraction(mean_vector)?;
        machine.set_input_division_scalar(1.0);
        machine.set_biases_scalar(0.0);
        // (F, K) -> (K, F) by swapping strides; no data is moved.
        machine.set_weights(principal_axes.reversed_axes())?;

        if self.normalize_by_variance {
            let zero_variance_components =
                count_zero_variance_components(&eigenvalues, n_features.max(n_samples));
            if zero_variance_components > 0 {
                warn!(
                    "{} of {} principal components have zero variance up to rounding; their normalized outputs are meaningless.",
                    zero_variance_components, n_components
                );
            }
            machine.set_input_division(eigenvalues.mapv(f64::sqrt))?;
        }

        info!(
            "Fitted {} principal components in {:?}",
            n_components,
            fit_start_time.elapsed()
        );
        Ok(eigenvalues)
    }

    /// Same as [`SvdPcaTrainer::fit`], for callers that only need the machine.
    pub fn fit_machine<S>(&self, machine: &mut LinearMachine, samples: &S) -> Result<()>
    where
        S: SampleStore + ?Sized,
    {
        self.fit(machine, samples).map(|_| ())
    }

    /// Fits a new machine to `samples`.
    pub fn fit_new<S>(&self, samples: &S) -> Result<PcaFit>
    where
        S: SampleStore + ?Sized,
    {
        let mut machine = LinearMachine::default();
        let eigenvalues = self.fit(&mut machine, samples)?;
        Ok(PcaFit {
            machine,
            eigenvalues,
        })
    }
}

/// Number of eigenvalues that are zero up to the rounding of an SVD of a
/// matrix whose larger dimension is `max_dim`.
///
/// The cutoff is applied to the singular values, `sigma <= sigma_max * max_dim * eps`,
/// the usual numerical-rank tolerance. Centering `N <= F` samples always leaves
/// at least one such component.
pub(crate) fn count_zero_variance_components(eigenvalues: &Array1<f64>, max_dim: usize) -> usize {
    let largest = eigenvalues.iter().copied().fold(0.0_f64, f64::max);
    let tolerance = largest.sqrt() * max_dim as f64 * f64::EPSILON;
    eigenvalues.iter().filter(|&&v| v.sqrt() <= tolerance).count()
}

/// Fraction of the total variance explained by each component.
///
/// Returns zeros when the total variance is zero.
pub fn explained_variance_ratio(eigenvalues: &Array1<f64>) -> Array1<f64> {
    let total: f64 = eigenvalues.sum();
    if total > 0.0 {
        eigenvalues / total
    } else {
        Array1::zeros(eigenvalues.len())
    }
}
