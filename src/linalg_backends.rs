// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::error::Error;
use std::marker::PhantomData;

/// A provider struct that dispatches to the linear algebra backend selected
/// through compile-time feature flags.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider<F: 'static + Copy + Send + Sync> {
    _phantom: PhantomData<F>,
}

impl<F: 'static + Copy + Send + Sync> LinAlgBackendProvider<F> {
    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

/// Output of a Singular Value Decomposition.
///
/// Singular values are non-negative and sorted in descending order; `u` and
/// `vt` follow the same order.
#[derive(Debug)]
pub struct SVDOutput<F: 'static> {
    pub u: Option<Array2<F>>,
    pub s: Array1<F>,
    pub vt: Option<Array2<F>>,
}

/// Trait for Singular Value Decomposition.
///
/// Backends compute the thin factorization: for an `m x n` input with
/// `k = min(m, n)`, `u` is `m x k`, `s` has `k` entries and `vt` is `k x n`.
pub trait BackendSVD<F: 'static + Copy + Send + Sync> {
    fn svd_into(
        &self,
        matrix: Array2<F>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput<F>, Box<dyn Error + Send + Sync>>;
}

use ndarray_linalg::{JobSvd, SVDDCInto};

/// LAPACK backend through `ndarray-linalg` (divide-and-conquer `gesdd`).
#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

fn to_dyn_error<E: Error + Send + Sync + 'static>(e: E) -> Box<dyn Error + Send + Sync> {
    Box::new(e)
}

impl BackendSVD<f64> for NdarrayLinAlgBackend {
    fn svd_into(
        &self,
        matrix: Array2<f64>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput<f64>, Box<dyn Error + Send + Sync>> {
        // `Some` yields both thin factors; `gesdd` has no job computing only one of them.
        let job = if compute_u || compute_v { JobSvd::Some } else { JobSvd::None };
        let (u, s, vt) = matrix.svddc_into(job).map_err(to_dyn_error)?;
        Ok(SVDOutput {
            u: if compute_u { u } else { None },
            s,
            vt: if compute_v { vt } else { None },
        })
    }
}

#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendSVD, SVDOutput};
    use faer::linalg::solvers::Svd as FaerSolverSvd;
    use faer::{ColRef, MatRef};
    use ndarray::{Array1, Array2, ShapeBuilder};
    use std::error::Error;

    fn to_dyn_error_faer(msg: String) -> Box<dyn Error + Send + Sync> {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    fn faer_mat_to_ndarray(faer_mat: MatRef<'_, f64>) -> Array2<f64> {
        let (nrows, ncols) = (faer_mat.nrows(), faer_mat.ncols());
        Array2::from_shape_fn((nrows, ncols).f(), |(i, j)| faer_mat[(i, j)])
    }

    fn faer_col_to_ndarray_vec(faer_col: ColRef<'_, f64>) -> Array1<f64> {
        Array1::from_shape_fn(faer_col.nrows(), |i| faer_col[i])
    }

    impl BackendSVD<f64> for FaerLinAlgBackend {
        fn svd_into(
            &self,
            matrix: Array2<f64>,
            compute_u: bool,
            compute_v: bool,
        ) -> Result<SVDOutput<f64>, Box<dyn Error + Send + Sync>> {
            let (nrows, ncols) = matrix.dim();
            if matrix.is_empty() {
                let k_dim = nrows.min(ncols);
                return Ok(SVDOutput {
                    u: if compute_u { Some(Array2::zeros((nrows, k_dim))) } else { None },
                    s: Array1::zeros(k_dim),
                    vt: if compute_v { Some(Array2::zeros((k_dim, ncols))) } else { None },
                });
            }

            // faer views need contiguous storage in either memory order.
            let matrix = if matrix.is_standard_layout() || matrix.t().is_standard_layout() {
                matrix
            } else {
                matrix.as_standard_layout().into_owned()
            };
            let slice = matrix.as_slice_memory_order().ok_or_else(|| {
                to_dyn_error_faer(format!(
                    "Input ndarray matrix ({}x{}) is not contiguous after relayout",
                    nrows, ncols
                ))
            })?;
            let faer_mat_view = if matrix.is_standard_layout() {
                MatRef::from_row_major_slice(slice, nrows, ncols)
            } else {
                MatRef::from_column_major_slice(slice, nrows, ncols)
            };

            let svd_solver_instance = FaerSolverSvd::new_thin(faer_mat_view)
                .map_err(|e| to_dyn_error_faer(format!("Faer SVD computation failed: {:?}", e)))?;

            let s_ndarray = faer_col_to_ndarray_vec(svd_solver_instance.S().column_vector());

            let u_ndarray = if compute_u {
                Some(faer_mat_to_ndarray(svd_solver_instance.U()))
            } else {
                None
            };

            let vt_ndarray = if compute_v {
                Some(faer_mat_to_ndarray(svd_solver_instance.V()).reversed_axes())
            } else {
                None
            };

            Ok(SVDOutput { u: u_ndarray, s: s_ndarray, vt: vt_ndarray })
        }
    }
}

#[cfg(not(feature = "backend_faer"))]
impl BackendSVD<f64> for LinAlgBackendProvider<f64> {
    fn svd_into(
        &self,
        matrix: Array2<f64>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput<f64>, Box<dyn Error + Send + Sync>> {
        NdarrayLinAlgBackend.svd_into(matrix, compute_u, compute_v)
    }
}

#[cfg(feature = "backend_faer")]
impl BackendSVD<f64> for LinAlgBackendProvider<f64> {
    fn svd_into(
        &self,
        matrix: Array2<f64>,
        compute_u: bool,
        compute_v: bool,
    ) -> Result<SVDOutput<f64>, Box<dyn Error + Send + Sync>> {
        faer_specific_code::FaerLinAlgBackend.svd_into(matrix, compute_u, compute_v)
    }
}
