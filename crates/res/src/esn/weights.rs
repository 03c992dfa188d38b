use crate::{
    error::{EsnError, Result},
    esn::EsnParameters,
};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, StandardNormal};
use tracing::{debug, warn};

// Draws after which a vanishing spectral radius is reported instead of retried.
pub const MAX_DRAWS: usize = 16;
// Spectral radius below this fraction of the Frobenius norm counts as zero. Nilpotent draws
// come out of the Schur decomposition as rounding noise rather than exact zeros.
pub const DEGENERATE_TOLERANCE: f64 = 1e-6;
// Realised non-zero fraction under which the matrix is kept in CSR form.
pub const SPARSE_THRESHOLD: f64 = 0.25;

/// Frozen reservoir transition matrix. The storage is an optimization only, both variants
/// multiply like the same dense matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum Weights {
    Dense(DMatrix<f64>),
    Sparse(CsrMatrix<f64>),
}

impl Weights {
    /// Picks the storage from the realised density of `matrix`.
    pub fn from_dense(matrix: DMatrix<f64>) -> Self {
        let nnz = matrix.iter().filter(|w| **w != 0.).count();
        let total = matrix.nrows() * matrix.ncols();
        if total > 0 && (nnz as f64) < SPARSE_THRESHOLD * total as f64 {
            Self::Sparse(to_csr(&matrix))
        } else {
            Self::Dense(matrix)
        }
    }

    pub fn dense_from_row_major(n: usize, values: &[f64]) -> Result<Self> {
        if values.len() != n * n {
            return Err(EsnError::DimensionMismatch {
                what: "dense weights",
                expected: n * n,
                actual: values.len(),
            });
        }
        Ok(Self::Dense(DMatrix::from_row_slice(n, n, values)))
    }

    pub fn sparse_from_parts(
        n: usize,
        row_offsets: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        CsrMatrix::try_from_csr_data(n, n, row_offsets, col_indices, values)
            .map(Self::Sparse)
            .map_err(|e| EsnError::InvalidWeights(e.to_string()))
    }

    /// Side length of the (square) matrix.
    pub fn dim(&self) -> usize {
        match self {
            Self::Dense(m) => m.nrows(),
            Self::Sparse(m) => m.nrows(),
        }
    }

    pub fn is_square(&self) -> bool {
        match self {
            Self::Dense(m) => m.is_square(),
            Self::Sparse(m) => m.nrows() == m.ncols(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    pub fn nnz(&self) -> usize {
        match self {
            Self::Dense(m) => m.iter().filter(|w| **w != 0.).count(),
            Self::Sparse(m) => m.triplet_iter().filter(|(_, _, w)| **w != 0.).count(),
        }
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            Self::Dense(m) => m.clone(),
            Self::Sparse(m) => {
                let mut dense = DMatrix::zeros(m.nrows(), m.ncols());
                for (i, j, w) in m.triplet_iter() {
                    dense[(i, j)] = *w;
                }
                dense
            }
        }
    }

    /// Row vector times matrix: `y[j] = sum_i x[i] * w[i][j]`.
    pub fn row_mul(&self, x: &DVector<f64>) -> DVector<f64> {
        match self {
            Self::Dense(m) => m.tr_mul(x),
            Self::Sparse(m) => {
                let mut y = DVector::zeros(m.ncols());
                for (i, row) in m.row_iter().enumerate() {
                    let xi = x[i];
                    for (j, w) in row.col_indices().iter().zip(row.values()) {
                        y[*j] += xi * w;
                    }
                }
                y
            }
        }
    }

    pub fn spectral_radius(&self) -> f64 {
        spectral_radius(&self.to_dense()).unwrap_or(f64::NAN)
    }
}

fn to_csr(matrix: &DMatrix<f64>) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(matrix.nrows(), matrix.ncols());
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            let w = matrix[(i, j)];
            if w != 0. {
                coo.push(i, j, w);
            }
        }
    }
    CsrMatrix::from(&coo)
}

// Largest eigenvalue magnitude, `None` when the Schur iteration does not converge.
fn spectral_radius(matrix: &DMatrix<f64>) -> Option<f64> {
    let schur = matrix.clone().try_schur(f64::EPSILON, 10_000)?;
    let radius = schur
        .complex_eigenvalues()
        .iter()
        .map(|lambda| lambda.norm())
        .fold(0., f64::max);
    Some(radius)
}

fn sparse_gaussian<R: Rng + ?Sized>(n: usize, mask: &Bernoulli, rng: &mut R) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |_, _| {
        if mask.sample(&mut *rng) {
            StandardNormal.sample(&mut *rng)
        } else {
            0.0
        }
    })
}

/// Draws a Bernoulli-masked gaussian matrix and rescales it to the configured spectral radius.
/// Draws whose spectral radius vanishes are discarded; after `MAX_DRAWS` of them construction
/// fails with `DegenerateMatrix`.
pub fn internal_weights<R: Rng + ?Sized>(params: &EsnParameters, rng: &mut R) -> Result<Weights> {
    params.validate()?;
    let n = params.weight_dim();
    let mask = Bernoulli::new(params.density).map_err(|e| EsnError::Config(e.to_string()))?;

    for attempt in 1..=MAX_DRAWS {
        let mut weights = sparse_gaussian(n, &mask, rng);
        let norm = weights.norm();
        let radius = spectral_radius(&weights).unwrap_or(0.);
        if norm == 0. || !radius.is_finite() || radius <= DEGENERATE_TOLERANCE * norm {
            warn!(attempt, n, density = params.density, "degenerate reservoir draw, redrawing");
            continue;
        }

        weights *= params.spectral_radius / radius;
        let weights = Weights::from_dense(weights);
        debug!(
            n,
            attempt,
            unscaled_radius = radius,
            nnz = weights.nnz(),
            sparse = weights.is_sparse(),
            "drew reservoir weights"
        );
        return Ok(weights);
    }

    Err(EsnError::DegenerateMatrix {
        attempts: MAX_DRAWS,
    })
}

#[cfg(test)]
mod test {
    use super::{Weights, internal_weights};
    use crate::{EsnError, EsnParameters};
    use nalgebra::{DMatrix, DVector, dmatrix, dvector};
    use rand::{SeedableRng, rngs::StdRng};

    fn assert_radius(weights: &Weights, target: f64) {
        let radius = weights.spectral_radius();
        assert!(
            ((radius - target) / target).abs() < 1e-6,
            "radius {radius} != {target}"
        );
    }

    #[test]
    fn scales_to_target_spectral_radius() {
        let mut rng = StdRng::seed_from_u64(7);
        for (size, density, radius, bias) in [
            (50, 0.5, 0.9, false),
            (50, 0.1, 1.25, true),
            (8, 1.0, 0.5, true),
        ] {
            let params = EsnParameters::new(size)
                .with_density(density)
                .with_spectral_radius(radius)
                .with_bias(bias);
            let weights = internal_weights(&params, &mut rng).unwrap();
            assert_eq!(weights.dim(), params.weight_dim());
            assert_radius(&weights, radius);
        }
    }

    #[test]
    fn zero_fraction_tracks_density() {
        let mut rng = StdRng::seed_from_u64(11);
        let params = EsnParameters::new(150).with_density(0.1).with_bias(false);
        let weights = internal_weights(&params, &mut rng).unwrap();
        let total = (150 * 150) as f64;
        let zero_fraction = 1. - weights.nnz() as f64 / total;
        assert!((zero_fraction - 0.9).abs() < 0.02, "{zero_fraction}");
        assert!(weights.is_sparse());
    }

    #[test]
    fn full_density_is_stored_dense() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = EsnParameters::new(10).with_density(1.0);
        let weights = internal_weights(&params, &mut rng).unwrap();
        assert!(!weights.is_sparse());
    }

    #[test]
    fn sparse_and_dense_multiply_alike() {
        let dense = dmatrix![
            0.0, 2.0, 0.0, 0.0;
            0.0, 0.0, 0.0, -1.5;
            3.0, 0.0, 0.0, 0.0;
            0.0, 0.0, 0.5, 0.0
        ];
        let sparse = Weights::from_dense(dense.clone());
        assert!(!sparse.is_sparse());
        let sparse = Weights::Sparse(super::to_csr(&dense));
        let x = dvector![1.0, -2.0, 0.25, 4.0];
        let expected = Weights::Dense(dense.clone()).row_mul(&x);
        assert_eq!(expected, dvector![0.75, 2.0, 2.0, 3.0]);
        assert_eq!(sparse.row_mul(&x), expected);
        assert_eq!(sparse.to_dense(), dense);
    }

    #[test]
    fn row_vector_convention() {
        let weights = Weights::Dense(dmatrix![1.0, 2.0; 3.0, 4.0]);
        assert_eq!(weights.row_mul(&dvector![1.0, 1.0]), dvector![4.0, 6.0]);
    }

    #[test]
    fn nilpotent_draws_are_degenerate() {
        // A single unit can only ever draw a zero or a scalar; force zeros through the mask.
        let mut rng = StdRng::seed_from_u64(0);
        let params = EsnParameters::new(1).with_bias(false).with_density(1e-9);
        let res = internal_weights(&params, &mut rng);
        assert_eq!(res, Err(EsnError::DegenerateMatrix { attempts: 16 }));
    }

    #[test]
    fn parts_are_validated() {
        assert!(Weights::dense_from_row_major(2, &[1.0, 2.0, 3.0]).is_err());
        assert!(Weights::sparse_from_parts(2, vec![0, 1], vec![0], vec![1.0]).is_err());
        let weights = Weights::sparse_from_parts(2, vec![0, 1, 2], vec![1, 0], vec![1.0, 2.0])
            .unwrap();
        assert_eq!(weights.to_dense(), DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 0.0]));
        assert_eq!(weights.row_mul(&DVector::from_element(2, 1.0)), dvector![2.0, 1.0]);
    }
}
