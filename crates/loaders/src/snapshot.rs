//! Versioned on-disk schema of a reservoir.
//!
//! Every field is spelled out so a snapshot never depends on the in-memory layout of
//! `Esn`. Optional fields (`norm_rate`, `mean`, `deviation`) are left out of the document
//! when absent and default to `None` when reading, which keeps snapshots written before
//! streaming normalization existed loadable. Float vectors go through `float_json`, so a
//! diverged state with infinities or NaN still round-trips.

use crate::float_json;
use nalgebra::DVector;
use res::{Activation, Esn, EsnError, EsnParameters, Weights};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "storage", rename_all = "lowercase")]
pub enum WeightsRecord {
    Dense {
        n: usize,
        // row-major
        #[serde(with = "float_json::vec")]
        values: Vec<f64>,
    },
    Sparse {
        n: usize,
        row_offsets: Vec<usize>,
        col_indices: Vec<usize>,
        #[serde(with = "float_json::vec")]
        values: Vec<f64>,
    },
}

impl From<&Weights> for WeightsRecord {
    fn from(weights: &Weights) -> Self {
        match weights {
            Weights::Dense(m) => Self::Dense {
                n: m.nrows(),
                values: m.transpose().as_slice().to_vec(),
            },
            Weights::Sparse(m) => Self::Sparse {
                n: m.nrows(),
                row_offsets: m.row_offsets().to_vec(),
                col_indices: m.col_indices().to_vec(),
                values: m.values().to_vec(),
            },
        }
    }
}

impl TryFrom<WeightsRecord> for Weights {
    type Error = EsnError;

    fn try_from(record: WeightsRecord) -> Result<Self, Self::Error> {
        match record {
            WeightsRecord::Dense { n, values } => Weights::dense_from_row_major(n, &values),
            WeightsRecord::Sparse {
                n,
                row_offsets,
                col_indices,
                values,
            } => Weights::sparse_from_parts(n, row_offsets, col_indices, values),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub size: usize,
    pub density: f64,
    pub spectral_radius: f64,
    pub bias: bool,
    pub activation: Activation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm_rate: Option<f64>,
    pub weights: WeightsRecord,
    #[serde(with = "float_json::vec")]
    pub state: Vec<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "float_json::option_vec"
    )]
    pub mean: Option<Vec<f64>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "float_json::option_vec"
    )]
    pub deviation: Option<Vec<f64>>,
}

impl Snapshot {
    /// Copies everything needed to rebuild `esn`. Encoding and writing can then happen
    /// without access to the reservoir.
    pub fn capture(esn: &Esn) -> Self {
        let EsnParameters {
            size,
            density,
            spectral_radius,
            bias,
            activation,
            norm_rate,
        } = *esn.params();
        let normalizer = esn.normalizer();
        Self {
            version: SNAPSHOT_VERSION,
            size,
            density,
            spectral_radius,
            bias,
            activation,
            norm_rate,
            weights: esn.weights().into(),
            state: esn.state().as_slice().to_vec(),
            mean: normalizer.map(|n| n.mean().as_slice().to_vec()),
            deviation: normalizer.map(|n| n.deviation().as_slice().to_vec()),
        }
    }

    pub fn params(&self) -> EsnParameters {
        EsnParameters {
            size: self.size,
            density: self.density,
            spectral_radius: self.spectral_radius,
            bias: self.bias,
            activation: self.activation,
            norm_rate: self.norm_rate,
        }
    }

    /// Rebuilds the reservoir. The hyperparameters go through the usual validation, weights,
    /// state and statistics are taken verbatim.
    pub fn restore(self) -> Result<Esn, EsnError> {
        let params = self.params();
        let weights = Weights::try_from(self.weights)?;
        let statistics = match (self.mean, self.deviation) {
            (Some(mean), Some(deviation)) => {
                Some((DVector::from_vec(mean), DVector::from_vec(deviation)))
            }
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                return Err(EsnError::DimensionMismatch {
                    what: "running statistics",
                    expected: self.size,
                    actual: 0,
                });
            }
        };
        Esn::from_parts(params, weights, DVector::from_vec(self.state), statistics)
    }
}

#[cfg(test)]
mod test {
    use super::{Snapshot, WeightsRecord};
    use nalgebra::{DMatrix, dmatrix, dvector};
    use res::{Activation, Esn, EsnParameters, Weights};

    fn small_esn(norm_rate: Option<f64>) -> Esn {
        let params = EsnParameters::new(2)
            .with_bias(false)
            .with_density(1.)
            .with_activation(Activation::Sigmoid)
            .with_norm_rate(norm_rate);
        Esn::from_parts(
            params,
            Weights::Dense(dmatrix![1., 2.; 3., 4.]),
            dvector![0.5, -0.25],
            None,
        )
        .unwrap()
    }

    #[test]
    fn dense_weights_are_row_major() {
        let record = WeightsRecord::from(&Weights::Dense(dmatrix![1., 2.; 3., 4.]));
        assert_eq!(
            record,
            WeightsRecord::Dense {
                n: 2,
                values: vec![1., 2., 3., 4.]
            }
        );
    }

    #[test]
    fn capture_omits_statistics_without_normalization() {
        let snapshot = Snapshot::capture(&small_esn(None));
        assert_eq!(snapshot.mean, None);
        assert_eq!(snapshot.deviation, None);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("mean").is_none());
        assert!(json.get("norm_rate").is_none());
        assert_eq!(json["activation"], "sigmoid");
        assert_eq!(json["weights"]["storage"], "dense");
    }

    #[test]
    fn restore_defaults_missing_statistics() {
        let mut snapshot = Snapshot::capture(&small_esn(Some(0.2)));
        snapshot.mean = None;
        snapshot.deviation = None;
        let esn = snapshot.restore().unwrap();
        let normalizer = esn.normalizer().unwrap();
        assert_eq!(normalizer.mean(), &dvector![0., 0.]);
        assert_eq!(normalizer.deviation(), &dvector![1., 1.]);
    }

    #[test]
    fn restore_rejects_half_statistics() {
        let mut snapshot = Snapshot::capture(&small_esn(Some(0.2)));
        snapshot.deviation = None;
        assert!(snapshot.restore().is_err());
    }

    #[test]
    fn sparse_record_round_trips() {
        let mut dense = DMatrix::zeros(6, 6);
        dense[(0, 5)] = 1.5;
        dense[(3, 1)] = -2.0;
        let weights = Weights::from_dense(dense);
        assert!(weights.is_sparse());
        let record = WeightsRecord::from(&weights);
        assert!(matches!(record, WeightsRecord::Sparse { n: 6, .. }));
        assert_eq!(Weights::try_from(record).unwrap(), weights);
    }
}
