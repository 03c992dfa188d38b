use crate::nd_json::element_count;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};

/// Maps an opaque key and a requested shape onto flat indices of the reservoir state.
/// Implementations must be pure and return `product(shape)` indices below `state_size`.
pub trait IndexMapping: Send + Sync {
    fn map_indices(&self, key: &str, shape: &[usize], state_size: usize) -> Vec<usize>;
}

// Seeds a generator with the blake3 digest of the key, so a key always lands on the same units.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyedMapping;

impl IndexMapping for KeyedMapping {
    fn map_indices(&self, key: &str, shape: &[usize], state_size: usize) -> Vec<usize> {
        let count = match element_count(shape) {
            Ok(count) if count > 0 && state_size > 0 => count,
            _ => return vec![],
        };
        let mut rng = StdRng::from_seed(*blake3::hash(key.as_bytes()).as_bytes());
        if count <= state_size {
            index::sample(&mut rng, state_size, count).into_vec()
        } else {
            (0..count).map(|_| rng.gen_range(0..state_size)).collect()
        }
    }
}

pub fn gather(state: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|i| state[*i]).collect()
}

// Adds rather than overwrites. An index listed twice receives both values, unlike buffered
// fancy-index assignment (`state[idx] += values`), where only one of them would land.
pub fn scatter_add(state: &mut [f64], indices: &[usize], values: &[f64]) {
    for (i, v) in indices.iter().zip(values) {
        state[*i] += v;
    }
}
