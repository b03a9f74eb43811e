use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashSet;

/// Train/test partition of case keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Split {
    pub train: Vec<String>,
    pub test: Vec<String>,
}

/// Which side of the split a case landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Test,
}

impl Split {
    pub fn partition_of(&self, key: &str) -> Option<Partition> {
        if self.train.iter().any(|k| k == key) {
            Some(Partition::Train)
        } else if self.test.iter().any(|k| k == key) {
            Some(Partition::Test)
        } else {
            None
        }
    }

    /// Drops keys that did not make it into the dataset, keeping the order
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.train.retain(|k| keep(k));
        self.test.retain(|k| keep(k));
    }
}

/// Splits `keys` into train and test with a seeded shuffle
///
/// A copy of the key list is shuffled with ChaCha8 seeded by `seed`; the first
/// `round(n * ratio)` shuffled keys form the training set. Both partitions keep
/// the order of `keys`, so the same keys, ratio and seed always give the same
/// split on any platform.
pub fn split_cases(keys: &[String], ratio: f64, seed: u64) -> Split {
    let n = keys.len();
    let n_train = ((n as f64) * ratio.clamp(0.0, 1.0)).round() as usize;

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let train_idx: HashSet<usize> = order.into_iter().take(n_train.min(n)).collect();

    let mut split = Split::default();
    for (i, key) in keys.iter().enumerate() {
        if train_idx.contains(&i) {
            split.train.push(key.clone());
        } else {
            split.test.push(key.clone());
        }
    }
    split
}
