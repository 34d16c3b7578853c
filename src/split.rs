//! Train/test partitioning of the repository corpus.

use rand::seq::SliceRandom;

use crate::cluster::util::rng_from_seed;
use crate::error::{Error, Result};
use crate::repo::Repository;

/// A partition of the corpus into a training and a held-out set.
#[derive(Debug, Clone, Default)]
pub struct Split {
    pub train: Vec<Repository>,
    pub test: Vec<Repository>,
}

/// Shuffle `repos` and hold out `ceil(test_fraction * n)` of them.
///
/// `test_fraction` must lie in `[0, 1)`. Zero keeps every repository for
/// training, in input order. The training side must not end up empty.
pub fn train_test_split(
    repos: &[Repository],
    test_fraction: f64,
    seed: Option<u64>,
) -> Result<Split> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(Error::InvalidParameter {
            name: "test_split_fraction",
            message: "must be in [0, 1)",
        });
    }
    if repos.is_empty() {
        return Err(Error::EmptyInput);
    }
    if test_fraction == 0.0 {
        return Ok(Split {
            train: repos.to_vec(),
            test: Vec::new(),
        });
    }

    let n = repos.len();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test >= n {
        return Err(Error::InvalidParameter {
            name: "test_split_fraction",
            message: "leaves no repositories for training",
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = rng_from_seed(seed);
    order.shuffle(&mut *rng);

    let (test, train) = order.split_at(n_test);
    Ok(Split {
        train: train.iter().map(|&i| repos[i].clone()).collect(),
        test: test.iter().map(|&i| repos[i].clone()).collect(),
    })
}
