//! Shared fixtures for tests. Safe prime generation is slow, so keys are made once per test binary.

use std::sync::OnceLock;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{dev::TestParams, primary::PrimarySecretKey};

static SECRET_KEYS: [OnceLock<PrimarySecretKey>; 2] = [OnceLock::new(), OnceLock::new()];

/// Returns one of two fixed, reproducible test secret keys.
pub(crate) fn test_secret_key(index: usize) -> PrimarySecretKey {
    let cell = SECRET_KEYS.get(index).expect("only two test keys are available");
    cell.get_or_init(|| {
        let mut rng = ChaCha8Rng::seed_from_u64(1000 + index as u64);
        PrimarySecretKey::random::<TestParams>(&mut rng)
    })
    .clone()
}
