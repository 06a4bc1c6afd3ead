//! Insecure parameters for tests and development.

use crate::params::SchemeParams;

/// Parameters with 256-bit safe primes. Fast, but offer no security.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestParams;

impl SchemeParams for TestParams {
    const PRIME_BITS: u32 = 256;
}

/// The pairing used in tests.
pub use ark_bls12_381::Bls12_381;
