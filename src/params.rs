use core::fmt::Debug;

/// Bit size of the master secret and of every encoded attribute.
pub(crate) const LARGE_MASTER_SECRET: u32 = 256;
/// The signing exponent `e` is drawn from `[2^LARGE_E_START, 2^LARGE_E_START + 2^LARGE_E_END_RANGE)`.
pub(crate) const LARGE_E_START: u32 = 596;
pub(crate) const LARGE_E_END_RANGE: u32 = 119;
/// Holder-side blinding factor `v'`.
pub(crate) const LARGE_VPRIME: u32 = 2128;
/// Issuer-side blinding factor `v''`.
pub(crate) const LARGE_VPRIME_PRIME: u32 = 2592;
pub(crate) const LARGE_MTILDE: u32 = 593;
pub(crate) const LARGE_ETILDE: u32 = 456;
pub(crate) const LARGE_VTILDE: u32 = 3060;
pub(crate) const LARGE_UTILDE: u32 = 592;
pub(crate) const LARGE_RTILDE: u32 = 672;
pub(crate) const LARGE_ALPHATILDE: u32 = 2787;
pub(crate) const LARGE_NONCE: u32 = 80;
/// Size of the Fiat-Shamir challenge.
pub(crate) const CHALLENGE_BITS: u32 = 256;

/// Upper bound on the number of candidates tested while searching for the prime `e`.
pub(crate) const PRIME_SEARCH_TRIALS: usize = 100_000;
/// Upper bound on the number of random attempts of the four-square decomposition.
pub(crate) const FOUR_SQUARES_TRIALS: usize = 10_000;

/// Sizing of the RSA group used for the primary (CL) credentials.
pub trait SchemeParams: 'static + Debug + Clone + Copy + Send + Sync {
    /// The size of each of the two safe primes.
    const PRIME_BITS: u32;

    /// The size of the modulus `N`.
    const MODULUS_BITS: u32 = Self::PRIME_BITS * 2;
}

/// Parameters with 1024-bit safe primes (2048-bit modulus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionParams;

impl SchemeParams for ProductionParams {
    const PRIME_BITS: u32 = 1024;
}
