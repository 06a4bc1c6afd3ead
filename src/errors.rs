use alloc::string::String;

/// Errors returned by the credential operations.
///
/// A proof that simply fails to verify is not an error: verification returns `Ok(false)`.
#[derive(displaydoc::Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Predicate is not satisfied: {0}
    PredicateNotSatisfied(String),
    /// Could not find a prime after {0} trials
    PrimeSearchExhausted(usize),
    /// Could not decompose {0} into four squares
    FourSquaresFailed(String),
    /// The accumulator is full
    AccumulatorFull,
    /// Cannot update the witness: the credential at index {0} is revoked
    Revoked(u32),
    /// Issuer is sending incorrect data: {0}
    IncorrectIssuerData(String),
    /// Invalid input: {0}
    InvalidInput(String),
    /// Not found: {0}
    NotFound(String),
    /// A mutex lock was poisoned
    MutexPoisoned,
    /// Serialization error: {0}
    Serialization(String),
}

impl std::error::Error for Error {}
