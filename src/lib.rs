#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(
    clippy::mod_module_files,
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_qualifications
)]
#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::indexing_slicing))]

/*!
## Features

`dev`: Non-secure development parameters (small safe primes) and the BLS12-381 pairing back end.
See the [`dev`] module.
*/

extern crate alloc;

mod attributes;
mod entities;
mod errors;
mod params;
mod primary;
mod proof;
mod revocation;
mod storage;
mod tools;
mod uint;

#[cfg(any(test, feature = "dev"))]
pub mod dev;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod tests;

pub use attributes::{AttributeKind, AttributeValues, Predicate, PredicateType, RawAttributes, Schema, SchemaId};
pub use entities::{
    Claim, ClaimBlinding, ClaimRequest, CredentialDefinition, Issuer, Prover, RevocationDefinition, Verifier,
};
pub use errors::Error;
pub use params::{ProductionParams, SchemeParams};
pub use primary::{
    context_attribute, EqProof, GeProof, MasterSecret, PrimaryBlinding, PrimaryClaim, PrimaryClaimRequest,
    PrimaryPublicKey, PrimarySecretKey,
};
pub use proof::{
    AggregatedProof, CredentialProof, CredentialPublicData, FullProof, Nonce, ProofBuilder, ProofRequest,
    ProofVerifier, ProverCredential, ProverRevocation, RevocationPublicData, SubProofRequest,
};
pub use revocation::{
    Accumulator, AccumulatorPublicKey, AccumulatorSecretKey, NonRevocProof, NonRevocationClaim, RevocationBlinding,
    RevocationClaimRequest, RevocationPublicKey, RevocationSecretKey, SharedAccumulator, Tails, Witness,
};
pub use storage::{
    AttributeStore, InMemoryAttributeStore, InMemoryKeyStore, InMemoryWallet, KeyStore, Wallet,
};
pub use uint::Signed;

// Re-exported to avoid the need for version-matching.
pub use ark_ec;
pub use crypto_bigint;
