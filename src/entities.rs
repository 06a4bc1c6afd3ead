//! The three roles of the protocol, and the data they exchange.

mod issuer;
mod prover;
mod verifier;

use alloc::string::String;

use ark_ec::pairing::Pairing;
use derive_where::derive_where;
use serde::{Deserialize, Serialize};

use crate::{
    attributes::Schema,
    primary::{PrimaryBlinding, PrimaryClaim, PrimaryClaimRequest, PrimaryPublicKey},
    revocation::{
        AccumulatorPublicKey, NonRevocationClaim, RevocationBlinding, RevocationClaimRequest, RevocationPublicKey,
        Tails,
    },
};

pub use issuer::Issuer;
pub use prover::Prover;
pub use verifier::Verifier;

/// Public revocation data of a credential definition.
#[derive_where(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RevocationDefinition<E: Pairing> {
    /// The issuer's revocation key.
    pub public_key: RevocationPublicKey<E>,
    /// The public value of the accumulator.
    pub accumulator_key: AccumulatorPublicKey<E>,
    /// The public table of the accumulator.
    pub tails: Tails<E>,
}

/// Everything an issuer publishes about the credentials of one schema.
#[derive_where(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CredentialDefinition<E: Pairing> {
    /// The schema.
    pub schema: Schema,
    /// The primary key.
    pub public_key: PrimaryPublicKey,
    /// Present if the credentials are revocable.
    pub revocation: Option<RevocationDefinition<E>>,
}

/// A holder's request for a claim: the blinded master secret and, for revocable credentials, the blinded `vr'`.
#[derive_where(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ClaimRequest<E: Pairing> {
    /// The holder's identifier, bound into the context attribute.
    pub holder_id: String,
    /// The blinded commitment for the primary claim.
    pub primary: PrimaryClaimRequest,
    /// The blinded commitment for the non-revocation claim.
    pub non_revocation: Option<RevocationClaimRequest<E>>,
}

/// The holder's secret blinding factors of a [`ClaimRequest`].
#[derive_where(Clone)]
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ClaimBlinding<E: Pairing> {
    pub(crate) primary: PrimaryBlinding,
    pub(crate) non_revocation: Option<RevocationBlinding<E>>,
}

impl<E: Pairing> core::fmt::Debug for ClaimBlinding<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ClaimBlinding { .. }")
    }
}

/// A credential: the primary claim and, if revocable, the non-revocation claim.
#[derive_where(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Claim<E: Pairing> {
    /// The CL signature over the attributes.
    pub primary: PrimaryClaim,
    /// The accumulator membership claim.
    pub non_revocation: Option<NonRevocationClaim<E>>,
}
