//! Presentations: several sub-proofs per credential, bound together by one Fiat-Shamir challenge.
//!
//! For every credential (in the order of their schema identifiers) the commitments are hashed in the order
//! non-revocation, equality, then one predicate proof per predicate in the order of the request.
//! The verifier reproduces exactly this ordering.

mod builder;
mod request;
mod verifier;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use ark_ec::pairing::Pairing;
use crypto_bigint::U256;
use serde::{Deserialize, Serialize};

use crate::{
    attributes::SchemaId,
    params::CHALLENGE_BITS,
    primary::{EqProof, GeProof},
    revocation::NonRevocProof,
    tools::hashing::{Chain, Hasher},
    uint::{minimal_be_bytes, BoxedEncoding, Signed},
};

pub use builder::{ProofBuilder, ProverCredential, ProverRevocation};
pub use request::{Nonce, ProofRequest, SubProofRequest};
pub use verifier::{CredentialPublicData, ProofVerifier, RevocationPublicData};

const CHALLENGE_TAG: &[u8] = b"challenge";

/// The challenge and every blinded value it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedProof {
    c_hash: Vec<u8>,
    c_list: Vec<Vec<u8>>,
}

impl AggregatedProof {
    /// Minimal big-endian bytes of the challenge.
    pub fn c_hash(&self) -> &[u8] {
        &self.c_hash
    }

    /// The blinded values, in hashing order.
    pub fn c_list(&self) -> &[Vec<u8>] {
        &self.c_list
    }

    pub(crate) fn challenge(&self) -> Option<Signed> {
        let padding = U256::BYTES.checked_sub(self.c_hash.len())?;
        let mut bytes = vec![0u8; padding];
        bytes.extend_from_slice(&self.c_hash);
        let value = U256::try_from_be_bytes(&bytes).ok()?;
        Signed::from_uint(&value)
    }
}

/// The sub-proofs about one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CredentialProof<E: Pairing> {
    eq_proof: EqProof,
    ge_proofs: Vec<GeProof>,
    non_revoc_proof: Option<NonRevocProof<E>>,
    revealed_attrs: BTreeMap<String, String>,
}

impl<E: Pairing> CredentialProof<E> {
    /// The proof of possession with the disclosed values.
    pub fn eq_proof(&self) -> &EqProof {
        &self.eq_proof
    }

    /// Predicate proofs, in the order of the request.
    pub fn ge_proofs(&self) -> &[GeProof] {
        &self.ge_proofs
    }

    /// The non-revocation proof, for revocable credentials.
    pub fn non_revoc_proof(&self) -> Option<&NonRevocProof<E>> {
        self.non_revoc_proof.as_ref()
    }

    /// Raw values of the disclosed attributes.
    pub fn revealed_attrs(&self) -> &BTreeMap<String, String> {
        &self.revealed_attrs
    }
}

/// A complete presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct FullProof<E: Pairing> {
    proofs: BTreeMap<SchemaId, CredentialProof<E>>,
    aggregated: AggregatedProof,
}

impl<E: Pairing> FullProof<E> {
    /// Sub-proofs per credential.
    pub fn proofs(&self) -> &BTreeMap<SchemaId, CredentialProof<E>> {
        &self.proofs
    }

    /// The challenge and the blinded values.
    pub fn aggregated(&self) -> &AggregatedProof {
        &self.aggregated
    }

    /// The raw disclosed value of an attribute of one credential.
    pub fn revealed_attr(&self, id: &SchemaId, attr: &str) -> Option<&str> {
        self.proofs
            .get(id)?
            .revealed_attrs
            .get(attr)
            .map(String::as_str)
    }
}

/// `H("challenge" ‖ tau_list ‖ c_list ‖ nonce)`, as minimal big-endian bytes.
fn challenge_hash(tau_list: &[Vec<u8>], c_list: &[Vec<u8>], nonce: &Nonce) -> Vec<u8> {
    let mut hasher = Hasher::new_with_dst(CHALLENGE_TAG);
    for item in tau_list.iter().chain(c_list.iter()) {
        hasher = hasher.chain_bytes(item);
    }
    let value: U256 = hasher.chain_bytes(&nonce.to_bytes()).finalize_to_uint(CHALLENGE_BITS);
    minimal_be_bytes(&value)
}
