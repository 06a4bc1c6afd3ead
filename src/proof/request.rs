use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use crypto_bigint::{RandomBits, U256};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{
    attributes::{Predicate, SchemaId},
    params::LARGE_NONCE,
    tools::serde::Decimal,
    uint::minimal_be_bytes,
};

/// A fresh value binding a presentation to one verification session.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce(#[serde_as(as = "Decimal")] U256);

impl Nonce {
    /// Draws a fresh nonce.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self(U256::random_bits(rng, LARGE_NONCE))
    }

    /// Wraps a known value.
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub(crate) fn to_bytes(self) -> Vec<u8> {
        minimal_be_bytes(&self.0)
    }
}

/// What the verifier asks about one credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProofRequest {
    revealed: BTreeSet<String>,
    predicates: BTreeSet<Predicate>,
}

impl SubProofRequest {
    /// An empty request: possession only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks for the attribute to be disclosed.
    pub fn reveal(mut self, attr: impl Into<String>) -> Self {
        self.revealed.insert(attr.into());
        self
    }

    /// Asks for a predicate on a hidden attribute.
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.insert(predicate);
        self
    }

    /// Names of the attributes to disclose.
    pub fn revealed(&self) -> &BTreeSet<String> {
        &self.revealed
    }

    /// The predicates to prove.
    pub fn predicates(&self) -> &BTreeSet<Predicate> {
        &self.predicates
    }
}

/// A verifier's request: a nonce and a sub-request per credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    nonce: Nonce,
    credentials: BTreeMap<SchemaId, SubProofRequest>,
}

impl ProofRequest {
    /// Creates a request with no credentials.
    pub fn new(nonce: Nonce) -> Self {
        Self {
            nonce,
            credentials: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) the sub-request for the credential of the given schema.
    pub fn with(mut self, id: SchemaId, request: SubProofRequest) -> Self {
        self.credentials.insert(id, request);
        self
    }

    /// The session nonce.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Sub-requests, ordered by credential.
    pub fn credentials(&self) -> &BTreeMap<SchemaId, SubProofRequest> {
        &self.credentials
    }

    /// The sub-request for one credential.
    pub fn get(&self, id: &SchemaId) -> Option<&SubProofRequest> {
        self.credentials.get(id)
    }
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;
    use serde::{Deserialize, Serialize};
    use serde_assert::{Deserializer, Serializer};

    use super::{Nonce, ProofRequest, SubProofRequest};
    use crate::attributes::{Predicate, SchemaId};

    #[test]
    fn nonce_is_bounded() {
        for _ in 0..16 {
            assert!(Nonce::random(&mut OsRng).to_bytes().len() <= 10);
        }
    }

    #[test]
    fn request_roundtrip() {
        let request = ProofRequest::new(Nonce::random(&mut OsRng)).with(
            SchemaId::new("gvt:1.0"),
            SubProofRequest::new().reveal("name").predicate(Predicate::ge("age", 18)),
        );
        let serializer = Serializer::builder().build();
        let tokens = request.serialize(&serializer).unwrap();
        let mut deserializer = Deserializer::builder(tokens).build();
        assert_eq!(ProofRequest::deserialize(&mut deserializer).unwrap(), request);
    }
}
