use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use ark_ec::pairing::Pairing;
use derive_where::derive_where;
use rand_core::CryptoRngCore;

use super::{challenge_hash, AggregatedProof, CredentialProof, FullProof, ProofRequest};
use crate::{
    attributes::{AttributeKind, RawAttributes, Schema, SchemaId},
    errors::Error,
    primary::{EqProofInit, GeProofInit, MasterSecret, PrimaryClaim, PrimaryPublicKey},
    revocation::{Accumulator, NonRevocProofInit, NonRevocationClaim, RevocationPublicKey},
};

/// The holder's revocation data for one credential.
#[derive_where(Debug, Clone, Copy)]
pub struct ProverRevocation<'a, E: Pairing> {
    /// The issuer's revocation key.
    pub public_key: &'a RevocationPublicKey<E>,
    /// The accumulator the proof is made against.
    pub accumulator: &'a Accumulator<E>,
    /// The holder's claim, with its witness synchronized with `accumulator`.
    pub claim: &'a NonRevocationClaim<E>,
}

/// Everything the holder uses to prove statements about one credential.
#[derive_where(Debug, Clone, Copy)]
pub struct ProverCredential<'a, E: Pairing> {
    /// The schema of the credential.
    pub schema: &'a Schema,
    /// The issuer's primary key.
    pub public_key: &'a PrimaryPublicKey,
    /// The processed primary claim.
    pub claim: &'a PrimaryClaim,
    /// Raw values of the attributes, used for disclosure.
    pub raw: &'a RawAttributes,
    /// Present for revocable credentials.
    pub revocation: Option<ProverRevocation<'a, E>>,
}

struct CredentialProofInit<E: Pairing> {
    eq: EqProofInit,
    ge: Vec<GeProofInit>,
    non_revoc: Option<NonRevocProofInit<E>>,
    revealed_attrs: BTreeMap<String, String>,
}

impl<E: Pairing> CredentialProofInit<E> {
    fn tau_list(&self) -> Vec<Vec<u8>> {
        let mut result = self.non_revoc.as_ref().map(|init| init.tau_list()).unwrap_or_default();
        result.extend(self.eq.tau_list());
        for init in self.ge.iter() {
            result.extend(init.tau_list());
        }
        result
    }

    fn c_list(&self) -> Vec<Vec<u8>> {
        let mut result = self.non_revoc.as_ref().map(|init| init.c_list()).unwrap_or_default();
        result.extend(self.eq.c_list());
        for init in self.ge.iter() {
            result.extend(init.c_list());
        }
        result
    }
}

/// Builds a presentation answering a [`ProofRequest`].
pub struct ProofBuilder<E: Pairing> {
    request: ProofRequest,
    inits: BTreeMap<SchemaId, CredentialProofInit<E>>,
}

impl<E: Pairing> ProofBuilder<E> {
    /// Starts answering the request.
    pub fn new(request: &ProofRequest) -> Self {
        Self {
            request: request.clone(),
            inits: BTreeMap::new(),
        }
    }

    /// Commits to the sub-proofs the request asks for about the credential of schema `id`.
    ///
    /// Fails with [`Error::PredicateNotSatisfied`] if a predicate does not hold,
    /// and with [`Error::InvalidInput`] if the request does not fit the credential.
    pub fn add_credential(
        &mut self,
        rng: &mut impl CryptoRngCore,
        id: &SchemaId,
        credential: ProverCredential<'_, E>,
    ) -> Result<(), Error> {
        let sub_request = self
            .request
            .get(id)
            .ok_or_else(|| Error::InvalidInput(format!("the request does not ask about `{id}`")))?;
        if credential.schema.id() != *id {
            return Err(Error::InvalidInput(format!(
                "the credential has schema `{}`, not `{id}`",
                credential.schema.id()
            )));
        }

        let pk = credential.public_key.to_precomputed()?;
        let eq = EqProofInit::new(rng, &pk, credential.claim, sub_request.revealed())?;

        let mut revealed_attrs = BTreeMap::new();
        for attr in sub_request.revealed() {
            let raw = credential
                .raw
                .get(attr)
                .ok_or_else(|| Error::NotFound(format!("the raw value of `{attr}`")))?;
            revealed_attrs.insert(attr.clone(), raw.into());
        }

        let mut ge = Vec::with_capacity(sub_request.predicates().len());
        for predicate in sub_request.predicates() {
            if credential.schema.kind(&predicate.attr_name) != Some(AttributeKind::Numeric) {
                return Err(Error::InvalidInput(format!(
                    "`{}` is not a numeric attribute",
                    predicate.attr_name
                )));
            }
            let mj_tilde = eq.m_tilde(&predicate.attr_name).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "a predicate is requested on the disclosed attribute `{}`",
                    predicate.attr_name
                ))
            })?;
            let value = credential
                .claim
                .attributes()
                .get(&predicate.attr_name)
                .ok_or_else(|| Error::NotFound(format!("attribute `{}`", predicate.attr_name)))?;
            ge.push(GeProofInit::new(rng, &pk, predicate, value, mj_tilde)?);
        }

        let non_revoc = match credential.revocation {
            Some(revocation) => {
                if revocation.claim.witness().v() != revocation.accumulator.v() {
                    return Err(Error::InvalidInput(
                        "the witness is not synchronized with the accumulator".into(),
                    ));
                }
                Some(NonRevocProofInit::new(
                    rng,
                    revocation.public_key,
                    revocation.accumulator,
                    revocation.claim,
                    eq.m2_tilde(),
                ))
            }
            None => None,
        };

        tracing::debug!(
            "Committed to {} predicate(s) for `{id}`{}",
            ge.len(),
            if non_revoc.is_some() { " with non-revocation" } else { "" }
        );

        self.inits.insert(
            id.clone(),
            CredentialProofInit {
                eq,
                ge,
                non_revoc,
                revealed_attrs,
            },
        );
        Ok(())
    }

    /// Derives the common challenge and computes every response.
    ///
    /// Fails if a credential the request asks about has not been added.
    pub fn finalize(self, ms: &MasterSecret) -> Result<FullProof<E>, Error> {
        if let Some(missing) = self
            .request
            .credentials()
            .keys()
            .find(|id| !self.inits.contains_key(*id))
        {
            return Err(Error::InvalidInput(format!("no credential was added for `{missing}`")));
        }

        let mut tau_list = Vec::new();
        let mut c_list = Vec::new();
        for init in self.inits.values() {
            tau_list.extend(init.tau_list());
            c_list.extend(init.c_list());
        }
        let c_hash = challenge_hash(&tau_list, &c_list, self.request.nonce());
        let aggregated = AggregatedProof { c_hash, c_list };
        let challenge = aggregated
            .challenge()
            .ok_or_else(|| Error::InvalidInput("the challenge is malformed".into()))?;

        let credentials = self.inits.len();
        let proofs = self
            .inits
            .into_iter()
            .map(|(id, init)| {
                let proof = CredentialProof {
                    eq_proof: init.eq.finalize(&challenge, ms),
                    ge_proofs: init.ge.into_iter().map(|ge| ge.finalize(&challenge)).collect(),
                    non_revoc_proof: init.non_revoc.map(|init| init.finalize(&challenge)),
                    revealed_attrs: init.revealed_attrs,
                };
                (id, proof)
            })
            .collect();

        tracing::debug!("Built a presentation over {credentials} credential(s)");

        Ok(FullProof { proofs, aggregated })
    }
}
