use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use ark_ec::pairing::Pairing;
use derive_where::derive_where;

use super::{challenge_hash, CredentialProof, FullProof, ProofRequest, SubProofRequest};
use crate::{
    attributes::{Schema, SchemaId},
    errors::Error,
    primary::PrimaryPublicKey,
    revocation::{scalar_from_signed, Accumulator, AccumulatorPublicKey, RevocationPublicKey},
    uint::Signed,
};

/// The issuer's public revocation data a non-revocation proof is checked against.
#[derive_where(Debug, Clone)]
pub struct RevocationPublicData<E: Pairing> {
    /// The issuer's revocation key.
    pub public_key: RevocationPublicKey<E>,
    /// The current state of the accumulator.
    pub accumulator: Accumulator<E>,
    /// The public value of the accumulator.
    pub accumulator_key: AccumulatorPublicKey<E>,
}

/// The issuer's public data for one credential definition.
#[derive_where(Debug, Clone)]
pub struct CredentialPublicData<E: Pairing> {
    /// The schema, used to check disclosed raw values.
    pub schema: Schema,
    /// The primary key.
    pub public_key: PrimaryPublicKey,
    /// Present for revocable credentials; a non-revocation proof is then required.
    pub revocation: Option<RevocationPublicData<E>>,
}

/// Checks presentations against a [`ProofRequest`].
#[derive_where(Debug)]
pub struct ProofVerifier<E: Pairing> {
    request: ProofRequest,
    credentials: BTreeMap<SchemaId, CredentialPublicData<E>>,
}

impl<E: Pairing> ProofVerifier<E> {
    /// Starts a verification of the answer to `request`.
    pub fn new(request: &ProofRequest) -> Self {
        Self {
            request: request.clone(),
            credentials: BTreeMap::new(),
        }
    }

    /// Registers the public data of a credential definition the request is about.
    pub fn add_credential(&mut self, id: &SchemaId, data: CredentialPublicData<E>) {
        self.credentials.insert(id.clone(), data);
    }

    /// Verifies the presentation.
    ///
    /// Returns `Ok(false)` if the proof does not verify,
    /// and an error if it does not have the shape the request asks for.
    pub fn verify(&self, proof: &FullProof<E>) -> Result<bool, Error> {
        let requested = self.request.credentials().keys().collect::<BTreeSet<_>>();
        let proven = proof.proofs.keys().collect::<BTreeSet<_>>();
        if requested != proven {
            return Err(Error::InvalidInput(
                "the proof does not cover the requested credentials".into(),
            ));
        }

        let challenge = proof
            .aggregated
            .challenge()
            .ok_or_else(|| Error::InvalidInput("the challenge must be at most 32 bytes".into()))?;

        let mut tau_list = Vec::new();
        let mut c_list = Vec::new();
        for (id, credential_proof) in proof.proofs.iter() {
            let sub_request = self
                .request
                .get(id)
                .ok_or_else(|| Error::InvalidInput(format!("`{id}` was not requested")))?;
            let data = self
                .credentials
                .get(id)
                .ok_or_else(|| Error::NotFound(format!("public data for `{id}`")))?;

            check_shape(sub_request, data, credential_proof)?;
            if !check_links(data, credential_proof)? {
                tracing::debug!("Linked values of the sub-proofs for `{id}` do not match");
                return Ok(false);
            }

            let (tau, c) = commitments(data, credential_proof, &challenge)?;
            tau_list.extend(tau);
            c_list.extend(c);
        }

        if c_list != proof.aggregated.c_list {
            tracing::debug!("The aggregated blinded values do not match the sub-proofs");
            return Ok(false);
        }

        let c_hash = challenge_hash(&tau_list, &c_list, self.request.nonce());
        let verified = c_hash == proof.aggregated.c_hash;
        tracing::debug!("Verified a presentation over {} credential(s): {verified}", proven.len());
        Ok(verified)
    }
}

/// The sub-proofs present are exactly the requested ones.
fn check_shape<E: Pairing>(
    sub_request: &SubProofRequest,
    data: &CredentialPublicData<E>,
    proof: &CredentialProof<E>,
) -> Result<(), Error> {
    let revealed = proof.eq_proof.revealed().keys().cloned().collect::<BTreeSet<_>>();
    if &revealed != sub_request.revealed() || proof.revealed_attrs.keys().ne(revealed.iter()) {
        return Err(Error::InvalidInput(
            "the disclosed attributes differ from the requested ones".into(),
        ));
    }

    let predicates = proof.ge_proofs.iter().map(|ge| ge.predicate());
    if predicates.ne(sub_request.predicates().iter()) {
        return Err(Error::InvalidInput("the predicates differ from the requested ones".into()));
    }

    if data.revocation.is_some() != proof.non_revoc_proof.is_some() {
        return Err(Error::InvalidInput(
            "a non-revocation proof must be present exactly for revocable credentials".into(),
        ));
    }
    Ok(())
}

/// Values shared between the sub-proofs agree, and the disclosed raw values encode to the proven ones.
fn check_links<E: Pairing>(data: &CredentialPublicData<E>, proof: &CredentialProof<E>) -> Result<bool, Error> {
    for (attr, raw) in proof.revealed_attrs.iter() {
        let encoded = data.schema.encode_value(attr, raw)?;
        if proof.eq_proof.revealed().get(attr) != Some(&encoded) {
            return Ok(false);
        }
    }

    for ge in proof.ge_proofs.iter() {
        if proof.eq_proof.m(&ge.predicate().attr_name) != Some(ge.mj()) {
            return Ok(false);
        }
    }

    if let Some(non_revoc) = proof.non_revoc_proof.as_ref() {
        if *non_revoc.m2() != scalar_from_signed::<E::ScalarField>(proof.eq_proof.m2()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Recomputes the commitments of one credential, in hashing order, along with its blinded values.
fn commitments<E: Pairing>(
    data: &CredentialPublicData<E>,
    proof: &CredentialProof<E>,
    challenge: &Signed,
) -> Result<(Vec<Vec<u8>>, Vec<Vec<u8>>), Error> {
    let pk = data.public_key.to_precomputed()?;
    let mut tau_list = Vec::new();
    let mut c_list = Vec::new();

    if let (Some(revocation), Some(non_revoc)) = (data.revocation.as_ref(), proof.non_revoc_proof.as_ref()) {
        tau_list.extend(non_revoc.tau_list(
            &revocation.public_key,
            &revocation.accumulator,
            &revocation.accumulator_key,
            challenge,
        ));
        c_list.extend(non_revoc.c_list());
    }

    tau_list.extend(proof.eq_proof.tau_list(&pk, challenge)?);
    c_list.extend(proof.eq_proof.c_list());

    for ge in proof.ge_proofs.iter() {
        tau_list.extend(ge.tau_list(&pk, challenge)?);
        c_list.extend(ge.c_list());
    }

    Ok((tau_list, c_list))
}
