use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;

use ark_ec::pairing::Pairing;
use rand_core::CryptoRngCore;

use super::{Claim, ClaimBlinding, ClaimRequest, CredentialDefinition};
use crate::{
    attributes::SchemaId,
    errors::Error,
    primary::{MasterSecret, PrimaryClaimRequest},
    proof::{FullProof, ProofBuilder, ProofRequest, ProverCredential, ProverRevocation},
    revocation::{scalar_from_uint, Accumulator, RevocationClaimRequest},
    storage::{AttributeStore, KeyStore, Wallet},
};

/// A holder: requests and stores claims in its [`Wallet`], and presents them.
pub struct Prover<E: Pairing> {
    id: String,
    wallet: Arc<dyn Wallet<E>>,
    keys: Arc<dyn KeyStore<E>>,
    attributes: Arc<dyn AttributeStore>,
}

impl<E: Pairing> core::fmt::Debug for Prover<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Prover").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<E: Pairing> Prover<E> {
    /// Creates a holder with the given identifier.
    pub fn new(
        id: impl Into<String>,
        wallet: Arc<dyn Wallet<E>>,
        keys: Arc<dyn KeyStore<E>>,
        attributes: Arc<dyn AttributeStore>,
    ) -> Self {
        Self {
            id: id.into(),
            wallet,
            keys,
            attributes,
        }
    }

    /// The holder's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Draws a master secret and stores it in the wallet, replacing any previous one.
    pub fn generate_master_secret(&self, rng: &mut impl CryptoRngCore) -> Result<(), Error> {
        self.wallet.put_master_secret(&MasterSecret::random(rng))
    }

    /// Blinds the master secret for a claim of the given schema, keeping the blinding factors in the wallet.
    pub fn request_claim(&self, rng: &mut impl CryptoRngCore, schema_id: &SchemaId) -> Result<ClaimRequest<E>, Error> {
        let definition = self.keys.definition(schema_id)?;
        let ms = self.wallet.master_secret()?;

        let (primary, primary_blinding) = PrimaryClaimRequest::new(rng, &definition.public_key, &ms)?;
        let (non_revocation, revocation_blinding) = match definition.revocation.as_ref() {
            Some(revocation) => {
                let (request, blinding) = RevocationClaimRequest::new(rng, &revocation.public_key);
                (Some(request), Some(blinding))
            }
            None => (None, None),
        };

        self.wallet.put_blinding(
            schema_id,
            &ClaimBlinding {
                primary: primary_blinding,
                non_revocation: revocation_blinding,
            },
        )?;

        Ok(ClaimRequest {
            holder_id: self.id.clone(),
            primary,
            non_revocation,
        })
    }

    /// Completes the blinding of a received claim, checks it, and stores it.
    pub fn process_claim(&self, schema_id: &SchemaId, mut claim: Claim<E>) -> Result<(), Error> {
        let definition = self.keys.definition(schema_id)?;
        let blinding = self.wallet.blinding(schema_id)?;
        let ms = self.wallet.master_secret()?;

        claim
            .primary
            .process(&definition.public_key, &blinding.primary, &ms)?;

        match (
            claim.non_revocation.as_mut(),
            definition.revocation.as_ref(),
            blinding.non_revocation.as_ref(),
        ) {
            (None, None, None) => {}
            (Some(non_revocation), Some(revocation), Some(revocation_blinding)) => {
                if non_revocation.m2 != scalar_from_uint::<E::ScalarField>(claim.primary.m2()) {
                    return Err(Error::IncorrectIssuerData(
                        "the claims are bound to different context attributes".into(),
                    ));
                }
                let accumulator = self.keys.accumulator(schema_id)?;
                non_revocation.process(
                    revocation_blinding,
                    &revocation.public_key,
                    &revocation.accumulator_key,
                    &accumulator,
                    &revocation.tails,
                )?;
            }
            _ => {
                return Err(Error::IncorrectIssuerData(
                    "the claim does not match the revocability of the credential".into(),
                ))
            }
        }

        tracing::debug!("`{}` stored a claim for `{schema_id}`", self.id);
        self.wallet.put_claim(schema_id, &claim)
    }

    /// Synchronizes the witness of a stored claim with the published accumulator.
    ///
    /// Fails with [`Error::Revoked`] if the claim has been revoked.
    pub fn refresh_witness(&self, schema_id: &SchemaId) -> Result<(), Error> {
        let definition = self.keys.definition(schema_id)?;
        let mut claim = self.wallet.claim(schema_id)?;
        if let Some(accumulator) = self.refresh(&definition, &mut claim, schema_id)? {
            tracing::debug!(
                "`{}` refreshed the witness for `{schema_id}` ({} indices)",
                self.id,
                accumulator.v().len()
            );
            self.wallet.put_claim(schema_id, &claim)?;
        }
        Ok(())
    }

    fn refresh(
        &self,
        definition: &CredentialDefinition<E>,
        claim: &mut Claim<E>,
        schema_id: &SchemaId,
    ) -> Result<Option<Accumulator<E>>, Error> {
        match (claim.non_revocation.as_mut(), definition.revocation.as_ref()) {
            (Some(non_revocation), Some(revocation)) => {
                let accumulator = self.keys.accumulator(schema_id)?;
                non_revocation.update_witness(&accumulator, &revocation.tails)?;
                Ok(Some(accumulator))
            }
            _ => Ok(None),
        }
    }

    /// Answers a proof request from the claims in the wallet.
    ///
    /// Witnesses of revocable claims are synchronized with the published accumulators first,
    /// and the synchronized claims are stored back in the wallet.
    pub fn present(&self, rng: &mut impl CryptoRngCore, request: &ProofRequest) -> Result<FullProof<E>, Error> {
        let ms = self.wallet.master_secret()?;

        let mut inputs = BTreeMap::new();
        for schema_id in request.credentials().keys() {
            let definition = self.keys.definition(schema_id)?;
            let mut claim = self.wallet.claim(schema_id)?;
            let accumulator = self.refresh(&definition, &mut claim, schema_id)?;
            if accumulator.is_some() {
                self.wallet.put_claim(schema_id, &claim)?;
            }
            let raw = self.attributes.get(&self.id, schema_id)?;
            inputs.insert(schema_id.clone(), (definition, claim, accumulator, raw));
        }

        let mut builder = ProofBuilder::new(request);
        for (schema_id, (definition, claim, accumulator, raw)) in inputs.iter() {
            let revocation = match (definition.revocation.as_ref(), claim.non_revocation.as_ref(), accumulator) {
                (Some(revocation), Some(non_revocation), Some(accumulator)) => Some(ProverRevocation {
                    public_key: &revocation.public_key,
                    accumulator,
                    claim: non_revocation,
                }),
                _ => None,
            };
            builder.add_credential(
                rng,
                schema_id,
                ProverCredential {
                    schema: &definition.schema,
                    public_key: &definition.public_key,
                    claim: &claim.primary,
                    raw,
                    revocation,
                },
            )?;
        }

        let proof = builder.finalize(&ms)?;
        tracing::debug!("`{}` answered a request over {} credential(s)", self.id, inputs.len());
        Ok(proof)
    }
}
