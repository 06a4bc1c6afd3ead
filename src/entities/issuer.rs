use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use ark_ec::pairing::Pairing;
use rand_core::CryptoRngCore;

use super::{Claim, ClaimRequest, CredentialDefinition, RevocationDefinition};
use crate::{
    attributes::{Schema, SchemaId},
    errors::Error,
    params::SchemeParams,
    primary::{context_attribute, PrimaryClaim, PrimaryPublicKey, PrimarySecretKey},
    revocation::{
        Accumulator, AccumulatorSecretKey, RevocationPublicKey, RevocationSecretKey, SharedAccumulator,
    },
    storage::{AttributeStore, KeyStore},
};

struct IssuerRevocation<E: Pairing> {
    secret_key: RevocationSecretKey<E>,
    accumulator_secret_key: AccumulatorSecretKey<E>,
    accumulator: SharedAccumulator<E>,
}

struct IssuerCredential<E: Pairing> {
    definition: CredentialDefinition<E>,
    secret_key: PrimarySecretKey,
    revocation: Option<IssuerRevocation<E>>,
}

/// Holds the issuer's secret keys, issues claims from an [`AttributeStore`] and publishes to a [`KeyStore`].
pub struct Issuer<E: Pairing> {
    attributes: Arc<dyn AttributeStore>,
    keys: Arc<dyn KeyStore<E>>,
    credentials: BTreeMap<SchemaId, IssuerCredential<E>>,
}

impl<E: Pairing> core::fmt::Debug for Issuer<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Issuer")
            .field("schemas", &self.credentials.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<E: Pairing> Issuer<E> {
    /// Creates an issuer with no credential definitions.
    pub fn new(attributes: Arc<dyn AttributeStore>, keys: Arc<dyn KeyStore<E>>) -> Self {
        Self {
            attributes,
            keys,
            credentials: BTreeMap::new(),
        }
    }

    /// Generates the keys for a schema and publishes the definition.
    ///
    /// If `max_claim_num` is given, the credentials are revocable through an accumulator of that capacity.
    pub fn create_definition<P: SchemeParams>(
        &mut self,
        rng: &mut impl CryptoRngCore,
        schema: Schema,
        max_claim_num: Option<u32>,
    ) -> Result<CredentialDefinition<E>, Error> {
        let (public_key, secret_key) = PrimaryPublicKey::generate::<P>(rng, &schema.attribute_names())?;
        self.add_definition(rng, schema, public_key, secret_key, max_claim_num)
    }

    /// Publishes a definition for a schema using an existing primary key pair.
    pub fn add_definition(
        &mut self,
        rng: &mut impl CryptoRngCore,
        schema: Schema,
        public_key: PrimaryPublicKey,
        secret_key: PrimarySecretKey,
        max_claim_num: Option<u32>,
    ) -> Result<CredentialDefinition<E>, Error> {
        let schema_id = schema.id();
        if self.credentials.contains_key(&schema_id) {
            return Err(Error::InvalidInput(format!("`{schema_id}` already has a definition")));
        }
        if public_key.attribute_names() != schema.attribute_names() {
            return Err(Error::InvalidInput(
                "the public key does not sign the attributes of the schema".into(),
            ));
        }

        let (revocation_definition, revocation) = match max_claim_num {
            Some(max_claim_num) => {
                let (rev_pk, rev_sk) = RevocationPublicKey::<E>::generate(rng);
                let (accumulator, tails, acc_pk, acc_sk) =
                    Accumulator::new(rng, schema_id.as_str(), &rev_pk, max_claim_num)?;
                self.keys.publish_accumulator(&schema_id, &accumulator)?;
                (
                    Some(RevocationDefinition {
                        public_key: rev_pk,
                        accumulator_key: acc_pk,
                        tails,
                    }),
                    Some(IssuerRevocation {
                        secret_key: rev_sk,
                        accumulator_secret_key: acc_sk,
                        accumulator: SharedAccumulator::new(accumulator),
                    }),
                )
            }
            None => (None, None),
        };

        let definition = CredentialDefinition {
            schema,
            public_key,
            revocation: revocation_definition,
        };
        self.keys.publish_definition(&definition)?;

        tracing::debug!(
            "Published the definition of `{schema_id}` (revocable: {})",
            revocation.is_some()
        );

        self.credentials.insert(
            schema_id,
            IssuerCredential {
                definition: definition.clone(),
                secret_key,
                revocation,
            },
        );
        Ok(definition)
    }

    fn credential(&self, schema_id: &SchemaId) -> Result<&IssuerCredential<E>, Error> {
        self.credentials
            .get(schema_id)
            .ok_or_else(|| Error::NotFound(format!("credential definition `{schema_id}`")))
    }

    /// Issues a claim over the holder's attributes, as found in the attribute store.
    ///
    /// For revocable credentials the next index of the accumulator is taken,
    /// and the updated accumulator is published before the lock is released.
    pub fn issue(
        &self,
        rng: &mut impl CryptoRngCore,
        schema_id: &SchemaId,
        request: &ClaimRequest<E>,
    ) -> Result<Claim<E>, Error> {
        let credential = self.credential(schema_id)?;
        let definition = &credential.definition;
        let raw = self.attributes.get(&request.holder_id, schema_id)?;
        let attributes = definition.schema.encode(&raw)?;

        let (revocation, revocation_definition, revocation_request) = match (
            credential.revocation.as_ref(),
            definition.revocation.as_ref(),
            request.non_revocation.as_ref(),
        ) {
            (None, None, None) => {
                let m2 = context_attribute(&request.holder_id, None);
                let primary = PrimaryClaim::issue(
                    rng,
                    &definition.public_key,
                    &credential.secret_key,
                    &attributes,
                    &m2,
                    &request.primary,
                )?;
                tracing::debug!("Issued `{schema_id}` to `{}`", request.holder_id);
                return Ok(Claim {
                    primary,
                    non_revocation: None,
                });
            }
            (Some(revocation), Some(revocation_definition), Some(revocation_request)) => {
                (revocation, revocation_definition, revocation_request)
            }
            _ => {
                return Err(Error::InvalidInput(
                    "the request does not match the revocability of the credential".into(),
                ))
            }
        };

        let mut accumulator = revocation.accumulator.lock()?;
        let index = accumulator.next_index()?;
        let m2 = context_attribute(&request.holder_id, Some(index));
        let primary = PrimaryClaim::issue(
            rng,
            &definition.public_key,
            &credential.secret_key,
            &attributes,
            &m2,
            &request.primary,
        )?;
        let non_revocation = accumulator.issue(
            rng,
            &revocation_definition.public_key,
            &revocation.secret_key,
            &revocation.accumulator_secret_key,
            &revocation_definition.tails,
            revocation_request,
            &m2,
            Some(index),
        )?;
        self.keys.publish_accumulator(schema_id, &accumulator)?;

        tracing::debug!("Issued `{schema_id}` to `{}` at index {index}", request.holder_id);

        Ok(Claim {
            primary,
            non_revocation: Some(non_revocation),
        })
    }

    /// Revokes the claim at `index` and publishes the updated accumulator.
    pub fn revoke(&self, schema_id: &SchemaId, index: u32) -> Result<(), Error> {
        let credential = self.credential(schema_id)?;
        let (revocation, revocation_definition) = credential
            .revocation
            .as_ref()
            .zip(credential.definition.revocation.as_ref())
            .ok_or_else(|| Error::InvalidInput(format!("`{schema_id}` is not revocable")))?;

        let mut accumulator = revocation.accumulator.lock()?;
        accumulator.revoke(index, &revocation_definition.tails)?;
        self.keys.publish_accumulator(schema_id, &accumulator)
    }

    /// A consistent copy of the current accumulator of a revocable schema.
    pub fn accumulator(&self, schema_id: &SchemaId) -> Result<Accumulator<E>, Error> {
        self.credential(schema_id)?
            .revocation
            .as_ref()
            .ok_or_else(|| Error::InvalidInput(format!("`{schema_id}` is not revocable")))?
            .accumulator
            .snapshot()
    }
}
