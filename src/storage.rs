//! Collaborators the roles read from and write to, with in-memory implementations.

use alloc::collections::BTreeMap;
use alloc::string::String;
use std::sync::{Mutex, MutexGuard};

use ark_ec::pairing::Pairing;
use derive_where::derive_where;

use crate::{
    attributes::{RawAttributes, SchemaId},
    entities::{Claim, ClaimBlinding, CredentialDefinition},
    errors::Error,
    primary::MasterSecret,
    revocation::Accumulator,
};

/// Raw attribute values of holders.
pub trait AttributeStore: Send + Sync {
    /// The raw values of the holder's attributes for a schema.
    fn get(&self, holder_id: &str, schema_id: &SchemaId) -> Result<RawAttributes, Error>;
}

/// Published issuer data.
pub trait KeyStore<E: Pairing>: Send + Sync {
    /// Publishes (or replaces) a credential definition.
    fn publish_definition(&self, definition: &CredentialDefinition<E>) -> Result<(), Error>;

    /// Fetches the credential definition of a schema.
    fn definition(&self, schema_id: &SchemaId) -> Result<CredentialDefinition<E>, Error>;

    /// Publishes the current state of the accumulator of a schema.
    fn publish_accumulator(&self, schema_id: &SchemaId, accumulator: &Accumulator<E>) -> Result<(), Error>;

    /// Fetches the last published state of the accumulator of a schema.
    fn accumulator(&self, schema_id: &SchemaId) -> Result<Accumulator<E>, Error>;
}

/// A holder's private state kept between sessions.
pub trait Wallet<E: Pairing>: Send + Sync {
    /// Stores the master secret.
    fn put_master_secret(&self, ms: &MasterSecret) -> Result<(), Error>;

    /// The master secret.
    fn master_secret(&self) -> Result<MasterSecret, Error>;

    /// Stores the blinding factors of a pending claim request.
    fn put_blinding(&self, schema_id: &SchemaId, blinding: &ClaimBlinding<E>) -> Result<(), Error>;

    /// The blinding factors of a pending claim request.
    fn blinding(&self, schema_id: &SchemaId) -> Result<ClaimBlinding<E>, Error>;

    /// Stores a processed claim.
    fn put_claim(&self, schema_id: &SchemaId, claim: &Claim<E>) -> Result<(), Error>;

    /// A processed claim.
    fn claim(&self, schema_id: &SchemaId) -> Result<Claim<E>, Error>;
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Error> {
    mutex.lock().map_err(|_| Error::MutexPoisoned)
}

fn fetch<K: Ord, V: Clone>(map: &Mutex<BTreeMap<K, V>>, key: &K, what: impl FnOnce() -> String) -> Result<V, Error> {
    lock(map)?.get(key).cloned().ok_or_else(|| Error::NotFound(what()))
}

/// An [`AttributeStore`] backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryAttributeStore {
    values: Mutex<BTreeMap<(String, SchemaId), RawAttributes>>,
}

impl InMemoryAttributeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the raw values of the holder's attributes for a schema.
    pub fn insert(&self, holder_id: &str, schema_id: &SchemaId, values: RawAttributes) -> Result<(), Error> {
        lock(&self.values)?.insert((holder_id.into(), schema_id.clone()), values);
        Ok(())
    }
}

impl AttributeStore for InMemoryAttributeStore {
    fn get(&self, holder_id: &str, schema_id: &SchemaId) -> Result<RawAttributes, Error> {
        fetch(&self.values, &(holder_id.into(), schema_id.clone()), || {
            format!("attributes of `{holder_id}` for `{schema_id}`")
        })
    }
}

/// A [`KeyStore`] backed by maps.
#[derive_where(Debug, Default)]
pub struct InMemoryKeyStore<E: Pairing> {
    definitions: Mutex<BTreeMap<SchemaId, CredentialDefinition<E>>>,
    accumulators: Mutex<BTreeMap<SchemaId, Accumulator<E>>>,
}

impl<E: Pairing> InMemoryKeyStore<E> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: Pairing> KeyStore<E> for InMemoryKeyStore<E> {
    fn publish_definition(&self, definition: &CredentialDefinition<E>) -> Result<(), Error> {
        lock(&self.definitions)?.insert(definition.schema.id(), definition.clone());
        Ok(())
    }

    fn definition(&self, schema_id: &SchemaId) -> Result<CredentialDefinition<E>, Error> {
        fetch(&self.definitions, schema_id, || format!("credential definition `{schema_id}`"))
    }

    fn publish_accumulator(&self, schema_id: &SchemaId, accumulator: &Accumulator<E>) -> Result<(), Error> {
        lock(&self.accumulators)?.insert(schema_id.clone(), accumulator.clone());
        Ok(())
    }

    fn accumulator(&self, schema_id: &SchemaId) -> Result<Accumulator<E>, Error> {
        fetch(&self.accumulators, schema_id, || format!("accumulator of `{schema_id}`"))
    }
}

/// A [`Wallet`] backed by maps.
#[derive_where(Default)]
pub struct InMemoryWallet<E: Pairing> {
    master_secret: Mutex<Option<MasterSecret>>,
    blindings: Mutex<BTreeMap<SchemaId, ClaimBlinding<E>>>,
    claims: Mutex<BTreeMap<SchemaId, Claim<E>>>,
}

impl<E: Pairing> core::fmt::Debug for InMemoryWallet<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("InMemoryWallet { .. }")
    }
}

impl<E: Pairing> InMemoryWallet<E> {
    /// Creates an empty wallet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: Pairing> Wallet<E> for InMemoryWallet<E> {
    fn put_master_secret(&self, ms: &MasterSecret) -> Result<(), Error> {
        *lock(&self.master_secret)? = Some(ms.clone());
        Ok(())
    }

    fn master_secret(&self) -> Result<MasterSecret, Error> {
        lock(&self.master_secret)?
            .clone()
            .ok_or_else(|| Error::NotFound("master secret".into()))
    }

    fn put_blinding(&self, schema_id: &SchemaId, blinding: &ClaimBlinding<E>) -> Result<(), Error> {
        lock(&self.blindings)?.insert(schema_id.clone(), blinding.clone());
        Ok(())
    }

    fn blinding(&self, schema_id: &SchemaId) -> Result<ClaimBlinding<E>, Error> {
        fetch(&self.blindings, schema_id, || format!("claim blinding for `{schema_id}`"))
    }

    fn put_claim(&self, schema_id: &SchemaId, claim: &Claim<E>) -> Result<(), Error> {
        lock(&self.claims)?.insert(schema_id.clone(), claim.clone());
        Ok(())
    }

    fn claim(&self, schema_id: &SchemaId) -> Result<Claim<E>, Error> {
        fetch(&self.claims, schema_id, || format!("claim for `{schema_id}`"))
    }
}
