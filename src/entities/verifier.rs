use alloc::sync::Arc;

use ark_ec::pairing::Pairing;
use rand_core::CryptoRngCore;

use crate::{
    errors::Error,
    proof::{
        CredentialPublicData, FullProof, Nonce, ProofRequest, ProofVerifier, RevocationPublicData,
    },
    storage::KeyStore,
};

/// Issues proof requests and verifies presentations against the published keys.
pub struct Verifier<E: Pairing> {
    keys: Arc<dyn KeyStore<E>>,
}

impl<E: Pairing> core::fmt::Debug for Verifier<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Verifier").finish_non_exhaustive()
    }
}

impl<E: Pairing> Verifier<E> {
    /// Creates a verifier reading from the given key store.
    pub fn new(keys: Arc<dyn KeyStore<E>>) -> Self {
        Self { keys }
    }

    /// Starts a request with a fresh nonce.
    pub fn new_request(&self, rng: &mut impl CryptoRngCore) -> ProofRequest {
        ProofRequest::new(Nonce::random(rng))
    }

    /// Verifies a presentation against the current published keys and accumulators.
    pub fn verify(&self, request: &ProofRequest, proof: &FullProof<E>) -> Result<bool, Error> {
        let mut verifier = ProofVerifier::new(request);
        for schema_id in request.credentials().keys() {
            let definition = self.keys.definition(schema_id)?;
            let revocation = match definition.revocation {
                Some(revocation) => Some(RevocationPublicData {
                    public_key: revocation.public_key,
                    accumulator: self.keys.accumulator(schema_id)?,
                    accumulator_key: revocation.accumulator_key,
                }),
                None => None,
            };
            verifier.add_credential(
                schema_id,
                CredentialPublicData {
                    schema: definition.schema,
                    public_key: definition.public_key,
                    revocation,
                },
            );
        }
        verifier.verify(proof)
    }
}
