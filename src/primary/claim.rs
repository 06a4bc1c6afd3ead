//! Blind issuance of primary (CL) claims.

use crypto_bigint::{RandomBits, U1024, U2048, U256};
use crypto_primes::RandomPrimeWithRng;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::keys::{PrimaryPublicKey, PrimarySecretKey, PublicKeyPrecomputed};
use crate::{
    attributes::AttributeValues,
    errors::Error,
    params::{LARGE_E_END_RANGE, LARGE_E_START, LARGE_MASTER_SECRET, LARGE_VPRIME, LARGE_VPRIME_PRIME, PRIME_SEARCH_TRIALS},
    tools::{
        hashing::{Chain, Hasher},
        serde::Decimal,
    },
    uint::{invert, Exponentiable, Extendable, ModMonty, Signed},
};

const CONTEXT_TAG: &[u8] = b"context";

/// The holder's master secret, folded into every credential it receives.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct MasterSecret(#[serde_as(as = "Decimal")] U256);

impl core::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("MasterSecret(..)")
    }
}

impl MasterSecret {
    /// Draws a fresh master secret.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self(U256::random_bits(rng, LARGE_MASTER_SECRET))
    }

    pub(crate) fn to_signed(&self) -> Signed {
        Signed::from_uint(&self.0).unwrap_or(Signed::ZERO)
    }
}

/// Derives the context attribute `m2` binding a claim to a holder and a revocation index.
pub fn context_attribute(holder_id: &str, rev_idx: Option<u32>) -> U256 {
    Hasher::new_with_dst(CONTEXT_TAG)
        .chain(&(holder_id, rev_idx))
        .finalize_to_uint(LARGE_MASTER_SECRET)
}

/// The holder's secret blinding factor `v'` for one claim request.
#[serde_as]
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct PrimaryBlinding {
    #[serde_as(as = "Decimal")]
    v_prime: Signed,
}

/// The blinded commitment `U = S^v' · Rms^ms` sent to the issuer.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryClaimRequest {
    #[serde_as(as = "Decimal")]
    u: U2048,
}

impl PrimaryClaimRequest {
    /// Blinds the master secret for issuance under `pk`.
    pub fn new(
        rng: &mut impl CryptoRngCore,
        pk: &PrimaryPublicKey,
        ms: &MasterSecret,
    ) -> Result<(Self, PrimaryBlinding), Error> {
        let pk = pk.to_precomputed()?;
        let v_prime = Signed::random_bits(rng, LARGE_VPRIME);
        let u = pk.s.power(&v_prime)? * pk.rms.power(&ms.to_signed())?;
        Ok((Self { u: u.retrieve() }, PrimaryBlinding { v_prime }))
    }
}

/// A CL signature `(A, e, v)` over the attributes and the context attribute `m2`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryClaim {
    attributes: AttributeValues,
    #[serde_as(as = "Decimal")]
    m2: U256,
    #[serde_as(as = "Decimal")]
    a: U2048,
    #[serde_as(as = "Decimal")]
    e: U1024,
    #[serde_as(as = "Decimal")]
    v: Signed,
}

impl PrimaryClaim {
    /// Signs the attributes and the blinded commitment of the holder.
    ///
    /// The returned claim carries only the issuer's share `v''` of the blinding factor;
    /// the holder completes it with [`PrimaryClaim::process`].
    pub fn issue(
        rng: &mut impl CryptoRngCore,
        pk: &PrimaryPublicKey,
        sk: &PrimarySecretKey,
        attributes: &AttributeValues,
        m2: &U256,
        request: &PrimaryClaimRequest,
    ) -> Result<Self, Error> {
        if attributes.names() != pk.attribute_names() {
            return Err(Error::InvalidInput(
                "the attributes do not match the attributes of the public key".into(),
            ));
        }
        let pk = pk.to_precomputed()?;

        let v_prime_prime = Signed::random_bits_exact(rng, LARGE_VPRIME_PRIME);
        let e = random_prime_exponent(rng)?;

        let rx = attributes_product(&pk, attributes, m2)? * pk.group.element(&request.u);
        let q = pk.z * invert(&rx)? * invert(&pk.s.power(&v_prime_prime)?)?;
        let e_inv = sk.invert_exponent(&e.to_wide())?;
        let a = q.power(&e_inv)?;

        tracing::debug!("Issued a primary claim");

        Ok(Self {
            attributes: attributes.clone(),
            m2: *m2,
            a: a.retrieve(),
            e,
            v: v_prime_prime,
        })
    }

    /// Completes the blinding factor (`v = v' + v''`) and checks the signature.
    pub fn process(&mut self, pk: &PrimaryPublicKey, blinding: &PrimaryBlinding, ms: &MasterSecret) -> Result<(), Error> {
        self.v = self.v.add(&blinding.v_prime);
        if !self.verify(pk, ms)? {
            return Err(Error::IncorrectIssuerData("the primary signature does not verify".into()));
        }
        Ok(())
    }

    /// Checks `A^e · ∏ R[i]^m_i · Rms^ms · Rctxt^m2 · S^v = Z`.
    pub fn verify(&self, pk: &PrimaryPublicKey, ms: &MasterSecret) -> Result<bool, Error> {
        let pk = pk.to_precomputed()?;
        let lhs = pk.group.element(&self.a).power(&self.e_signed())?
            * attributes_product(&pk, &self.attributes, &self.m2)?
            * pk.rms.power(&ms.to_signed())?
            * pk.s.power(&self.v)?;
        Ok(lhs == pk.z)
    }

    /// The signed attribute values.
    pub fn attributes(&self) -> &AttributeValues {
        &self.attributes
    }

    /// The context attribute.
    pub fn m2(&self) -> &U256 {
        &self.m2
    }

    pub(crate) fn a(&self) -> &U2048 {
        &self.a
    }

    pub(crate) fn e_signed(&self) -> Signed {
        Signed::from_uint(&self.e).unwrap_or(Signed::ZERO)
    }

    pub(crate) fn v(&self) -> &Signed {
        &self.v
    }
}

/// `∏ R[i]^m_i · Rctxt^m2`.
fn attributes_product(pk: &PublicKeyPrecomputed, attributes: &AttributeValues, m2: &U256) -> Result<ModMonty, Error> {
    let mut result = pk.rctxt.power(&to_signed(m2))?;
    for (name, value) in attributes.iter() {
        result = result * pk.r(name)?.power(&to_signed(value))?;
    }
    Ok(result)
}

pub(crate) fn to_signed(value: &U256) -> Signed {
    // A 256-bit value always fits.
    Signed::from_uint(value).unwrap_or(Signed::ZERO)
}

/// Draws a prime from `[2^596, 2^596 + 2^119)`.
fn random_prime_exponent(rng: &mut impl CryptoRngCore) -> Result<U1024, Error> {
    let start = U1024::ONE.wrapping_shl_vartime(LARGE_E_START);
    for trial in 0..PRIME_SEARCH_TRIALS {
        let offset = U1024::random_bits(rng, LARGE_E_END_RANGE);
        // `start` is even, so only odd offsets can produce a prime.
        let offset = if offset.bit_vartime(0) {
            offset
        } else {
            offset.wrapping_add(&U1024::ONE)
        };
        let candidate = start.wrapping_add(&offset);
        if candidate.is_prime_with_rng(rng) {
            tracing::trace!("Found the prime exponent after {} trials", trial + 1);
            return Ok(candidate);
        }
    }
    tracing::warn!("Prime search exhausted after {PRIME_SEARCH_TRIALS} trials");
    Err(Error::PrimeSearchExhausted(PRIME_SEARCH_TRIALS))
}
