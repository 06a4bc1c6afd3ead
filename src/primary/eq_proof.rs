//! Proof of knowledge of a primary signature with selective disclosure.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use crypto_bigint::{U2048, U256};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{
    claim::{to_signed, MasterSecret, PrimaryClaim},
    keys::PublicKeyPrecomputed,
};
use crate::{
    errors::Error,
    params::{LARGE_E_START, LARGE_ETILDE, LARGE_MTILDE, LARGE_VPRIME, LARGE_VTILDE},
    tools::serde::Decimal,
    uint::{invert, minimal_be_bytes, Exponentiable, ModMonty, Signed},
};

/// The prover's state between the commitment and the response.
#[derive(Debug, Clone)]
pub(crate) struct EqProofInit {
    a_prime: U2048,
    t: U2048,
    e_prime: Signed,
    v_prime: Signed,
    e_tilde: Signed,
    v_tilde: Signed,
    m_tilde: BTreeMap<String, Signed>,
    m1_tilde: Signed,
    m2_tilde: Signed,
    hidden: BTreeMap<String, Signed>,
    revealed: BTreeMap<String, U256>,
    m2: Signed,
}

impl EqProofInit {
    /// Rerandomizes the signature and commits to fresh blindings of every hidden value.
    pub fn new(
        rng: &mut impl CryptoRngCore,
        pk: &PublicKeyPrecomputed,
        claim: &PrimaryClaim,
        revealed_names: &BTreeSet<String>,
    ) -> Result<Self, Error> {
        let mut hidden = BTreeMap::new();
        let mut revealed = BTreeMap::new();
        for (name, value) in claim.attributes().iter() {
            if revealed_names.contains(name) {
                revealed.insert(name.clone(), *value);
            } else {
                hidden.insert(name.clone(), to_signed(value));
            }
        }
        if let Some(unknown) = revealed_names.iter().find(|name| !revealed.contains_key(*name)) {
            return Err(Error::InvalidInput(format!("the claim has no attribute `{unknown}`")));
        }

        let r_a = Signed::random_bits(rng, LARGE_VPRIME);
        let a_prime = pk.group.element(claim.a()) * pk.s.power(&r_a)?;
        let e = claim.e_signed();
        let v_prime = claim.v().sub(&e.mul(&r_a));
        let e_prime = e.sub(&Signed::power_of_two(LARGE_E_START));

        let e_tilde = Signed::random_bits(rng, LARGE_ETILDE);
        let v_tilde = Signed::random_bits(rng, LARGE_VTILDE);
        let m_tilde = hidden
            .keys()
            .map(|name| (name.clone(), Signed::random_bits(rng, LARGE_MTILDE)))
            .collect::<BTreeMap<_, _>>();
        let m1_tilde = Signed::random_bits(rng, LARGE_MTILDE);
        let m2_tilde = Signed::random_bits(rng, LARGE_MTILDE);

        let t = commitment(pk, &a_prime, &e_tilde, &m_tilde, &m1_tilde, &m2_tilde, &v_tilde)?;

        Ok(Self {
            a_prime: a_prime.retrieve(),
            t: t.retrieve(),
            e_prime,
            v_prime,
            e_tilde,
            v_tilde,
            m_tilde,
            m1_tilde,
            m2_tilde,
            hidden,
            revealed,
            m2: to_signed(claim.m2()),
        })
    }

    /// The blinding of a hidden attribute, shared with the predicate proofs on it.
    pub fn m_tilde(&self, attr: &str) -> Option<&Signed> {
        self.m_tilde.get(attr)
    }

    /// The blinding of the context attribute, shared with the non-revocation proof.
    pub fn m2_tilde(&self) -> &Signed {
        &self.m2_tilde
    }

    pub fn tau_list(&self) -> Vec<Vec<u8>> {
        vec![minimal_be_bytes(&self.t)]
    }

    pub fn c_list(&self) -> Vec<Vec<u8>> {
        vec![minimal_be_bytes(&self.a_prime)]
    }

    pub fn finalize(self, challenge: &Signed, ms: &MasterSecret) -> EqProof {
        let m = self
            .m_tilde
            .iter()
            .filter_map(|(name, tilde)| {
                self.hidden
                    .get(name)
                    .map(|value| (name.clone(), tilde.mul_add(challenge, value)))
            })
            .collect();

        EqProof {
            revealed: self.revealed,
            a_prime: self.a_prime,
            e: self.e_tilde.mul_add(challenge, &self.e_prime),
            v: self.v_tilde.mul_add(challenge, &self.v_prime),
            m,
            m1: self.m1_tilde.mul_add(challenge, &ms.to_signed()),
            m2: self.m2_tilde.mul_add(challenge, &self.m2),
        }
    }
}

/// `A'^e · ∏ R[i]^m_i · Rms^m1 · Rctxt^m2 · S^v` over the hidden attributes.
fn commitment(
    pk: &PublicKeyPrecomputed,
    a_prime: &ModMonty,
    e: &Signed,
    m: &BTreeMap<String, Signed>,
    m1: &Signed,
    m2: &Signed,
    v: &Signed,
) -> Result<ModMonty, Error> {
    let mut result = a_prime.power(e)? * pk.rms.power(m1)? * pk.rctxt.power(m2)? * pk.s.power(v)?;
    for (name, value) in m.iter() {
        result = result * pk.r(name)?.power(value)?;
    }
    Ok(result)
}

/// Proof of possession of a primary claim, disclosing the revealed attributes.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqProof {
    #[serde_as(as = "BTreeMap<_, Decimal>")]
    revealed: BTreeMap<String, U256>,
    #[serde_as(as = "Decimal")]
    a_prime: U2048,
    #[serde_as(as = "Decimal")]
    e: Signed,
    #[serde_as(as = "Decimal")]
    v: Signed,
    #[serde_as(as = "BTreeMap<_, Decimal>")]
    m: BTreeMap<String, Signed>,
    #[serde_as(as = "Decimal")]
    m1: Signed,
    #[serde_as(as = "Decimal")]
    m2: Signed,
}

impl EqProof {
    /// The disclosed attribute values.
    pub fn revealed(&self) -> &BTreeMap<String, U256> {
        &self.revealed
    }

    /// The response for a hidden attribute.
    pub(crate) fn m(&self, attr: &str) -> Option<&Signed> {
        self.m.get(attr)
    }

    /// The response for the context attribute.
    pub(crate) fn m2(&self) -> &Signed {
        &self.m2
    }

    /// The blinded values `[A']` hashed into the challenge.
    pub fn c_list(&self) -> Vec<Vec<u8>> {
        vec![minimal_be_bytes(&self.a_prime)]
    }

    /// Recomputes the commitment `T` from the responses.
    ///
    /// Fails if the disclosed and hidden attributes do not partition the attributes of the key.
    pub(crate) fn tau_list(&self, pk: &PublicKeyPrecomputed, challenge: &Signed) -> Result<Vec<Vec<u8>>, Error> {
        let names = pk.r.keys().collect::<BTreeSet<_>>();
        let proven = self.revealed.keys().chain(self.m.keys()).collect::<BTreeSet<_>>();
        if names != proven || self.revealed.keys().any(|name| self.m.contains_key(name)) {
            return Err(Error::InvalidInput(
                "the proof does not cover the attributes of the public key".into(),
            ));
        }

        let a_prime = pk.group.element(&self.a_prime);
        let t1 = commitment(pk, &a_prime, &self.e, &self.m, &self.m1, &self.m2, &self.v)?;

        let mut revealed_product = a_prime.power(&Signed::power_of_two(LARGE_E_START))?;
        for (name, value) in self.revealed.iter() {
            revealed_product = revealed_product * pk.r(name)?.power(&to_signed(value))?;
        }
        let t2 = (pk.z * invert(&revealed_product)?).power(&challenge.neg())?;

        Ok(vec![minimal_be_bytes(&(t1 * t2).retrieve())])
    }
}
