//! Proof that a hidden attribute is greater or equal to a public threshold.

use alloc::vec::Vec;

use crypto_bigint::{U2048, U256};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{claim::to_signed, four_squares::four_squares, keys::PublicKeyPrecomputed};
use crate::{
    attributes::Predicate,
    errors::Error,
    params::{LARGE_ALPHATILDE, LARGE_RTILDE, LARGE_UTILDE, LARGE_VPRIME},
    tools::serde::Decimal,
    uint::{minimal_be_bytes, Exponentiable, ModMonty, Signed},
};

/// The prover's state between the commitment and the response.
#[derive(Debug, Clone)]
pub(crate) struct GeProofInit {
    predicate: Predicate,
    mj: Signed,
    mj_tilde: Signed,
    u: [Signed; 4],
    r: [Signed; 4],
    r_delta: Signed,
    alpha: Signed,
    u_tilde: [Signed; 4],
    r_tilde: [Signed; 4],
    r_delta_tilde: Signed,
    alpha_tilde: Signed,
    t: [U2048; 4],
    t_delta: U2048,
    tau: Vec<U2048>,
}

impl GeProofInit {
    /// Commits to a four-square decomposition of `value - predicate.value`.
    ///
    /// `mj_tilde` is the blinding the equality proof uses for the same attribute.
    pub fn new(
        rng: &mut impl CryptoRngCore,
        pk: &PublicKeyPrecomputed,
        predicate: &Predicate,
        value: &U256,
        mj_tilde: &Signed,
    ) -> Result<Self, Error> {
        let mj = to_signed(value);
        let delta = mj.sub(&to_signed(&predicate.value));
        if delta.is_negative() {
            return Err(Error::PredicateNotSatisfied(predicate.to_string()));
        }
        let u = four_squares(rng, &delta)?;

        let r: [Signed; 4] = core::array::from_fn(|_| Signed::random_bits(rng, LARGE_VPRIME));
        let r_delta = Signed::random_bits(rng, LARGE_VPRIME);
        let cross_term = u
            .iter()
            .zip(r.iter())
            .fold(Signed::ZERO, |acc, (u_i, r_i)| acc.mul_add(u_i, r_i));
        let alpha = r_delta.sub(&cross_term);

        let mut t_mont = Vec::with_capacity(4);
        for (u_i, r_i) in u.iter().zip(r.iter()) {
            t_mont.push(pk.z.power(u_i)? * pk.s.power(r_i)?);
        }
        let t_delta = pk.z.power(&delta)? * pk.s.power(&r_delta)?;

        let u_tilde: [Signed; 4] = core::array::from_fn(|_| Signed::random_bits(rng, LARGE_UTILDE));
        let r_tilde: [Signed; 4] = core::array::from_fn(|_| Signed::random_bits(rng, LARGE_RTILDE));
        let r_delta_tilde = Signed::random_bits(rng, LARGE_RTILDE);
        let alpha_tilde = Signed::random_bits(rng, LARGE_ALPHATILDE);

        let tau = tau_values(pk, &t_mont, &u_tilde, &r_tilde, mj_tilde, &r_delta_tilde, &alpha_tilde)?;

        let mut t = [U2048::ZERO; 4];
        for (dst, src) in t.iter_mut().zip(t_mont.iter()) {
            *dst = src.retrieve();
        }

        tracing::debug!("Committed to the predicate `{predicate}`");

        Ok(Self {
            predicate: predicate.clone(),
            mj,
            mj_tilde: *mj_tilde,
            u,
            r,
            r_delta,
            alpha,
            u_tilde,
            r_tilde,
            r_delta_tilde,
            alpha_tilde,
            t,
            t_delta: t_delta.retrieve(),
            tau: tau.iter().map(|value| value.retrieve()).collect(),
        })
    }

    pub fn tau_list(&self) -> Vec<Vec<u8>> {
        self.tau.iter().map(minimal_be_bytes).collect()
    }

    pub fn c_list(&self) -> Vec<Vec<u8>> {
        c_list(&self.t, &self.t_delta)
    }

    pub fn finalize(self, challenge: &Signed) -> GeProof {
        let respond = |tilde: &[Signed; 4], secret: &[Signed; 4]| -> [Signed; 4] {
            let mut result = [Signed::ZERO; 4];
            for ((dst, tilde), secret) in result.iter_mut().zip(tilde.iter()).zip(secret.iter()) {
                *dst = tilde.mul_add(challenge, secret);
            }
            result
        };

        GeProof {
            u: respond(&self.u_tilde, &self.u),
            r: respond(&self.r_tilde, &self.r),
            r_delta: self.r_delta_tilde.mul_add(challenge, &self.r_delta),
            alpha: self.alpha_tilde.mul_add(challenge, &self.alpha),
            mj: self.mj_tilde.mul_add(challenge, &self.mj),
            t: self.t,
            t_delta: self.t_delta,
            predicate: self.predicate,
        }
    }
}

/// `[Z^u_i · S^r_i (4 times), Z^mj · S^r_delta, ∏ T_i^u_i · S^alpha]`.
fn tau_values(
    pk: &PublicKeyPrecomputed,
    t: &[ModMonty],
    u: &[Signed; 4],
    r: &[Signed; 4],
    mj: &Signed,
    r_delta: &Signed,
    alpha: &Signed,
) -> Result<Vec<ModMonty>, Error> {
    let mut tau = Vec::with_capacity(6);
    for (u_i, r_i) in u.iter().zip(r.iter()) {
        tau.push(pk.z.power(u_i)? * pk.s.power(r_i)?);
    }
    tau.push(pk.z.power(mj)? * pk.s.power(r_delta)?);

    let mut q = pk.s.power(alpha)?;
    for (t_i, u_i) in t.iter().zip(u.iter()) {
        q = q * t_i.power(u_i)?;
    }
    tau.push(q);
    Ok(tau)
}

fn c_list(t: &[U2048; 4], t_delta: &U2048) -> Vec<Vec<u8>> {
    t.iter().chain(core::iter::once(t_delta)).map(minimal_be_bytes).collect()
}

/// Proof that a hidden attribute satisfies a [`Predicate`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeProof {
    #[serde_as(as = "[Decimal; 4]")]
    u: [Signed; 4],
    #[serde_as(as = "[Decimal; 4]")]
    r: [Signed; 4],
    #[serde_as(as = "Decimal")]
    r_delta: Signed,
    #[serde_as(as = "Decimal")]
    alpha: Signed,
    #[serde_as(as = "Decimal")]
    mj: Signed,
    #[serde_as(as = "[Decimal; 4]")]
    t: [U2048; 4],
    #[serde_as(as = "Decimal")]
    t_delta: U2048,
    predicate: Predicate,
}

impl GeProof {
    /// The predicate this proof is about.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// The response for the attribute, equal to the equality proof's response for it.
    pub(crate) fn mj(&self) -> &Signed {
        &self.mj
    }

    /// The blinded values `[T1..T4, T_delta]` hashed into the challenge.
    pub fn c_list(&self) -> Vec<Vec<u8>> {
        c_list(&self.t, &self.t_delta)
    }

    /// Recomputes the commitments from the responses, substituting the public threshold.
    pub(crate) fn tau_list(&self, pk: &PublicKeyPrecomputed, challenge: &Signed) -> Result<Vec<Vec<u8>>, Error> {
        let t = self.t.iter().map(|t_i| pk.group.element(t_i)).collect::<Vec<_>>();
        let t_delta = pk.group.element(&self.t_delta);
        let mut tau = tau_values(pk, &t, &self.u, &self.r, &self.mj, &self.r_delta, &self.alpha)?;

        let minus_c = challenge.neg();
        let mut tau_iter = tau.iter_mut();
        for (tau_i, t_i) in tau_iter.by_ref().zip(t.iter()) {
            *tau_i = *tau_i * t_i.power(&minus_c)?;
        }
        let threshold = pk.z.power(&to_signed(&self.predicate.value))?;
        if let Some(tau_delta) = tau_iter.next() {
            *tau_delta = *tau_delta * (t_delta * threshold).power(&minus_c)?;
        }
        if let Some(q) = tau_iter.next() {
            *q = *q * t_delta.power(&minus_c)?;
        }

        Ok(tau.iter().map(|value| minimal_be_bytes(&value.retrieve())).collect())
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;

    use crypto_bigint::U256;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::GeProofInit;
    use crate::{
        attributes::Predicate,
        errors::Error,
        primary::PrimaryPublicKey,
        test_utils::test_secret_key,
        uint::Signed,
    };

    fn public_key(rng: &mut ChaCha8Rng) -> PrimaryPublicKey {
        let names = BTreeSet::from(["age".to_string()]);
        PrimaryPublicKey::new(rng, &test_secret_key(1), &names).unwrap()
    }

    #[test_log::test]
    fn commitments_are_reproduced() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let pk = public_key(&mut rng).to_precomputed().unwrap();
        let predicate = Predicate::ge("age", 18);
        let mj_tilde = Signed::random_bits(&mut rng, 593);

        let init = GeProofInit::new(&mut rng, &pk, &predicate, &U256::from_u64(25), &mj_tilde).unwrap();
        let tau = init.tau_list();
        let c_list = init.c_list();
        let challenge = Signed::random_bits(&mut rng, 256);
        let proof = init.finalize(&challenge);

        assert_eq!(proof.c_list(), c_list);
        assert_eq!(proof.tau_list(&pk, &challenge).unwrap(), tau);
        assert_eq!(proof.predicate(), &predicate);
    }

    #[test]
    fn boundary_value_is_accepted() {
        let mut rng = ChaCha8Rng::seed_from_u64(32);
        let pk = public_key(&mut rng).to_precomputed().unwrap();
        let predicate = Predicate::ge("age", 25);
        let mj_tilde = Signed::random_bits(&mut rng, 593);
        let init = GeProofInit::new(&mut rng, &pk, &predicate, &U256::from_u64(25), &mj_tilde).unwrap();
        let tau = init.tau_list();
        let challenge = Signed::random_bits(&mut rng, 256);
        assert_eq!(init.finalize(&challenge).tau_list(&pk, &challenge).unwrap(), tau);
    }

    #[test]
    fn other_threshold_does_not_verify() {
        let mut rng = ChaCha8Rng::seed_from_u64(33);
        let pk = public_key(&mut rng).to_precomputed().unwrap();
        let mj_tilde = Signed::random_bits(&mut rng, 593);
        let init = GeProofInit::new(&mut rng, &pk, &Predicate::ge("age", 18), &U256::from_u64(25), &mj_tilde).unwrap();
        let tau = init.tau_list();
        let challenge = Signed::random_bits(&mut rng, 256);
        let mut proof = init.finalize(&challenge);
        proof.predicate = Predicate::ge("age", 20);
        assert_ne!(proof.tau_list(&pk, &challenge).unwrap(), tau);
    }

    #[test]
    fn unsatisfied_predicate() {
        let mut rng = ChaCha8Rng::seed_from_u64(34);
        let pk = public_key(&mut rng).to_precomputed().unwrap();
        let mj_tilde = Signed::random_bits(&mut rng, 593);
        let result = GeProofInit::new(&mut rng, &pk, &Predicate::ge("age", 30), &U256::from_u64(25), &mj_tilde);
        assert_eq!(
            result.unwrap_err(),
            Error::PredicateNotSatisfied("age >= 30".into())
        );
    }
}
