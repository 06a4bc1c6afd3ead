use alloc::collections::BTreeSet;
use alloc::string::String;
use std::sync::{Mutex, MutexGuard};

use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_ff::Field;
use ark_std::UniformRand;
use crypto_bigint::U256;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{
    keys::{AccumulatorPublicKey, AccumulatorSecretKey, RevocationPublicKey, RevocationSecretKey, Tails},
    scalar_from_uint,
    witness::{NonRevocationClaim, RevocationClaimRequest, Witness},
};
use crate::{errors::Error, tools::serde::ArkBytes};

/// A fixed-capacity accumulator of the indices of non-revoked claims.
///
/// Indices run from 1 to `L` inclusive. The accumulated value is `sum of g'_{L + 1 - j}` over `j` in `V`.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Accumulator<E: Pairing> {
    id: String,
    #[serde_as(as = "ArkBytes")]
    acc: E::G2Affine,
    v: BTreeSet<u32>,
    /// Every index handed out so far, revoked ones included.
    issued: BTreeSet<u32>,
    max_claim_num: u32,
    next_index: u32,
}

impl<E: Pairing> Accumulator<E> {
    /// Creates an empty accumulator of capacity `max_claim_num`, along with its public table and keys.
    pub fn new(
        rng: &mut impl CryptoRngCore,
        id: impl Into<String>,
        pk: &RevocationPublicKey<E>,
        max_claim_num: u32,
    ) -> Result<(Self, Tails<E>, AccumulatorPublicKey<E>, AccumulatorSecretKey<E>), Error> {
        if max_claim_num == 0 {
            return Err(Error::InvalidInput("the accumulator capacity must be positive".into()));
        }

        let sk = AccumulatorSecretKey {
            gamma: E::ScalarField::rand(rng),
        };
        let tails = Tails::new(pk, &sk, max_claim_num);
        let z = E::pairing(pk.g, pk.g_dash) * sk.gamma.pow([u64::from(max_claim_num) + 1]);

        let accumulator = Self {
            id: id.into(),
            acc: E::G2Affine::zero(),
            v: BTreeSet::new(),
            issued: BTreeSet::new(),
            max_claim_num,
            next_index: 1,
        };

        tracing::debug!(
            "Created accumulator `{}` with capacity {max_claim_num}",
            accumulator.id
        );

        Ok((accumulator, tails, AccumulatorPublicKey { z }, sk))
    }

    /// The identifier of the accumulator.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The accumulated value.
    pub fn value(&self) -> E::G2Affine {
        self.acc
    }

    /// The indices currently in the accumulator.
    pub fn v(&self) -> &BTreeSet<u32> {
        &self.v
    }

    /// The capacity `L`.
    pub fn max_claim_num(&self) -> u32 {
        self.max_claim_num
    }

    /// Returns `true` once every index has been handed out.
    pub fn is_full(&self) -> bool {
        self.next_index > self.max_claim_num
    }

    /// The index the next claim receives by default.
    pub fn next_index(&self) -> Result<u32, Error> {
        if self.is_full() {
            return Err(Error::AccumulatorFull);
        }
        Ok(self.next_index)
    }

    /// Signs the holder's index and context attribute, and adds the index to the accumulator.
    ///
    /// The index defaults to the next free one.
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        &mut self,
        rng: &mut impl CryptoRngCore,
        pk: &RevocationPublicKey<E>,
        sk: &RevocationSecretKey<E>,
        acc_sk: &AccumulatorSecretKey<E>,
        tails: &Tails<E>,
        request: &RevocationClaimRequest<E>,
        m2: &U256,
        index: Option<u32>,
    ) -> Result<NonRevocationClaim<E>, Error> {
        let i = match index {
            Some(i) => i,
            None => self.next_index()?,
        };
        if i > self.max_claim_num {
            return Err(Error::AccumulatorFull);
        }
        if i == 0 || self.issued.contains(&i) {
            return Err(Error::InvalidInput(format!("index {i} is not available")));
        }

        let gamma_i = acc_sk.gamma.pow([u64::from(i)]);
        let m2 = scalar_from_uint::<E::ScalarField>(m2);
        let c = E::ScalarField::rand(rng);
        let vr_prime_prime = E::ScalarField::rand(rng);
        let g_i = pk.g * gamma_i;

        let sigma_exp = (sk.x + c)
            .inverse()
            .ok_or_else(|| Error::InvalidInput("`x + c` is not invertible".into()))?;
        let sigma = (pk.h1 * m2 + pk.h2 * vr_prime_prime + request.ur + pk.h0 + g_i) * sigma_exp;

        let sigma_i_exp = (sk.sk + gamma_i)
            .inverse()
            .ok_or_else(|| Error::InvalidInput("`sk + gamma^i` is not invertible".into()))?;
        let sigma_i = pk.g_dash * sigma_i_exp;
        let u_i = pk.u * gamma_i;

        let mut omega = E::G2::default();
        for j in self.v.iter() {
            omega += *tails.witness_term(i, *j)?;
        }

        let term = tails.get(u64::from(self.max_claim_num) + 1 - u64::from(i))?;
        self.acc = (self.acc.into_group() + *term).into_affine();
        self.v.insert(i);
        self.issued.insert(i);
        self.next_index = self.next_index.max(i + 1);

        tracing::debug!("Issued a non-revocation claim for index {i} in `{}`", self.id);

        Ok(NonRevocationClaim {
            index: i,
            sigma: sigma.into_affine(),
            c,
            vr_prime_prime,
            m2,
            witness: Witness {
                sigma_i: sigma_i.into_affine(),
                u_i: u_i.into_affine(),
                g_i: g_i.into_affine(),
                omega: omega.into_affine(),
                v: self.v.clone(),
            },
        })
    }

    /// Removes the index from the accumulator.
    pub fn revoke(&mut self, index: u32, tails: &Tails<E>) -> Result<(), Error> {
        if !self.v.contains(&index) {
            return Err(Error::NotFound(format!("index {index} in accumulator `{}`", self.id)));
        }
        let term = tails.get(u64::from(self.max_claim_num) + 1 - u64::from(index))?;
        self.acc = (self.acc.into_group() - *term).into_affine();
        self.v.remove(&index);

        tracing::debug!("Revoked index {index} in `{}`", self.id);
        Ok(())
    }
}

/// An accumulator behind an exclusive lock: issuance, revocation and witness updates are serialized.
#[derive(Debug)]
pub struct SharedAccumulator<E: Pairing> {
    inner: Mutex<Accumulator<E>>,
}

impl<E: Pairing> SharedAccumulator<E> {
    /// Wraps an accumulator.
    pub fn new(accumulator: Accumulator<E>) -> Self {
        Self {
            inner: Mutex::new(accumulator),
        }
    }

    /// Locks the accumulator.
    ///
    /// Returns `Error::MutexPoisoned` if the mutex has been poisoned.
    pub fn lock(&self) -> Result<MutexGuard<'_, Accumulator<E>>, Error> {
        self.inner.lock().map_err(|_| Error::MutexPoisoned)
    }

    /// A consistent copy of the current state.
    pub fn snapshot(&self) -> Result<Accumulator<E>, Error> {
        Ok(self.lock()?.clone())
    }

    /// Removes the index from the accumulator.
    pub fn revoke(&self, index: u32, tails: &Tails<E>) -> Result<(), Error> {
        self.lock()?.revoke(index, tails)
    }

    /// Refreshes a claim's witness while holding the lock.
    pub fn update_witness(&self, claim: &mut NonRevocationClaim<E>, tails: &Tails<E>) -> Result<(), Error> {
        let accumulator = self.lock()?;
        claim.update_witness(&accumulator, tails)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ark_bls12_381::Bls12_381;
    use crypto_bigint::U256;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{Accumulator, SharedAccumulator};
    use crate::{
        errors::Error,
        revocation::{
            AccumulatorPublicKey, AccumulatorSecretKey, NonRevocationClaim, RevocationClaimRequest,
            RevocationPublicKey, RevocationSecretKey, Tails,
        },
    };

    type E = Bls12_381;

    struct Setup {
        pk: RevocationPublicKey<E>,
        sk: RevocationSecretKey<E>,
        accumulator: Accumulator<E>,
        tails: Tails<E>,
        acc_pk: AccumulatorPublicKey<E>,
        acc_sk: AccumulatorSecretKey<E>,
    }

    fn setup(rng: &mut ChaCha8Rng, capacity: u32) -> Setup {
        let (pk, sk) = RevocationPublicKey::<E>::generate(rng);
        let (accumulator, tails, acc_pk, acc_sk) = Accumulator::new(rng, "acc", &pk, capacity).unwrap();
        Setup {
            pk,
            sk,
            accumulator,
            tails,
            acc_pk,
            acc_sk,
        }
    }

    fn issue(rng: &mut ChaCha8Rng, s: &mut Setup) -> NonRevocationClaim<E> {
        let (request, blinding) = RevocationClaimRequest::new(rng, &s.pk);
        let m2 = U256::from_u64(12345);
        let mut claim = s
            .accumulator
            .issue(rng, &s.pk, &s.sk, &s.acc_sk, &s.tails, &request, &m2, None)
            .unwrap();
        claim
            .process(&blinding, &s.pk, &s.acc_pk, &s.accumulator, &s.tails)
            .unwrap();
        claim
    }

    #[test_log::test]
    fn issue_update_and_revoke() {
        let mut rng = ChaCha8Rng::seed_from_u64(51);
        let mut s = setup(&mut rng, 5);

        let mut first = issue(&mut rng, &mut s);
        let mut second = issue(&mut rng, &mut s);
        assert_eq!(first.index(), 1);
        assert_eq!(second.index(), 2);
        assert!(s.accumulator.v().contains(&1) && s.accumulator.v().contains(&2));

        // The first witness predates the second index.
        first.update_witness(&s.accumulator, &s.tails).unwrap();
        assert_eq!(first.witness().v(), s.accumulator.v());

        // Updating against an unchanged accumulator is a no-op.
        let before = first.clone();
        first.update_witness(&s.accumulator, &s.tails).unwrap();
        assert_eq!(first, before);

        s.accumulator.revoke(1, &s.tails).unwrap();
        assert!(!s.accumulator.v().contains(&1));
        assert_eq!(first.update_witness(&s.accumulator, &s.tails), Err(Error::Revoked(1)));

        // The other holder can still synchronize.
        second.update_witness(&s.accumulator, &s.tails).unwrap();
        assert_eq!(second.witness().v(), s.accumulator.v());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut rng = ChaCha8Rng::seed_from_u64(52);
        let mut s = setup(&mut rng, 2);
        issue(&mut rng, &mut s);
        issue(&mut rng, &mut s);
        assert!(s.accumulator.is_full());

        let (request, _blinding) = RevocationClaimRequest::new(&mut rng, &s.pk);
        let result = s
            .accumulator
            .issue(&mut rng, &s.pk, &s.sk, &s.acc_sk, &s.tails, &request, &U256::ONE, None);
        assert_eq!(result.unwrap_err(), Error::AccumulatorFull);
    }

    #[test]
    fn revoked_index_is_never_reissued() {
        let mut rng = ChaCha8Rng::seed_from_u64(56);
        let mut s = setup(&mut rng, 3);
        let mut revoked = issue(&mut rng, &mut s);
        s.accumulator.revoke(1, &s.tails).unwrap();

        let (request, _blinding) = RevocationClaimRequest::new(&mut rng, &s.pk);
        let result = s
            .accumulator
            .issue(&mut rng, &s.pk, &s.sk, &s.acc_sk, &s.tails, &request, &U256::ONE, Some(1));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!s.accumulator.v().contains(&1));

        // Later issuances do not bring the revoked holder back either.
        let other = issue(&mut rng, &mut s);
        assert_eq!(other.index(), 2);
        assert_eq!(revoked.update_witness(&s.accumulator, &s.tails), Err(Error::Revoked(1)));

        // An explicit, never used index is still accepted.
        let (request, _blinding) = RevocationClaimRequest::new(&mut rng, &s.pk);
        let claim = s
            .accumulator
            .issue(&mut rng, &s.pk, &s.sk, &s.acc_sk, &s.tails, &request, &U256::ONE, Some(3))
            .unwrap();
        assert_eq!(claim.index(), 3);
    }

    #[test]
    fn revoking_an_absent_index_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(53);
        let mut s = setup(&mut rng, 3);
        assert!(s.accumulator.revoke(1, &s.tails).is_err());
    }

    #[test]
    fn corrupted_claim_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(54);
        let mut s = setup(&mut rng, 3);
        let (request, blinding) = RevocationClaimRequest::new(&mut rng, &s.pk);
        let mut claim = s
            .accumulator
            .issue(&mut rng, &s.pk, &s.sk, &s.acc_sk, &s.tails, &request, &U256::ONE, None)
            .unwrap();
        claim.m2 += claim.c;
        assert!(matches!(
            claim.process(&blinding, &s.pk, &s.acc_pk, &s.accumulator, &s.tails),
            Err(Error::IncorrectIssuerData(_))
        ));
    }

    #[test]
    fn shared_accumulator_serializes_writers() {
        let mut rng = ChaCha8Rng::seed_from_u64(55);
        let s = setup(&mut rng, 8);
        let shared = Arc::new(SharedAccumulator::new(s.accumulator.clone()));
        let pk = Arc::new(s.pk);
        let sk = Arc::new(s.sk);
        let acc_sk = Arc::new(s.acc_sk);
        let tails = Arc::new(s.tails);

        let handles = (0..4u64)
            .map(|seed| {
                let shared = shared.clone();
                let (pk, sk, acc_sk, tails) = (pk.clone(), sk.clone(), acc_sk.clone(), tails.clone());
                std::thread::spawn(move || {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    let (request, _blinding) = RevocationClaimRequest::new(&mut rng, &pk);
                    let mut accumulator = shared.lock().unwrap();
                    accumulator
                        .issue(&mut rng, &pk, &sk, &acc_sk, &tails, &request, &U256::ONE, None)
                        .unwrap()
                        .index()
                })
            })
            .collect::<Vec<_>>();
        let mut indices = handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>();
        indices.sort();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(shared.snapshot().unwrap().v().len(), 4);
    }
}
