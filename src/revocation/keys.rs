use alloc::vec::Vec;

use ark_ec::{pairing::Pairing, pairing::PairingOutput, AffineRepr, CurveGroup};
use ark_ff::Field;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::UniformRand;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{errors::Error, tools::serde::ArkBytes};

/// The issuer's public key for non-revocation claims.
///
/// Elements named after the `G1` side of the pairing (`g`, `h*`, `pk`) live in `G1`,
/// the rest (`g_dash`, `h_cap`, `u`, `y`) in `G2`.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RevocationPublicKey<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    pub(crate) g: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) g_dash: E::G2Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) h: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) h0: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) h1: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) h2: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) htilde: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) h_cap: E::G2Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) u: E::G2Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) pk: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) y: E::G2Affine,
}

/// The issuer's secret key for non-revocation claims.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RevocationSecretKey<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    pub(crate) x: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    pub(crate) sk: E::ScalarField,
}

impl<E: Pairing> core::fmt::Debug for RevocationSecretKey<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("RevocationSecretKey { .. }")
    }
}

impl<E: Pairing> RevocationPublicKey<E> {
    /// Draws a fresh revocation key pair.
    pub fn generate(rng: &mut impl CryptoRngCore) -> (Self, RevocationSecretKey<E>) {
        let g = E::G1::rand(rng);
        let h_cap = E::G2::rand(rng);
        let x = E::ScalarField::rand(rng);
        let sk = E::ScalarField::rand(rng);

        let g1 = E::G1::normalize_batch(&[
            g,
            E::G1::rand(rng),
            E::G1::rand(rng),
            E::G1::rand(rng),
            E::G1::rand(rng),
            E::G1::rand(rng),
            g * sk,
        ]);
        let g2 = E::G2::normalize_batch(&[E::G2::rand(rng), h_cap, E::G2::rand(rng), h_cap * x]);

        let [g, h, h0, h1, h2, htilde, pk] = <[E::G1Affine; 7]>::try_from(g1).unwrap_or([E::G1Affine::zero(); 7]);
        let [g_dash, h_cap, u, y] = <[E::G2Affine; 4]>::try_from(g2).unwrap_or([E::G2Affine::zero(); 4]);

        tracing::debug!("Generated a revocation key pair");

        (
            Self {
                g,
                g_dash,
                h,
                h0,
                h1,
                h2,
                htilde,
                h_cap,
                u,
                pk,
                y,
            },
            RevocationSecretKey { x, sk },
        )
    }
}

/// The public value `z = e(g, g')^(gamma^(L+1))` of an accumulator.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AccumulatorPublicKey<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    pub(crate) z: PairingOutput<E>,
}

/// The accumulator trapdoor `gamma`.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AccumulatorSecretKey<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    pub(crate) gamma: E::ScalarField,
}

impl<E: Pairing> core::fmt::Debug for AccumulatorSecretKey<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AccumulatorSecretKey { .. }")
    }
}

/// The public table `g'_j = g' * gamma^j` for `j` in `[0, 2L]`.
///
/// The entry `L + 1` is never published; it is stored as the identity and cannot be read.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Tails<E: Pairing> {
    max_claim_num: u32,
    #[serde_as(as = "Vec<ArkBytes>")]
    points: Vec<E::G2Affine>,
}

impl<E: Pairing> Tails<E> {
    pub(crate) fn new(pk: &RevocationPublicKey<E>, sk: &AccumulatorSecretKey<E>, max_claim_num: u32) -> Self {
        let blank = u64::from(max_claim_num) + 1;
        let mut power = E::ScalarField::ONE;
        let mut points = Vec::with_capacity(2 * max_claim_num as usize + 1);
        for j in 0..=2 * u64::from(max_claim_num) {
            if j == blank {
                points.push(E::G2::default());
            } else {
                points.push(pk.g_dash * power);
            }
            power *= sk.gamma;
        }
        Self {
            max_claim_num,
            points: E::G2::normalize_batch(&points),
        }
    }

    /// The capacity `L` of the accumulator the table belongs to.
    pub fn max_claim_num(&self) -> u32 {
        self.max_claim_num
    }

    /// Returns `g'_j`.
    pub fn get(&self, index: u64) -> Result<&E::G2Affine, Error> {
        if index == u64::from(self.max_claim_num) + 1 {
            return Err(Error::InvalidInput("the tail at index L + 1 is withheld".into()));
        }
        usize::try_from(index)
            .ok()
            .and_then(|index| self.points.get(index))
            .ok_or_else(|| Error::NotFound(format!("tail {index}")))
    }

    /// `g'_{L + 1 - j + i}`, the term index `j` contributes to the witness of index `i`.
    pub(crate) fn witness_term(&self, i: u32, j: u32) -> Result<&E::G2Affine, Error> {
        let index = (u64::from(self.max_claim_num) + 1 + u64::from(i))
            .checked_sub(u64::from(j))
            .ok_or_else(|| Error::InvalidInput(format!("index {j} is out of range")))?;
        self.get(index)
    }
}

#[cfg(test)]
mod tests {
    use ark_bls12_381::Bls12_381;
    use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
    use ark_std::UniformRand;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{AccumulatorSecretKey, RevocationPublicKey, Tails};

    type E = Bls12_381;

    #[test]
    fn key_relations() {
        let mut rng = ChaCha8Rng::seed_from_u64(41);
        let (pk, sk) = RevocationPublicKey::<E>::generate(&mut rng);
        assert_eq!((pk.g * sk.sk).into_affine(), pk.pk);
        assert_eq!((pk.h_cap * sk.x).into_affine(), pk.y);
        assert_ne!(pk.h0, pk.h1);
    }

    #[test]
    fn tails_withhold_the_blank_index() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let (pk, _sk) = RevocationPublicKey::<E>::generate(&mut rng);
        let gamma = <E as Pairing>::ScalarField::rand(&mut rng);
        let acc_sk = AccumulatorSecretKey::<E> { gamma };
        let tails = Tails::new(&pk, &acc_sk, 5);

        assert_eq!(tails.get(0).unwrap(), &pk.g_dash);
        assert_eq!(*tails.get(2).unwrap(), (pk.g_dash * (gamma * gamma)).into_affine());
        assert!(tails.get(6).is_err());
        assert!(!tails.get(10).unwrap().is_zero());
        assert!(tails.get(11).is_err());
        assert!(tails.witness_term(5, 5).is_err());
        assert!(tails.witness_term(2, 3).is_ok());
    }
}
