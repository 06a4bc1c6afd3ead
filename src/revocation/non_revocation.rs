//! Zero-knowledge proof that a claim's index is still in the accumulator.

use alloc::vec::Vec;

use ark_ec::{
    pairing::{Pairing, PairingOutput},
    AffineRepr, CurveGroup,
};
use ark_std::UniformRand;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{
    accumulator::Accumulator,
    keys::{AccumulatorPublicKey, RevocationPublicKey},
    scalar_from_signed,
    witness::NonRevocationClaim,
};
use crate::{
    tools::serde::{ark_to_bytes, ArkBytes},
    uint::Signed,
};

/// The secrets of the proof, or their blindings, or the responses.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct XList<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    rho: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    r: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    r_prime: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    r_prime_prime: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    r_prime_prime_prime: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    o: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    o_prime: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    m: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    m_prime: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    t: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    t_prime: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    m2: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    s: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    c: E::ScalarField,
}

impl<E: Pairing> XList<E> {
    fn random(rng: &mut impl CryptoRngCore, m2: E::ScalarField) -> Self {
        let mut draw = || E::ScalarField::rand(rng);
        Self {
            rho: draw(),
            r: draw(),
            r_prime: draw(),
            r_prime_prime: draw(),
            r_prime_prime_prime: draw(),
            o: draw(),
            o_prime: draw(),
            m: draw(),
            m_prime: draw(),
            t: draw(),
            t_prime: draw(),
            m2,
            s: draw(),
            c: draw(),
        }
    }

    /// `self + challenge * secret`, element-wise.
    fn respond(&self, challenge: &E::ScalarField, secret: &Self) -> Self {
        let f = |tilde: E::ScalarField, x: E::ScalarField| tilde + *challenge * x;
        Self {
            rho: f(self.rho, secret.rho),
            r: f(self.r, secret.r),
            r_prime: f(self.r_prime, secret.r_prime),
            r_prime_prime: f(self.r_prime_prime, secret.r_prime_prime),
            r_prime_prime_prime: f(self.r_prime_prime_prime, secret.r_prime_prime_prime),
            o: f(self.o, secret.o),
            o_prime: f(self.o_prime, secret.o_prime),
            m: f(self.m, secret.m),
            m_prime: f(self.m_prime, secret.m_prime),
            t: f(self.t, secret.t),
            t_prime: f(self.t_prime, secret.t_prime),
            m2: f(self.m2, secret.m2),
            s: f(self.s, secret.s),
            c: f(self.c, secret.c),
        }
    }
}

/// Blinded forms of the claim and witness elements.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct CList<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    e: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    d: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    a: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    g: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    w: E::G2Affine,
    #[serde_as(as = "ArkBytes")]
    s: E::G2Affine,
    #[serde_as(as = "ArkBytes")]
    u: E::G2Affine,
}

impl<E: Pairing> CList<E> {
    fn to_bytes(&self) -> Vec<Vec<u8>> {
        vec![
            ark_to_bytes(&self.e),
            ark_to_bytes(&self.d),
            ark_to_bytes(&self.a),
            ark_to_bytes(&self.g),
            ark_to_bytes(&self.w),
            ark_to_bytes(&self.s),
            ark_to_bytes(&self.u),
        ]
    }
}

/// The eight commitments `T1..T8`.
struct TauList<E: Pairing> {
    t1: E::G1,
    t2: E::G1,
    t3: PairingOutput<E>,
    t4: PairingOutput<E>,
    t5: E::G1,
    t6: E::G1,
    t7: PairingOutput<E>,
    t8: PairingOutput<E>,
}

impl<E: Pairing> TauList<E> {
    /// Evaluates the commitments on `x`. Each one is linear in `x`.
    fn new(pk: &RevocationPublicKey<E>, acc: &E::G2Affine, c_list: &CList<E>, x: &XList<E>) -> Self {
        let htilde_hcap = E::pairing(pk.htilde, pk.h_cap);
        let g_hcap = E::pairing(pk.g, pk.h_cap);

        let t1 = pk.h * x.rho + pk.htilde * x.o;
        let t2 = c_list.e * x.c - pk.h * x.m - pk.htilde * x.t;
        let t3 = E::pairing(c_list.a, pk.h_cap) * x.c + htilde_hcap * (x.r - x.m)
            - E::pairing(pk.htilde, pk.y) * x.rho
            - E::pairing(pk.h1, pk.h_cap) * x.m2
            - E::pairing(pk.h2, pk.h_cap) * x.s;
        let t4 = E::pairing(pk.htilde, *acc) * x.r - g_hcap * x.r_prime;
        let t5 = pk.g * x.r + pk.htilde * x.o_prime;
        let t6 = c_list.d * x.r_prime_prime - pk.g * x.m_prime - pk.htilde * x.t_prime;
        let t7 = E::pairing(pk.pk.into_group() + c_list.g, pk.h_cap) * x.r_prime_prime - htilde_hcap * x.m_prime
            + E::pairing(pk.htilde, c_list.s) * x.r;
        let t8 = E::pairing(pk.htilde, pk.u) * x.r - g_hcap * x.r_prime_prime_prime;

        Self {
            t1,
            t2,
            t3,
            t4,
            t5,
            t6,
            t7,
            t8,
        }
    }

    /// The values the commitments take on the actual secrets.
    fn expected(
        pk: &RevocationPublicKey<E>,
        acc: &E::G2Affine,
        acc_pk: &AccumulatorPublicKey<E>,
        c_list: &CList<E>,
    ) -> Self {
        Self {
            t1: c_list.e.into_group(),
            t2: E::G1::default(),
            t3: E::pairing(pk.h0.into_group() + c_list.g, pk.h_cap) - E::pairing(c_list.a, pk.y),
            t4: E::pairing(c_list.g, *acc) - E::pairing(pk.g, c_list.w) - acc_pk.z,
            t5: c_list.d.into_group(),
            t6: E::G1::default(),
            t7: E::pairing(pk.pk.into_group() + c_list.g, c_list.s) - E::pairing(pk.g, pk.g_dash),
            t8: E::pairing(c_list.g, pk.u) - E::pairing(pk.g, c_list.u),
        }
    }

    /// `self - challenge * other`, element-wise.
    fn sub_scaled(self, challenge: &E::ScalarField, other: &Self) -> Self {
        Self {
            t1: self.t1 - other.t1 * *challenge,
            t2: self.t2 - other.t2 * *challenge,
            t3: self.t3 - other.t3 * *challenge,
            t4: self.t4 - other.t4 * *challenge,
            t5: self.t5 - other.t5 * *challenge,
            t6: self.t6 - other.t6 * *challenge,
            t7: self.t7 - other.t7 * *challenge,
            t8: self.t8 - other.t8 * *challenge,
        }
    }

    fn to_bytes(&self) -> Vec<Vec<u8>> {
        vec![
            ark_to_bytes(&self.t1.into_affine()),
            ark_to_bytes(&self.t2.into_affine()),
            ark_to_bytes(&self.t3),
            ark_to_bytes(&self.t4),
            ark_to_bytes(&self.t5.into_affine()),
            ark_to_bytes(&self.t6.into_affine()),
            ark_to_bytes(&self.t7),
            ark_to_bytes(&self.t8),
        ]
    }
}

/// The prover's state between the commitment and the response.
pub(crate) struct NonRevocProofInit<E: Pairing> {
    c_list: CList<E>,
    x: XList<E>,
    x_tilde: XList<E>,
    tau: Vec<Vec<u8>>,
}

impl<E: Pairing> NonRevocProofInit<E> {
    /// Blinds the claim and witness, and commits.
    ///
    /// `m2_tilde` is the blinding the equality proof uses for the context attribute.
    pub fn new(
        rng: &mut impl CryptoRngCore,
        pk: &RevocationPublicKey<E>,
        accumulator: &Accumulator<E>,
        claim: &NonRevocationClaim<E>,
        m2_tilde: &Signed,
    ) -> Self {
        let witness = claim.witness();
        let mut draw = || E::ScalarField::rand(rng);
        let (rho, r, r_prime, r_prime_prime, r_prime_prime_prime, o, o_prime) =
            (draw(), draw(), draw(), draw(), draw(), draw(), draw());

        let e = pk.h * rho + pk.htilde * o;
        let d = pk.g * r + pk.htilde * o_prime;
        let a = pk.htilde * rho + claim.sigma;
        let g = pk.htilde * r + witness.g_i;
        let w = pk.h_cap * r_prime + witness.omega;
        let s = pk.h_cap * r_prime_prime + witness.sigma_i;
        let u = pk.h_cap * r_prime_prime_prime + witness.u_i;

        let g1 = E::G1::normalize_batch(&[e, d, a, g]);
        let g2 = E::G2::normalize_batch(&[w, s, u]);
        let [e, d, a, g] = <[E::G1Affine; 4]>::try_from(g1).unwrap_or([E::G1Affine::zero(); 4]);
        let [w, s, u] = <[E::G2Affine; 3]>::try_from(g2).unwrap_or([E::G2Affine::zero(); 3]);
        let c_list = CList { e, d, a, g, w, s, u };

        let x = XList {
            rho,
            r,
            r_prime,
            r_prime_prime,
            r_prime_prime_prime,
            o,
            o_prime,
            m: rho * claim.c,
            m_prime: r * r_prime_prime,
            t: o * claim.c,
            t_prime: o_prime * r_prime_prime,
            m2: claim.m2,
            s: claim.vr_prime_prime,
            c: claim.c,
        };
        let x_tilde = XList::random(rng, scalar_from_signed(m2_tilde));
        let tau = TauList::new(pk, &accumulator.value(), &c_list, &x_tilde).to_bytes();

        Self {
            c_list,
            x,
            x_tilde,
            tau,
        }
    }

    pub fn tau_list(&self) -> Vec<Vec<u8>> {
        self.tau.clone()
    }

    pub fn c_list(&self) -> Vec<Vec<u8>> {
        self.c_list.to_bytes()
    }

    pub fn finalize(self, challenge: &Signed) -> NonRevocProof<E> {
        let challenge = scalar_from_signed(challenge);
        NonRevocProof {
            x_list: self.x_tilde.respond(&challenge, &self.x),
            c_list: self.c_list,
        }
    }
}

/// Proof that the holder's index is in the accumulator, without revealing the index.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct NonRevocProof<E: Pairing> {
    x_list: XList<E>,
    c_list: CList<E>,
}

impl<E: Pairing> NonRevocProof<E> {
    /// The response for the context attribute, reduced modulo the group order.
    pub(crate) fn m2(&self) -> &E::ScalarField {
        &self.x_list.m2
    }

    /// The blinded values `[E, D, A, G, W, S, U]` hashed into the challenge.
    pub fn c_list(&self) -> Vec<Vec<u8>> {
        self.c_list.to_bytes()
    }

    /// Recomputes `T1..T8` from the responses against the given accumulator.
    pub fn tau_list(
        &self,
        pk: &RevocationPublicKey<E>,
        accumulator: &Accumulator<E>,
        acc_pk: &AccumulatorPublicKey<E>,
        challenge: &Signed,
    ) -> Vec<Vec<u8>> {
        let acc = accumulator.value();
        let challenge = scalar_from_signed(challenge);
        let expected = TauList::expected(pk, &acc, acc_pk, &self.c_list);
        TauList::new(pk, &acc, &self.c_list, &self.x_list)
            .sub_scaled(&challenge, &expected)
            .to_bytes()
    }
}
