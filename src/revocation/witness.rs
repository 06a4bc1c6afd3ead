use alloc::collections::BTreeSet;

use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_std::UniformRand;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{
    accumulator::Accumulator,
    keys::{AccumulatorPublicKey, RevocationPublicKey, Tails},
};
use crate::{errors::Error, tools::serde::ArkBytes};

/// The holder's revocation blinding factor `vr'`.
#[serde_as]
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RevocationBlinding<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    vr_prime: E::ScalarField,
}

/// The blinded commitment `Ur = h2 * vr'` sent to the issuer.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RevocationClaimRequest<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    pub(crate) ur: E::G1Affine,
}

impl<E: Pairing> RevocationClaimRequest<E> {
    /// Blinds a fresh `vr'` for issuance under `pk`.
    pub fn new(rng: &mut impl CryptoRngCore, pk: &RevocationPublicKey<E>) -> (Self, RevocationBlinding<E>) {
        let vr_prime = E::ScalarField::rand(rng);
        let ur = (pk.h2 * vr_prime).into_affine();
        (Self { ur }, RevocationBlinding { vr_prime })
    }
}

/// Everything a holder needs to prove that its index is still in the accumulator.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Witness<E: Pairing> {
    #[serde_as(as = "ArkBytes")]
    pub(crate) sigma_i: E::G2Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) u_i: E::G2Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) g_i: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) omega: E::G2Affine,
    pub(crate) v: BTreeSet<u32>,
}

impl<E: Pairing> Witness<E> {
    /// The set of indices the witness is synchronized with.
    pub fn v(&self) -> &BTreeSet<u32> {
        &self.v
    }

    /// Brings the witness of index `i` in line with the current state of the accumulator.
    ///
    /// Does nothing if the sets already match; fails if `i` has been revoked.
    pub fn update(&mut self, i: u32, accumulator: &Accumulator<E>, tails: &Tails<E>) -> Result<(), Error> {
        let v_new = accumulator.v();
        if &self.v == v_new {
            return Ok(());
        }
        if !v_new.contains(&i) {
            return Err(Error::Revoked(i));
        }

        let mut omega = self.omega.into_group();
        for j in v_new.difference(&self.v) {
            omega += *tails.witness_term(i, *j)?;
        }
        for j in self.v.difference(v_new) {
            omega -= *tails.witness_term(i, *j)?;
        }

        tracing::debug!(
            "Updated the witness of index {i}: {} added, {} removed",
            v_new.difference(&self.v).count(),
            self.v.difference(v_new).count()
        );

        self.omega = omega.into_affine();
        self.v = v_new.clone();
        Ok(())
    }
}

/// A signature over the holder's index in the accumulator and its context attribute.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct NonRevocationClaim<E: Pairing> {
    pub(crate) index: u32,
    #[serde_as(as = "ArkBytes")]
    pub(crate) sigma: E::G1Affine,
    #[serde_as(as = "ArkBytes")]
    pub(crate) c: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    pub(crate) vr_prime_prime: E::ScalarField,
    #[serde_as(as = "ArkBytes")]
    pub(crate) m2: E::ScalarField,
    pub(crate) witness: Witness<E>,
}

impl<E: Pairing> NonRevocationClaim<E> {
    /// The index of the claim in the accumulator.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The witness of the claim.
    pub fn witness(&self) -> &Witness<E> {
        &self.witness
    }

    /// Refreshes the witness against the current accumulator.
    pub fn update_witness(&mut self, accumulator: &Accumulator<E>, tails: &Tails<E>) -> Result<(), Error> {
        self.witness.update(self.index, accumulator, tails)
    }

    /// Folds `vr'` into the blinding, synchronizes the witness
    /// and checks the claim against the issuer's public data.
    pub fn process(
        &mut self,
        blinding: &RevocationBlinding<E>,
        pk: &RevocationPublicKey<E>,
        acc_pk: &AccumulatorPublicKey<E>,
        accumulator: &Accumulator<E>,
        tails: &Tails<E>,
    ) -> Result<(), Error> {
        self.vr_prime_prime += blinding.vr_prime;
        self.update_witness(accumulator, tails)?;
        self.check(pk, acc_pk, accumulator)
    }

    fn check(
        &self,
        pk: &RevocationPublicKey<E>,
        acc_pk: &AccumulatorPublicKey<E>,
        accumulator: &Accumulator<E>,
    ) -> Result<(), Error> {
        let witness = &self.witness;
        if &witness.v != accumulator.v() {
            return Err(Error::IncorrectIssuerData(
                "the witness is not synchronized with the accumulator".into(),
            ));
        }

        let z_calc = E::pairing(witness.g_i, accumulator.value()) - E::pairing(pk.g, witness.omega);
        if z_calc != acc_pk.z {
            return Err(Error::IncorrectIssuerData("the witness is not in the accumulator".into()));
        }

        if E::pairing(pk.pk.into_group() + witness.g_i, witness.sigma_i) != E::pairing(pk.g, pk.g_dash) {
            return Err(Error::IncorrectIssuerData("`sigma_i` is not a signature on the index".into()));
        }

        if E::pairing(witness.g_i, pk.u) != E::pairing(pk.g, witness.u_i) {
            return Err(Error::IncorrectIssuerData("`u_i` does not match the index".into()));
        }

        let lhs = E::pairing(self.sigma, pk.h_cap * self.c + pk.y);
        let committed = pk.h0.into_group() + pk.h1 * self.m2 + pk.h2 * self.vr_prime_prime + witness.g_i;
        if lhs != E::pairing(committed, pk.h_cap) {
            return Err(Error::IncorrectIssuerData("`sigma` is not a signature on the claim".into()));
        }

        Ok(())
    }
}
