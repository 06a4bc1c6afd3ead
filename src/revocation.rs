//! Revocation through a pairing-based accumulator of credential indices.

mod accumulator;
mod keys;
mod non_revocation;
mod witness;

use ark_ff::PrimeField;
use crypto_bigint::U256;

use crate::uint::{BoxedEncoding, Signed};

pub use accumulator::{Accumulator, SharedAccumulator};
pub use keys::{AccumulatorPublicKey, AccumulatorSecretKey, RevocationPublicKey, RevocationSecretKey, Tails};
pub use non_revocation::NonRevocProof;
pub use witness::{NonRevocationClaim, RevocationBlinding, RevocationClaimRequest, Witness};

pub(crate) use non_revocation::NonRevocProofInit;

/// Reduces an integer modulo the order of the pairing groups.
pub(crate) fn scalar_from_uint<F: PrimeField>(value: &U256) -> F {
    F::from_be_bytes_mod_order(&value.to_be_bytes())
}

/// Reduces a signed integer modulo the order of the pairing groups.
pub(crate) fn scalar_from_signed<F: PrimeField>(value: &Signed) -> F {
    let abs = F::from_be_bytes_mod_order(&value.abs().to_be_bytes());
    if value.is_negative() {
        -abs
    } else {
        abs
    }
}

#[cfg(test)]
mod tests {
    use ark_bls12_381::Fr;
    use crypto_bigint::U256;

    use super::{scalar_from_signed, scalar_from_uint};
    use crate::uint::Signed;

    #[test]
    fn reduction_is_a_ring_homomorphism() {
        let a = Signed::from_u64(1234567);
        let b = Signed::from_u64(7654321).neg();
        let sum: Fr = scalar_from_signed(&a.add(&b));
        let product: Fr = scalar_from_signed(&a.mul(&b));
        assert_eq!(sum, scalar_from_signed::<Fr>(&a) + scalar_from_signed::<Fr>(&b));
        assert_eq!(product, scalar_from_signed::<Fr>(&a) * scalar_from_signed::<Fr>(&b));
        assert_eq!(scalar_from_uint::<Fr>(&U256::from_u64(42)), Fr::from(42u64));
    }
}
