use core::cmp::Ordering;
use core::fmt;

use crypto_bigint::{RandomBits, Uint, U4096};
use rand_core::CryptoRngCore;
use zeroize::Zeroize;

use super::Extendable;

/// A signed integer stored in two's complement over [`U4096`].
///
/// Every exponent, blinding factor and response of the CL proofs lives well below `2^4000`,
/// so the wrapping arithmetic below never overflows for values produced by this crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Zeroize)]
pub struct Signed(U4096);

impl Signed {
    /// Zero.
    pub const ZERO: Self = Self(U4096::ZERO);

    /// One.
    pub const ONE: Self = Self(U4096::ONE);

    pub(crate) fn from_u64(value: u64) -> Self {
        Self(U4096::from_u64(value))
    }

    /// Creates a non-negative value from an unsigned integer.
    ///
    /// Returns `None` if the value occupies the sign bit.
    pub fn from_uint<const L: usize>(value: &Uint<L>) -> Option<Self> {
        if value.bits_vartime() >= U4096::BITS {
            return None;
        }
        Some(Self(value.to_wide()))
    }

    pub(crate) fn from_abs(abs: U4096, is_negative: bool) -> Option<Self> {
        if abs.bits_vartime() >= U4096::BITS {
            return None;
        }
        let value = Self(abs);
        Some(if is_negative { value.neg() } else { value })
    }

    /// `2^exp`.
    pub(crate) fn power_of_two(exp: u32) -> Self {
        Self(U4096::ONE.wrapping_shl_vartime(exp))
    }

    /// A uniformly random non-negative value of at most `bits` bits.
    pub(crate) fn random_bits(rng: &mut impl CryptoRngCore, bits: u32) -> Self {
        Self(U4096::random_bits(rng, bits))
    }

    /// A uniformly random value with exactly `bits` bits (the top bit is set).
    pub(crate) fn random_bits_exact(rng: &mut impl CryptoRngCore, bits: u32) -> Self {
        Self::random_bits(rng, bits - 1).add(&Self::power_of_two(bits - 1))
    }

    /// Returns `true` if the value is negative.
    pub fn is_negative(&self) -> bool {
        self.0.bit_vartime(U4096::BITS - 1)
    }

    /// The absolute value.
    pub fn abs(&self) -> U4096 {
        if self.is_negative() {
            self.0.wrapping_neg()
        } else {
            self.0
        }
    }

    /// Converts into an unsigned integer of the given size.
    ///
    /// Returns `None` for negative values or values that do not fit.
    pub fn to_uint<const L: usize>(&self) -> Option<Uint<L>> {
        if self.is_negative() {
            return None;
        }
        Uint::<L>::try_from_wide(&self.0)
    }

    /// The number of bits in the absolute value.
    pub fn bits(&self) -> u32 {
        self.abs().bits_vartime()
    }

    pub(crate) fn neg(&self) -> Self {
        Self(self.0.wrapping_neg())
    }

    pub(crate) fn add(&self, rhs: &Self) -> Self {
        Self(self.0.wrapping_add(&rhs.0))
    }

    pub(crate) fn sub(&self, rhs: &Self) -> Self {
        Self(self.0.wrapping_sub(&rhs.0))
    }

    pub(crate) fn mul(&self, rhs: &Self) -> Self {
        Self(self.0.wrapping_mul(&rhs.0))
    }

    /// `self + c * x`, the shape of every Schnorr response.
    pub(crate) fn mul_add(&self, c: &Self, x: &Self) -> Self {
        self.add(&c.mul(x))
    }
}

impl Ord for Signed {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            // Same sign: two's complement order coincides with the unsigned one.
            _ => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Signed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Signed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signed({self})")
    }
}

impl fmt::Display for Signed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }
        write!(f, "{}", super::uint_to_decimal(&self.abs()))
    }
}
