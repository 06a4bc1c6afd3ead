use crypto_bigint::{subtle::CtOption, Invert, Limb, PowBoundedExp, Uint, U2048, U4096};
use digest::XofReader;

use super::{ModMonty, Signed};
use crate::errors::Error;

pub(crate) trait FromXofReader {
    /// Returns an integer derived deterministically from an extensible output hash,
    /// with the bit size limited to `n_bits`.
    ///
    /// Panics if `n_bits` exceeds the capacity of the integer type.
    fn from_xof_reader(reader: &mut impl XofReader, n_bits: u32) -> Self;
}

impl<const L: usize> FromXofReader for Uint<L> {
    fn from_xof_reader(reader: &mut impl XofReader, n_bits: u32) -> Self {
        assert!(n_bits <= Self::BITS);
        let n_bytes = n_bits.div_ceil(8) as usize;

        // If the number of bits is not a multiple of 8, use a mask to zeroize the high bits in the
        // gererated random bytestring.
        let mask = if n_bits & 7 != 0 {
            (1 << (n_bits & 7)) - 1
        } else {
            u8::MAX
        };

        let mut bytes = vec![0u8; Self::BYTES];
        if let Some(buf) = bytes.get_mut(Self::BYTES - n_bytes..) {
            reader.read(buf);
            if let Some(byte) = buf.first_mut() {
                *byte &= mask;
            }
        }
        Self::from_be_slice(&bytes)
    }
}

/// Exponentiation of residues modulo `N` to the power of signed integers.
///
/// Negative exponents require the base to be invertible; an error is returned otherwise.
pub(crate) trait Exponentiable<Exponent>: Sized {
    fn power(&self, exp: &Exponent) -> Result<Self, Error>;
}

impl Exponentiable<Signed> for ModMonty {
    fn power(&self, exp: &Signed) -> Result<Self, Error> {
        let abs_exp = exp.abs();
        let abs_result = PowBoundedExp::pow_bounded_exp(self, &abs_exp, abs_exp.bits_vartime());
        if exp.is_negative() {
            invert(&abs_result)
        } else {
            Ok(abs_result)
        }
    }
}

impl Exponentiable<U2048> for ModMonty {
    fn power(&self, exp: &U2048) -> Result<Self, Error> {
        Ok(PowBoundedExp::pow_bounded_exp(self, exp, U2048::BITS))
    }
}

impl Exponentiable<U4096> for ModMonty {
    fn power(&self, exp: &U4096) -> Result<Self, Error> {
        Ok(PowBoundedExp::pow_bounded_exp(self, exp, exp.bits_vartime()))
    }
}

/// Inverts a residue, failing if it shares a factor with the modulus.
pub(crate) fn invert(value: &ModMonty) -> Result<ModMonty, Error> {
    let inverse: CtOption<ModMonty> = Invert::invert(value);
    Option::from(inverse).ok_or_else(|| Error::InvalidInput("the group element is not invertible".into()))
}

/// Exposes a way to widen `Self` to `Wide`.
pub(crate) trait Extendable<Wide: Sized>: Sized {
    fn to_wide(&self) -> Wide;
    fn try_from_wide(value: &Wide) -> Option<Self>;
}

impl<const L: usize, const W: usize> Extendable<Uint<W>> for Uint<L> {
    fn to_wide(&self) -> Uint<W> {
        const {
            if W < L {
                panic!("Inconsistent widths in `Extendable::to_wide()`");
            }
        }

        let mut result = Uint::<W>::ZERO;
        for (dst, src) in result.as_limbs_mut().iter_mut().zip(self.as_limbs().iter()) {
            *dst = *src;
        }
        result
    }

    fn try_from_wide(value: &Uint<W>) -> Option<Self> {
        const {
            if W < L {
                panic!("Inconsistent widths in `Extendable::try_from_wide()`");
            }
        }

        if value.bits_vartime() > Uint::<L>::BITS {
            return None;
        }

        let mut lo = Uint::<L>::ZERO;
        for (dst, src) in lo.as_limbs_mut().iter_mut().zip(value.as_limbs().iter()) {
            *dst = *src;
        }
        Some(lo)
    }
}

/// Exposes a way to multiply `Self` by `Hi` obtaining a `Wide` result.
pub(crate) trait MulWide<Hi, Wide: Sized>: Sized {
    fn mul_wide(&self, rhs: &Hi) -> Wide;
}

impl<const L: usize, const R: usize, const W: usize> MulWide<Uint<R>, Uint<W>> for Uint<L> {
    fn mul_wide(&self, rhs: &Uint<R>) -> Uint<W> {
        const {
            if W != L + R {
                panic!("Inconsistent widths in `MulWide::mul_wide()`");
            }
        }

        let (lo, hi) = self.split_mul(rhs);
        let mut result = Uint::<W>::ZERO;
        for (dst, src) in result
            .as_limbs_mut()
            .iter_mut()
            .zip(lo.as_limbs().iter().chain(hi.as_limbs().iter()))
        {
            *dst = *src;
        }
        result
    }
}

pub(crate) trait BoxedEncoding: Sized {
    fn to_be_bytes(&self) -> Box<[u8]>;
    fn try_from_be_bytes(bytes: &[u8]) -> Result<Self, String>;
}

impl<const L: usize> BoxedEncoding for Uint<L> {
    fn to_be_bytes(&self) -> Box<[u8]> {
        let mut result = vec![0u8; Self::BYTES];
        for (limb, chunk) in self.as_limbs().iter().zip(result.rchunks_exact_mut(Limb::BYTES)) {
            chunk.copy_from_slice(&limb.0.to_be_bytes());
        }
        result.into()
    }

    fn try_from_be_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() != Self::BYTES {
            return Err(format!(
                "Invalid slice length: {}, expected {}",
                bytes.len(),
                Self::BYTES
            ));
        }
        Ok(Self::from_be_slice(bytes))
    }
}

/// Big-endian bytes of `value` with leading zeros stripped (an empty vector for zero).
pub(crate) fn minimal_be_bytes<const L: usize>(value: &Uint<L>) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes.get(start..).map(|s| s.to_vec()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use crypto_bigint::{modular::MontyParams, Odd, U1024, U2048, U256, U4096};

    use super::{invert, minimal_be_bytes, BoxedEncoding, Exponentiable, Extendable, MulWide};
    use crate::uint::{ModMonty, Signed};

    #[test]
    fn widening_roundtrip() {
        let x = U256::from_u64(0xdead_beef_1234_5678);
        let wide: U2048 = x.to_wide();
        assert_eq!(wide, U2048::from_u64(0xdead_beef_1234_5678));
        let back: U256 = Extendable::try_from_wide(&wide).unwrap();
        assert_eq!(back, x);

        let too_big = U2048::ONE.wrapping_shl_vartime(300);
        assert!(<U256 as Extendable<U2048>>::try_from_wide(&too_big).is_none());
    }

    #[test]
    fn mul_wide_matches_wrapping_mul() {
        let a = U1024::from_u64(u64::MAX);
        let b = U1024::from_u64(1 << 40);
        let product: U2048 = a.mul_wide(&b);
        assert_eq!(product, U2048::from_u64(u64::MAX).wrapping_mul(&U2048::from_u64(1 << 40)));
    }

    #[test]
    fn minimal_bytes() {
        assert!(minimal_be_bytes(&U256::ZERO).is_empty());
        assert_eq!(minimal_be_bytes(&U256::from_u64(0x0102)), vec![1, 2]);
        let full = U256::from_u64(5).to_be_bytes();
        assert_eq!(full.len(), 32);
    }

    #[test]
    fn signed_exponents() {
        let params = MontyParams::new_vartime(Odd::new(U2048::from_u64(1_000_003)).unwrap());
        let base = ModMonty::new(&U2048::from_u64(12345), params);

        let pos = base.power(&Signed::from_u64(7)).unwrap();
        let neg = base.power(&Signed::from_u64(7).neg()).unwrap();
        assert_eq!(pos * neg, ModMonty::one(params));

        let via_uint = base.power(&U4096::from_u64(7)).unwrap();
        assert_eq!(pos, via_uint);
    }

    #[test]
    fn inversion_needs_a_coprime_residue() {
        let params = MontyParams::new_vartime(Odd::new(U2048::from_u64(15)).unwrap());
        let two = ModMonty::new(&U2048::from_u64(2), params);
        assert_eq!(two * invert(&two).unwrap(), ModMonty::one(params));

        let six = ModMonty::new(&U2048::from_u64(6), params);
        assert!(invert(&six).is_err());
        assert!(six.power(&Signed::from_u64(1).neg()).is_err());
    }
}
