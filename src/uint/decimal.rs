//! Decimal text encoding of integers, used on the wire for every integer field.

use crypto_bigint::{Uint, U1024, U2048, U256, U4096, U512};
use num_bigint::BigUint;

use super::{BoxedEncoding, Signed};

/// Parses a decimal string into a big-endian byte string of length `len`.
fn decimal_to_be_bytes(text: &str, len: usize) -> Result<Vec<u8>, String> {
    if text.is_empty() {
        return Err("empty decimal string".into());
    }
    // `parse_bytes` also accepts `_` separators.
    if let Some(c) = text.chars().find(|c| !c.is_ascii_digit()) {
        return Err(format!("invalid decimal digit: {c:?}"));
    }
    let value = BigUint::parse_bytes(text.as_bytes(), 10).ok_or_else(|| String::from("invalid decimal string"))?;
    let bytes = value.to_bytes_be();
    let padding = len
        .checked_sub(bytes.len())
        .ok_or_else(|| format!("the decimal value does not fit in {len} bytes"))?;
    let mut result = vec![0u8; padding];
    result.extend_from_slice(&bytes);
    Ok(result)
}

pub(crate) fn uint_to_decimal<const L: usize>(value: &Uint<L>) -> String {
    BigUint::from_bytes_be(&value.to_be_bytes()).to_str_radix(10)
}

pub(crate) fn decimal_to_uint<const L: usize>(text: &str) -> Result<Uint<L>, String> {
    let bytes = decimal_to_be_bytes(text, Uint::<L>::BYTES)?;
    Uint::<L>::try_from_be_bytes(&bytes)
}

/// Types with a canonical decimal string representation.
pub(crate) trait DecimalEncoding: Sized {
    fn to_decimal(&self) -> String;
    fn from_decimal(text: &str) -> Result<Self, String>;
}

macro_rules! impl_decimal_for_uint {
    ($($ty:ty),*) => {
        $(
            impl DecimalEncoding for $ty {
                fn to_decimal(&self) -> String {
                    uint_to_decimal(self)
                }

                fn from_decimal(text: &str) -> Result<Self, String> {
                    decimal_to_uint(text)
                }
            }
        )*
    };
}

impl_decimal_for_uint!(U256, U512, U1024, U2048, U4096);

impl DecimalEncoding for Signed {
    fn to_decimal(&self) -> String {
        self.to_string()
    }

    fn from_decimal(text: &str) -> Result<Self, String> {
        let (is_negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let abs = decimal_to_uint::<{ U4096::LIMBS }>(digits)?;
        Signed::from_abs(abs, is_negative).ok_or_else(|| "the value does not fit a signed integer".into())
    }
}
