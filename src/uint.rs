mod decimal;
mod signed;
mod traits;

pub use crypto_bigint::{U1024, U2048, U256, U4096, U512};

pub(crate) use decimal::{decimal_to_uint, uint_to_decimal, DecimalEncoding};
pub use signed::Signed;
pub(crate) use traits::{invert, minimal_be_bytes, BoxedEncoding, Exponentiable, Extendable, FromXofReader, MulWide};

use crypto_bigint::modular::{MontyForm, MontyParams};

/// A residue modulo the RSA modulus, in Montgomery form.
pub(crate) type ModMonty = MontyForm<{ U2048::LIMBS }>;

/// Montgomery parameters for the RSA modulus.
pub(crate) type ModParams = MontyParams<{ U2048::LIMBS }>;
