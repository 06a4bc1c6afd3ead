use digest::{ExtendableOutput, Update};
use hashing_serializer::HashingSerializer;
use serde::Serialize;
use sha3::Shake256;

use crate::uint::FromXofReader;

/// A digest object that takes byte slices or decomposable ([`Hashable`]) objects.
pub(crate) trait Chain: Sized {
    fn as_digest_mut(&mut self) -> &mut impl Update;

    /// Hash raw bytes.
    ///
    /// Note: only for impls in specific types, do not use directly.
    fn chain_raw_bytes(self, bytes: &[u8]) -> Self;

    /// Hash raw bytes in a collision-resistant way.
    fn chain_bytes(self, bytes: &(impl AsRef<[u8]> + ?Sized)) -> Self {
        // Hash the length too to prevent hash conflicts. (e.g. H(AB|CD) == H(ABC|D)).
        let len = (bytes.as_ref().len() as u64).to_be_bytes();
        self.chain_raw_bytes(&len).chain_raw_bytes(bytes.as_ref())
    }

    fn chain<T: Hashable>(self, hashable: &T) -> Self {
        hashable.chain(self)
    }
}

/// Wraps an extendable output hash and standardizes the use of DST.
pub(crate) struct Hasher(Shake256);

impl Chain for Hasher {
    fn as_digest_mut(&mut self) -> &mut impl Update {
        &mut self.0
    }

    fn chain_raw_bytes(self, bytes: &[u8]) -> Self {
        let mut digest = self.0;
        digest.update(bytes);
        Self(digest)
    }
}

impl Hasher {
    fn new() -> Self {
        Self(Shake256::default())
    }

    pub fn new_with_dst(dst: &[u8]) -> Self {
        Self::new().chain_bytes(dst)
    }

    pub fn finalize_to_reader(self) -> <Shake256 as ExtendableOutput>::Reader {
        self.0.finalize_xof()
    }

    /// Finalizes into an integer of at most `n_bits` bits.
    pub fn finalize_to_uint<T: FromXofReader>(self, n_bits: u32) -> T {
        T::from_xof_reader(&mut self.finalize_to_reader(), n_bits)
    }
}

/// A trait allowing complex objects to give access to their contents for hashing purposes
/// without the need of a conversion to a new form (e.g. serialization).
pub(crate) trait Hashable {
    fn chain<C: Chain>(&self, digest: C) -> C;
}

// We have a lot of things that already implement `Serialize`,
// so there's no point in implementing `Hashable` for them separately.
impl<T: Serialize> Hashable for T {
    fn chain<C: Chain>(&self, digest: C) -> C {
        let mut digest = digest;

        let serializer = HashingSerializer {
            digest: digest.as_digest_mut(),
        };

        // The only way it can return an error is if there is
        // some non-serializable element encountered, which is reproducible
        // and will be caught in tests.
        if let Err(err) = self.serialize(serializer) {
            tracing::warn!("Failed to hash a serializable value: {err:?}");
        }

        digest
    }
}

#[cfg(test)]
mod tests {
    use crypto_bigint::U256;

    use super::{Chain, Hasher};

    #[test]
    fn length_prefix_separates_inputs() {
        let h1: U256 = Hasher::new_with_dst(b"test")
            .chain_bytes(b"AB")
            .chain_bytes(b"CD")
            .finalize_to_uint(256);
        let h2: U256 = Hasher::new_with_dst(b"test")
            .chain_bytes(b"ABC")
            .chain_bytes(b"D")
            .finalize_to_uint(256);
        assert_ne!(h1, h2);
    }

    #[test]
    fn bounded_output() {
        let h: U256 = Hasher::new_with_dst(b"test").chain(&("holder", 7u32)).finalize_to_uint(80);
        assert!(h.bits_vartime() <= 80);
    }

    #[test]
    fn deterministic() {
        let make = || -> U256 { Hasher::new_with_dst(b"dst").chain(&"value").finalize_to_uint(256) };
        assert_eq!(make(), make());
    }
}
