//! Wire encodings: integers as decimal strings, pairing group elements as byte arrays.

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

use crate::uint::DecimalEncoding;

/// Serializes an integer as a decimal string.
pub(crate) struct Decimal;

impl<T: DecimalEncoding> SerializeAs<T> for Decimal {
    fn serialize_as<S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_decimal())
    }
}

impl<'de, T: DecimalEncoding> DeserializeAs<'de, T> for Decimal {
    fn deserialize_as<D>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        T::from_decimal(&text).map_err(de::Error::custom)
    }
}

/// Serializes an `arkworks` object as an array of bytes of its canonical compressed encoding.
pub(crate) struct ArkBytes;

impl<T: CanonicalSerialize> SerializeAs<T> for ArkBytes {
    fn serialize_as<S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut bytes = Vec::with_capacity(value.compressed_size());
        value
            .serialize_compressed(&mut bytes)
            .map_err(serde::ser::Error::custom)?;
        Serialize::serialize(&bytes, serializer)
    }
}

impl<'de, T: CanonicalDeserialize> DeserializeAs<'de, T> for ArkBytes {
    fn deserialize_as<D>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
        T::deserialize_compressed(bytes.as_slice()).map_err(de::Error::custom)
    }
}

/// Canonical compressed bytes of an `arkworks` object, as fed into hashes.
pub(crate) fn ark_to_bytes<T: CanonicalSerialize>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    // Writing into a vector cannot fail.
    if let Err(err) = value.serialize_compressed(&mut bytes) {
        tracing::warn!("Failed to serialize a group element: {err}");
    }
    bytes
}

#[cfg(test)]
mod tests {
    use ark_bls12_381::{Fr, G1Projective};
    use ark_std::UniformRand;
    use crypto_bigint::U256;
    use rand_core::OsRng;
    use serde::{Deserialize, Serialize};
    use serde_assert::{Deserializer, Serializer, Token};
    use serde_with::serde_as;

    use super::{ArkBytes, Decimal};

    #[serde_as]
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wire {
        #[serde_as(as = "Decimal")]
        value: U256,
        #[serde_as(as = "ArkBytes")]
        point: G1Projective,
        #[serde_as(as = "Vec<ArkBytes>")]
        scalars: Vec<Fr>,
    }

    #[test]
    fn decimal_token() {
        #[serde_as]
        #[derive(Serialize)]
        struct Number(#[serde_as(as = "Decimal")] U256);

        let serializer = Serializer::builder().build();
        let tokens = Number(U256::from_u64(1234)).serialize(&serializer).unwrap();
        assert_eq!(
            tokens,
            [
                Token::NewtypeStruct { name: "Number" },
                Token::Str("1234".to_owned())
            ]
        );
    }

    #[test]
    fn roundtrip() {
        let wire = Wire {
            value: U256::from_u64(987654321),
            point: G1Projective::rand(&mut OsRng),
            scalars: vec![Fr::rand(&mut OsRng), Fr::rand(&mut OsRng)],
        };
        let serializer = Serializer::builder().build();
        let tokens = wire.serialize(&serializer).unwrap();
        let mut deserializer = Deserializer::builder(tokens).build();
        let back = Wire::deserialize(&mut deserializer).unwrap();
        assert_eq!(back, wire);
    }
}
