//! Attribute schemas, raw values and their encoding into integers.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use core::fmt;

use crypto_bigint::U256;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{
    errors::Error,
    params::LARGE_MASTER_SECRET,
    tools::{
        hashing::{Chain, Hasher},
        serde::Decimal,
    },
    uint::{decimal_to_uint, DecimalEncoding},
};

const ATTRIBUTE_TAG: &[u8] = b"attribute";

/// How a raw attribute value is turned into an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// The raw value is already a decimal integer (below `2^256`) and is used as is.
    /// Only numeric attributes are meaningful in range predicates.
    Numeric,
    /// The raw value is hashed into a 256-bit integer.
    Hashed,
}

/// Identifies a schema, and with it the credential definition issued for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaId(String);

impl SchemaId {
    /// Creates a schema identifier from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The textual form of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, versioned set of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    version: String,
    attributes: BTreeMap<String, AttributeKind>,
}

impl Schema {
    /// Creates a schema. Fails on an empty or duplicated attribute list.
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        version: impl Into<String>,
        attributes: impl IntoIterator<Item = (N, AttributeKind)>,
    ) -> Result<Self, Error> {
        let mut map = BTreeMap::new();
        for (attr, kind) in attributes {
            let attr = attr.into();
            if map.insert(attr.clone(), kind).is_some() {
                return Err(Error::InvalidInput(format!("duplicate attribute `{attr}`")));
            }
        }
        if map.is_empty() {
            return Err(Error::InvalidInput("a schema needs at least one attribute".into()));
        }
        Ok(Self {
            name: name.into(),
            version: version.into(),
            attributes: map,
        })
    }

    /// The schema identifier, `name:version`.
    pub fn id(&self) -> SchemaId {
        SchemaId(format!("{}:{}", self.name, self.version))
    }

    /// Attribute names in canonical (sorted) order.
    pub fn attribute_names(&self) -> BTreeSet<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Returns the kind of the attribute, if it belongs to the schema.
    pub fn kind(&self, attr: &str) -> Option<AttributeKind> {
        self.attributes.get(attr).copied()
    }

    /// Encodes a single raw value of the named attribute.
    pub fn encode_value(&self, attr: &str, raw: &str) -> Result<U256, Error> {
        match self.kind(attr) {
            Some(kind) => encode_value(kind, raw),
            None => Err(Error::InvalidInput(format!("unknown attribute `{attr}`"))),
        }
    }

    /// Encodes a full set of raw values. The set of names must match the schema exactly.
    pub fn encode(&self, raw: &RawAttributes) -> Result<AttributeValues, Error> {
        if raw.0.len() != self.attributes.len() {
            return Err(Error::InvalidInput(format!(
                "expected {} attributes, got {}",
                self.attributes.len(),
                raw.0.len()
            )));
        }
        let mut encoded = BTreeMap::new();
        for (attr, value) in raw.0.iter() {
            encoded.insert(attr.clone(), self.encode_value(attr, value)?);
        }
        Ok(AttributeValues(encoded))
    }
}

pub(crate) fn encode_value(kind: AttributeKind, raw: &str) -> Result<U256, Error> {
    match kind {
        AttributeKind::Numeric => {
            let value: U256 = decimal_to_uint(raw).map_err(Error::InvalidInput)?;
            Ok(value)
        }
        AttributeKind::Hashed => Ok(Hasher::new_with_dst(ATTRIBUTE_TAG)
            .chain_bytes(raw.as_bytes())
            .finalize_to_uint(LARGE_MASTER_SECRET)),
    }
}

/// Raw (textual) attribute values of one holder for one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttributes(BTreeMap<String, String>);

impl RawAttributes {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a value, builder style.
    pub fn with(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(attr.into(), value.into());
        self
    }

    /// Returns the raw value of an attribute.
    pub fn get(&self, attr: &str) -> Option<&str> {
        self.0.get(attr).map(String::as_str)
    }
}

/// Encoded attribute values, sorted by name.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValues(#[serde_as(as = "BTreeMap<_, Decimal>")] BTreeMap<String, U256>);

impl AttributeValues {
    /// Returns the encoded value of an attribute.
    pub fn get(&self, attr: &str) -> Option<&U256> {
        self.0.get(attr)
    }

    /// Iterates over `(name, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &U256)> {
        self.0.iter()
    }

    /// Attribute names in canonical order.
    pub fn names(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    pub(crate) fn from_map(map: BTreeMap<String, U256>) -> Self {
        Self(map)
    }
}

/// The comparison performed by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PredicateType {
    /// Attribute value greater or equal to the threshold.
    GE,
}

/// A public range condition on a hidden attribute.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Predicate {
    /// The attribute the condition is on.
    pub attr_name: String,
    /// The public threshold.
    #[serde_as(as = "Decimal")]
    pub value: U256,
    /// The comparison.
    pub p_type: PredicateType,
}

impl Predicate {
    /// Creates an `attr_name >= value` predicate.
    pub fn ge(attr_name: impl Into<String>, value: u64) -> Self {
        Self {
            attr_name: attr_name.into(),
            value: U256::from_u64(value),
            p_type: PredicateType::GE,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.p_type {
            PredicateType::GE => write!(f, "{} >= {}", self.attr_name, self.value.to_decimal()),
        }
    }
}
