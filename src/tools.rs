pub(crate) mod hashing;
pub(crate) mod serde;
