//! Camenisch-Lysyanskaya credentials over the group of quadratic residues modulo `N`.

mod claim;
mod eq_proof;
mod four_squares;
mod ge_proof;
mod keys;

pub use claim::{context_attribute, MasterSecret, PrimaryBlinding, PrimaryClaim, PrimaryClaimRequest};
pub use eq_proof::EqProof;
pub use ge_proof::GeProof;
pub use keys::{PrimaryPublicKey, PrimarySecretKey};

pub(crate) use eq_proof::EqProofInit;
pub(crate) use ge_proof::GeProofInit;
pub(crate) use keys::PublicKeyPrecomputed;
