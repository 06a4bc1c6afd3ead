use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;

use crypto_bigint::{Invert, NonZero, Odd, RandomMod, U1024, U2048};
use crypto_primes::RandomPrimeWithRng;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    errors::Error,
    params::SchemeParams,
    tools::serde::Decimal,
    uint::{Exponentiable, ModMonty, ModParams, MulWide},
};

/// The issuer's public key for primary (CL) credentials over a fixed attribute set.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryPublicKey {
    #[serde_as(as = "Decimal")]
    n: U2048,
    #[serde_as(as = "Decimal")]
    s: U2048,
    #[serde_as(as = "Decimal")]
    z: U2048,
    #[serde_as(as = "Decimal")]
    rms: U2048,
    #[serde_as(as = "Decimal")]
    rctxt: U2048,
    #[serde_as(as = "BTreeMap<_, Decimal>")]
    r: BTreeMap<String, U2048>,
}

/// The issuer's secret key: the two safe primes `p = 2p' + 1` and `q = 2q' + 1`.
#[serde_as]
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct PrimarySecretKey {
    #[serde_as(as = "Decimal")]
    p: U1024,
    #[serde_as(as = "Decimal")]
    q: U1024,
}

impl core::fmt::Debug for PrimarySecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PrimarySecretKey { .. }")
    }
}

impl PrimarySecretKey {
    /// Generates two fresh safe primes of the size given by `P`.
    pub fn random<P: SchemeParams>(rng: &mut impl CryptoRngCore) -> Self {
        let p = U1024::generate_safe_prime_with_rng(rng, P::PRIME_BITS);
        loop {
            let q = U1024::generate_safe_prime_with_rng(rng, P::PRIME_BITS);
            if q != p {
                return Self { p, q };
            }
        }
    }

    /// Creates a secret key from known safe primes.
    ///
    /// The primes are not tested for primality, only for the basic shape of safe primes.
    pub fn from_primes(p: U1024, q: U1024) -> Result<Self, Error> {
        let three = U1024::from_u64(3);
        // A safe prime larger than 7 is 3 mod 4.
        let is_shaped = |x: &U1024| x > &three && x.bit_vartime(0) && x.bit_vartime(1);
        if !is_shaped(&p) || !is_shaped(&q) {
            return Err(Error::InvalidInput("the primes do not have the shape of safe primes".into()));
        }
        if p == q {
            return Err(Error::InvalidInput("the primes must be distinct".into()));
        }
        Ok(Self { p, q })
    }

    /// The modulus `N = pq`.
    pub(crate) fn modulus(&self) -> U2048 {
        self.p.mul_wide(&self.q)
    }

    /// The order of the group of quadratic residues, `p'q'`.
    pub(crate) fn group_order(&self) -> U2048 {
        let p_prime = self.p.wrapping_shr_vartime(1);
        let q_prime = self.q.wrapping_shr_vartime(1);
        p_prime.mul_wide(&q_prime)
    }

    /// Inverts `e` modulo `p'q'`.
    pub(crate) fn invert_exponent(&self, e: &U2048) -> Result<U2048, Error> {
        let order: Option<Odd<U2048>> = Option::from(Odd::new(self.group_order()));
        let order = order.ok_or_else(|| Error::InvalidInput("the group order must be odd".into()))?;
        let params = ModParams::new_vartime(order);
        let e_mod = ModMonty::new(e, params);
        let inverse: Option<ModMonty> = Option::from(Invert::invert(&e_mod));
        inverse
            .map(|inv| inv.retrieve())
            .ok_or_else(|| Error::InvalidInput("the exponent is not invertible modulo p'q'".into()))
    }

    /// A uniformly random exponent in `[2, p'q' - 1]`.
    fn random_exponent(&self, rng: &mut impl CryptoRngCore) -> Result<U2048, Error> {
        let bound: Option<NonZero<U2048>> =
            Option::from(NonZero::new(self.group_order().wrapping_sub(&U2048::from_u64(2))));
        let bound = bound.ok_or_else(|| Error::InvalidInput("the group order is too small".into()))?;
        Ok(U2048::random_mod(rng, &bound).wrapping_add(&U2048::from_u64(2)))
    }

    /// `s^x` for a fresh random exponent `x`.
    fn random_base(&self, rng: &mut impl CryptoRngCore, s: &ModMonty) -> Result<U2048, Error> {
        let x = self.random_exponent(rng)?;
        Ok(s.power(&x)?.retrieve())
    }
}

impl PrimaryPublicKey {
    /// Generates a fresh key pair for the given attribute names.
    pub fn generate<P: SchemeParams>(
        rng: &mut impl CryptoRngCore,
        attr_names: &BTreeSet<String>,
    ) -> Result<(Self, PrimarySecretKey), Error> {
        let sk = PrimarySecretKey::random::<P>(rng);
        let pk = Self::new(rng, &sk, attr_names)?;
        Ok((pk, sk))
    }

    /// Derives a public key from an existing secret key, with fresh random bases.
    pub fn new(
        rng: &mut impl CryptoRngCore,
        sk: &PrimarySecretKey,
        attr_names: &BTreeSet<String>,
    ) -> Result<Self, Error> {
        if attr_names.is_empty() {
            return Err(Error::InvalidInput("no attributes given".into()));
        }

        let n = sk.modulus();
        let group = RsaGroup::new(n)?;
        let s = group.random_quadratic_residue(rng);

        let z = sk.random_base(rng, &s)?;
        let rms = sk.random_base(rng, &s)?;
        let rctxt = sk.random_base(rng, &s)?;
        let mut r = BTreeMap::new();
        for name in attr_names {
            r.insert(name.clone(), sk.random_base(rng, &s)?);
        }

        tracing::debug!("Generated a primary public key for {} attributes", attr_names.len());

        Ok(Self {
            n,
            s: s.retrieve(),
            z,
            rms,
            rctxt,
            r,
        })
    }

    /// The RSA modulus.
    pub fn n(&self) -> &U2048 {
        &self.n
    }

    /// Names of the attributes this key signs.
    pub fn attribute_names(&self) -> BTreeSet<String> {
        self.r.keys().cloned().collect()
    }

    /// Brings the key into the form used for computations.
    pub(crate) fn to_precomputed(&self) -> Result<PublicKeyPrecomputed, Error> {
        let group = RsaGroup::new(self.n)?;
        let r = self
            .r
            .iter()
            .map(|(name, value)| (name.clone(), group.element(value)))
            .collect();
        Ok(PublicKeyPrecomputed {
            s: group.element(&self.s),
            z: group.element(&self.z),
            rms: group.element(&self.rms),
            rctxt: group.element(&self.rctxt),
            r,
            group,
        })
    }
}

/// The multiplicative group modulo `N`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RsaGroup {
    modulus: NonZero<U2048>,
    params: ModParams,
}

impl RsaGroup {
    pub fn new(modulus: U2048) -> Result<Self, Error> {
        let odd: Option<Odd<U2048>> = Option::from(Odd::new(modulus));
        let odd = odd.ok_or_else(|| Error::InvalidInput("the modulus must be odd".into()))?;
        let modulus: Option<NonZero<U2048>> = Option::from(NonZero::new(modulus));
        let modulus = modulus.ok_or_else(|| Error::InvalidInput("the modulus must be non-zero".into()))?;
        Ok(Self {
            modulus,
            params: ModParams::new_vartime(odd),
        })
    }

    pub fn element(&self, value: &U2048) -> ModMonty {
        ModMonty::new(value, self.params)
    }

    pub fn one(&self) -> ModMonty {
        ModMonty::one(self.params)
    }

    /// Finds an invertible group element via rejection sampling.
    pub fn random_invertible_element(&self, rng: &mut impl CryptoRngCore) -> ModMonty {
        loop {
            let r = U2048::random_mod(rng, &self.modulus);
            let r_m = self.element(&r);
            let inverse: Option<ModMonty> = Option::from(Invert::invert(&r_m));
            if inverse.is_some() {
                return r_m;
            }
        }
    }

    /// Returns a uniformly chosen quadratic residue modulo `N`.
    pub fn random_quadratic_residue(&self, rng: &mut impl CryptoRngCore) -> ModMonty {
        self.random_invertible_element(rng).square()
    }

    pub fn modulus(&self) -> &U2048 {
        self.modulus.as_ref()
    }
}

/// A public key with all bases in Montgomery form.
#[derive(Debug, Clone)]
pub(crate) struct PublicKeyPrecomputed {
    pub group: RsaGroup,
    pub s: ModMonty,
    pub z: ModMonty,
    pub rms: ModMonty,
    pub rctxt: ModMonty,
    pub r: BTreeMap<String, ModMonty>,
}

impl PublicKeyPrecomputed {
    pub fn r(&self, attr: &str) -> Result<&ModMonty, Error> {
        self.r
            .get(attr)
            .ok_or_else(|| Error::InvalidInput(format!("the public key has no attribute `{attr}`")))
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;

    use crypto_bigint::{U1024, U2048};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{PrimaryPublicKey, PrimarySecretKey, RsaGroup};
    use crate::test_utils::test_secret_key;

    fn names() -> BTreeSet<String> {
        ["name", "age", "sex"].into_iter().map(String::from).collect()
    }

    #[test]
    fn modulus_and_order() {
        let sk = test_secret_key(0);
        let n = sk.modulus();
        // N = (2p'+1)(2q'+1) = 4p'q' + 2(p'+q') + 1, so N > 4p'q'.
        let order = sk.group_order();
        assert!(order.wrapping_shl_vartime(2) < n);
        assert!(n.bit_vartime(0));
    }

    #[test]
    fn exponent_inverse() {
        let sk = test_secret_key(0);
        let e = U2048::from_u64(65537);
        let inv = sk.invert_exponent(&e).unwrap();
        let order = RsaGroup::new(sk.group_order()).unwrap();
        assert_eq!(order.element(&e) * order.element(&inv), order.one());
    }

    #[test]
    fn public_key_is_deterministic_for_a_seed() {
        let sk = test_secret_key(0);
        let pk1 = PrimaryPublicKey::new(&mut ChaCha8Rng::seed_from_u64(1), &sk, &names()).unwrap();
        let pk2 = PrimaryPublicKey::new(&mut ChaCha8Rng::seed_from_u64(1), &sk, &names()).unwrap();
        assert_eq!(pk1, pk2);
        assert_eq!(pk1.attribute_names(), names());
        assert_eq!(pk1.n(), &sk.modulus());
    }

    #[test]
    fn rejects_malformed_primes() {
        assert!(PrimarySecretKey::from_primes(U1024::from_u64(23), U1024::from_u64(23)).is_err());
        assert!(PrimarySecretKey::from_primes(U1024::from_u64(22), U1024::from_u64(23)).is_err());
        assert!(PrimarySecretKey::from_primes(U1024::from_u64(23), U1024::from_u64(47)).is_ok());
    }
}
