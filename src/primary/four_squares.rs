//! Lagrange four-square decomposition of non-negative integers.

use crypto_bigint::{
    modular::{MontyForm, MontyParams},
    NonZero, Odd, PowBoundedExp, RandomMod, U512,
};
use crypto_primes::RandomPrimeWithRng;
use rand_core::CryptoRngCore;

use crate::{
    errors::Error,
    params::FOUR_SQUARES_TRIALS,
    uint::{uint_to_decimal, Signed},
};

type ModPrime = MontyForm<{ U512::LIMBS }>;

/// Below this bound an exhaustive search is used.
const SMALL_BOUND: u64 = 1 << 24;

/// Returns `[u1, u2, u3, u4]` with `u1² + u2² + u3² + u4² = value`.
///
/// A greedy largest-square-first pass is tried first. When it leaves a residue,
/// the randomized Rabin-Shallit reduction to a sum of two squares of a prime takes over.
pub(crate) fn four_squares(rng: &mut impl CryptoRngCore, value: &Signed) -> Result<[Signed; 4], Error> {
    if value.is_negative() {
        return Err(Error::FourSquaresFailed(format!("{value} is negative")));
    }
    let m: U512 = value
        .to_uint()
        .ok_or_else(|| Error::FourSquaresFailed(format!("{value} is too large")))?;

    let squares = match greedy(&m) {
        Some(squares) => squares,
        None => {
            tracing::trace!("Greedy decomposition left a residue, falling back to the randomized search");
            randomized(rng, &m)?
        }
    };

    let sum = squares
        .iter()
        .fold(U512::ZERO, |acc, u| acc.wrapping_add(&u.wrapping_mul(u)));
    if sum != m {
        return Err(Error::FourSquaresFailed(value.to_string()));
    }

    let mut result = [Signed::ZERO; 4];
    for (dst, src) in result.iter_mut().zip(squares.iter()) {
        *dst = Signed::from_uint(src).ok_or_else(|| Error::FourSquaresFailed(value.to_string()))?;
    }
    Ok(result)
}

fn greedy(m: &U512) -> Option<[U512; 4]> {
    let mut remainder = *m;
    let mut squares = [U512::ZERO; 4];
    for square in squares.iter_mut() {
        let root = remainder.sqrt_vartime();
        remainder = remainder.wrapping_sub(&root.wrapping_mul(&root));
        *square = root;
    }
    if remainder == U512::ZERO {
        Some(squares)
    } else {
        None
    }
}

fn randomized(rng: &mut impl CryptoRngCore, m: &U512) -> Result<[U512; 4], Error> {
    // Strip factors of 4: if m = 4^k m' then each root of m' is multiplied by 2^k.
    let mut reduced = *m;
    let mut shift = 0;
    while reduced != U512::ZERO && !reduced.bit_vartime(0) && !reduced.bit_vartime(1) {
        reduced = reduced.wrapping_shr_vartime(2);
        shift += 1;
    }

    let roots = if reduced < U512::from_u64(SMALL_BOUND) {
        let small = reduced.as_words().first().map(|word| u64::from(*word)).unwrap_or(0);
        exhaustive(small)
            .map(|roots| roots.map(U512::from_u64))
            .ok_or_else(|| Error::FourSquaresFailed(uint_to_decimal(m)))?
    } else {
        rabin_shallit(rng, &reduced)?
    };

    Ok(roots.map(|root| root.wrapping_shl_vartime(shift)))
}

/// Finds `a² + b² + c² + d² = m` by descending search. Only used for small `m`.
fn exhaustive(m: u64) -> Option<[u64; 4]> {
    let mut a = isqrt(m);
    loop {
        let rest_a = m - a * a;
        let mut b = isqrt(rest_a).min(a);
        loop {
            let rest_b = rest_a - b * b;
            let mut c = isqrt(rest_b).min(b);
            loop {
                let rest_c = rest_b - c * c;
                let d = isqrt(rest_c);
                if d * d == rest_c {
                    return Some([a, b, c, d]);
                }
                if c == 0 {
                    break;
                }
                c -= 1;
            }
            if b == 0 {
                break;
            }
            b -= 1;
        }
        if a == 0 {
            return None;
        }
        a -= 1;
    }
}

fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// For `m ≢ 0 (mod 4)`, picks `x, y` so that `p = m - x² - y²` is a prime `≡ 1 (mod 4)`,
/// then writes `p` as a sum of two squares.
fn rabin_shallit(rng: &mut impl CryptoRngCore, m: &U512) -> Result<[U512; 4], Error> {
    let bound: Option<NonZero<U512>> = Option::from(NonZero::new(m.sqrt_vartime().wrapping_shr_vartime(1)));
    let bound = bound.ok_or_else(|| Error::FourSquaresFailed(uint_to_decimal(m)))?;

    // Squares are 0 or 1 mod 4, so the parities of x and y are fixed by m mod 4.
    let (x_odd, y_odd) = match (m.bit_vartime(1), m.bit_vartime(0)) {
        (false, true) => (false, false),
        (true, false) => (true, false),
        _ => (true, true),
    };

    for trial in 0..FOUR_SQUARES_TRIALS {
        let x = with_parity(U512::random_mod(rng, &bound), x_odd);
        let y = with_parity(U512::random_mod(rng, &bound), y_odd);
        let p = m
            .wrapping_sub(&x.wrapping_mul(&x))
            .wrapping_sub(&y.wrapping_mul(&y));
        if !p.is_prime_with_rng(rng) {
            continue;
        }
        if let Some((a, b)) = two_squares(rng, &p) {
            tracing::trace!("Four-square decomposition found after {} trials", trial + 1);
            return Ok([x, y, a, b]);
        }
    }

    tracing::warn!("Four-square decomposition exhausted {FOUR_SQUARES_TRIALS} trials");
    Err(Error::FourSquaresFailed(uint_to_decimal(m)))
}

fn with_parity(value: U512, odd: bool) -> U512 {
    let even = value.wrapping_shr_vartime(1).wrapping_shl_vartime(1);
    if odd {
        even.wrapping_add(&U512::ONE)
    } else {
        even
    }
}

/// Writes a prime `p ≡ 1 (mod 4)` as `a² + b²` (Hermite-Serret).
fn two_squares(rng: &mut impl CryptoRngCore, p: &U512) -> Option<(U512, U512)> {
    let root = sqrt_minus_one(rng, p)?;

    let (mut r0, mut r1) = (*p, root);
    while r1.wrapping_mul(&r1) > *p {
        let r1_nz: Option<NonZero<U512>> = Option::from(NonZero::new(r1));
        let next = r0.rem(&r1_nz?);
        r0 = r1;
        r1 = next;
    }

    let a = r1;
    let rest = p.wrapping_sub(&a.wrapping_mul(&a));
    let b = rest.sqrt_vartime();
    if b.wrapping_mul(&b) == rest {
        Some((a, b))
    } else {
        None
    }
}

/// Finds `t` with `t² ≡ -1 (mod p)` as `c^((p-1)/4)` for a quadratic non-residue `c`.
fn sqrt_minus_one(rng: &mut impl CryptoRngCore, p: &U512) -> Option<U512> {
    let odd: Option<Odd<U512>> = Option::from(Odd::new(*p));
    let params = MontyParams::new_vartime(odd?);

    let two = U512::from_u64(2);
    let range: Option<NonZero<U512>> = Option::from(NonZero::new(p.wrapping_sub(&two)));
    let range = range?;
    let exponent = p.wrapping_shr_vartime(2);
    let minus_one = p.wrapping_sub(&U512::ONE);

    // Half of all bases are non-residues.
    for _ in 0..64 {
        let c = U512::random_mod(rng, &range).wrapping_add(&two);
        let t = PowBoundedExp::pow_bounded_exp(&ModPrime::new(&c, params), &exponent, U512::BITS);
        if t.square().retrieve() == minus_one {
            return Some(t.retrieve());
        }
    }
    None
}
