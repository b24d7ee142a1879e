use ark_bn254::Fr;
use ark_ff::{BigInteger, FpParameters, PrimeField};
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::{error::ProverError, ProverResult};

/// Bits per limb of the circuit's big-integer arithmetic.
pub const CIRCOM_BIGINT_N: usize = 121;
/// Number of limbs of the circuit's big-integer arithmetic.
pub const CIRCOM_BIGINT_K: usize = 17;

/// Modulus of the circuit field (BN254 scalar field).
pub fn circom_field_modulus() -> BigUint {
    BigUint::from_bytes_le(&<<Fr as PrimeField>::Params as FpParameters>::MODULUS.to_bytes_le())
}

/// Reads a big-endian digest as an integer reduced into the circuit field.
pub fn field_element_from_digest(digest: &[u8]) -> BigUint {
    let element = Fr::from_be_bytes_mod_order(digest);
    BigUint::from_bytes_le(&element.into_repr().to_bytes_le())
}

/// Splits `value` into `limb_count` limbs of `limb_bits` bits, least significant first.
pub fn to_limbs(value: &BigUint, limb_bits: usize, limb_count: usize) -> ProverResult<Vec<BigUint>> {
    if limb_bits == 0 {
        return Err(ProverError::InvalidLength("zero-width limbs".to_owned()));
    }
    if value.bits() > (limb_bits * limb_count) as u64 {
        return Err(ProverError::Overflow {
            bits: value.bits(),
            limb_bits,
            limb_count,
        });
    }

    let mask = (BigUint::one() << limb_bits) - BigUint::one();
    let mut rest = value.clone();
    let mut limbs = Vec::with_capacity(limb_count);
    for _ in 0..limb_count {
        limbs.push(&rest & &mask);
        rest >>= limb_bits;
    }
    Ok(limbs)
}

pub fn from_limbs(limbs: &[BigUint], limb_bits: usize) -> BigUint {
    limbs
        .iter()
        .rev()
        .fold(BigUint::zero(), |acc, limb| (acc << limb_bits) + limb)
}

/// Circuit encoding of a big integer: 17 limbs of 121 bits as decimal strings.
pub fn to_circom_bigint_bytes(value: &BigUint) -> ProverResult<Vec<String>> {
    Ok(to_limbs(value, CIRCOM_BIGINT_N, CIRCOM_BIGINT_K)?
        .iter()
        .map(|limb| limb.to_str_radix(10))
        .collect())
}
