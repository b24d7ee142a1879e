use num_bigint::BigUint;
use num_traits::Zero;

use crate::{error::ProverError, ProverResult};

pub fn to_0x_hex<T>(data: T) -> String
where
    T: AsRef<[u8]>,
{
    let mut res = String::from("0x");
    res += &hex::encode(data);
    res
}

/// Appends zero bytes until `buffer` is exactly `target_len` long.
pub fn zero_pad(buffer: &[u8], target_len: usize) -> ProverResult<Vec<u8>> {
    if target_len < buffer.len() {
        return Err(ProverError::InvalidLength(format!(
            "cannot pad {} bytes down to {}",
            buffer.len(),
            target_len
        )));
    }
    let mut padded = Vec::with_capacity(target_len);
    padded.extend_from_slice(buffer);
    padded.resize(target_len, 0);
    Ok(padded)
}

/// Offset of the first occurrence of `needle`, scanning every start position.
pub fn find_selector(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn bytes_to_decimal_strings(bytes: &[u8]) -> Vec<String> {
    bytes.iter().map(|b| b.to_string()).collect()
}

/// Packs bytes little-endian into `pack_size`-byte integers, the way the circuit reveals
/// substrings in its public signals.
pub fn pack_bytes(bytes: &[u8], pack_size: usize) -> Vec<BigUint> {
    if pack_size == 0 {
        return vec![];
    }
    bytes.chunks(pack_size).map(BigUint::from_bytes_le).collect()
}

/// Inverse of [`pack_bytes`]; the revealed bytes must form a single non-zero run.
pub fn packed_bytes_to_string(
    packed: &[BigUint],
    max_bytes: usize,
    pack_size: usize,
) -> ProverResult<String> {
    // 0: before the run, 1: inside it, 2: after it, 3+: a second run started
    let mut state = 0;
    let mut revealed = vec![];

    for value in packed {
        let mut bytes = value.to_bytes_le();
        if value.is_zero() {
            bytes.clear();
        }
        if bytes.len() > pack_size {
            return Err(ProverError::SpecificError(format!(
                "packed value wider than {} bytes",
                pack_size
            )));
        }
        bytes.resize(pack_size, 0);

        for b in bytes {
            if b != 0 {
                revealed.push(b);
                if state % 2 == 0 {
                    state += 1;
                }
            } else if state % 2 == 1 {
                state += 1;
            }
        }
    }

    if !(state == 1 || state == 2) {
        return Err(ProverError::SpecificError(
            "invalid final state of packed bytes".to_owned(),
        ));
    }
    if revealed.len() > max_bytes {
        return Err(ProverError::SpecificError(format!(
            "packed bytes exceed {} revealed bytes",
            max_bytes
        )));
    }

    String::from_utf8(revealed).map_err(|e| ProverError::SpecificError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pad_extends() {
        let padded = zero_pad(b"abc", 8).unwrap();
        assert_eq!(padded, b"abc\0\0\0\0\0".to_vec());
        assert_eq!(zero_pad(b"abc", 3).unwrap(), b"abc".to_vec());
        assert!(matches!(
            zero_pad(b"abc", 2),
            Err(ProverError::InvalidLength(_))
        ));
    }

    #[test]
    fn find_selector_positions() {
        assert_eq!(find_selector(b"You received 100.00", b"received"), Some(4));
        assert_eq!(find_selector(b"aab", b"ab"), Some(1));
        assert_eq!(find_selector(b"abc", b"abcd"), None);
        assert_eq!(find_selector(b"abc", b""), None);
    }

    #[test]
    fn packed_timestamp_roundtrip() {
        let packed = pack_bytes(b"1716487535", 31);
        assert_eq!(packed.len(), 1);

        let mut reversed = b"1716487535".to_vec();
        reversed.reverse();
        assert_eq!(packed[0], BigUint::from_bytes_be(&reversed));

        let mut signals = packed.clone();
        signals.push(BigUint::zero());
        assert_eq!(
            packed_bytes_to_string(&signals, 31, 31).unwrap(),
            "1716487535"
        );
    }

    #[test]
    fn packed_bytes_rejects_two_runs() {
        let packed = vec![BigUint::from_bytes_le(b"ab\0cd")];
        assert!(packed_bytes_to_string(&packed, 31, 31).is_err());
        assert!(packed_bytes_to_string(&pack_bytes(b"abcd", 31), 3, 31).is_err());
        assert!(packed_bytes_to_string(&[BigUint::zero()], 31, 31).is_err());
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(to_0x_hex([0xde, 0xad]), "0xdead");
    }
}
