use sha2::{
    digest::{consts::U64, generic_array::GenericArray},
    Digest, Sha256,
};

use crate::{error::ProverError, ProverResult};

pub const BLOCK_BYTES: usize = 64;

pub const INIT_SHA256HASH: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// A message with SHA-256 padding, zero-extended to a fixed capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaddedMessage {
    pub bytes: Vec<u8>,
    /// message + 0x80 + zeros + 64-bit length, always a multiple of 64
    pub padded_len: usize,
}

/// Length of `message_len` bytes once the mandatory padding is appended.
pub fn padded_len(message_len: usize) -> usize {
    (message_len + 9 + BLOCK_BYTES - 1) / BLOCK_BYTES * BLOCK_BYTES
}

pub fn sha256_pad(message: &[u8], max_len: usize) -> ProverResult<PaddedMessage> {
    if max_len % BLOCK_BYTES != 0 {
        return Err(ProverError::InvalidLength(format!(
            "capacity {} is not a multiple of {}",
            max_len, BLOCK_BYTES
        )));
    }
    let padded_len = padded_len(message.len());
    if padded_len > max_len {
        return Err(ProverError::CapacityExceeded {
            required: padded_len,
            capacity: max_len,
        });
    }

    let mut bytes = vec![0u8; max_len];
    bytes[..message.len()].copy_from_slice(message);
    bytes[message.len()] = 1u8 << 7;

    let bits_len = ((message.len() as u64) * 8).to_be_bytes();
    bytes[padded_len - 8..padded_len].copy_from_slice(&bits_len);

    log::trace!(
        "input_bytes len: {}, padded_len: {}, max_len: {}",
        message.len(),
        padded_len,
        max_len
    );

    Ok(PaddedMessage { bytes, padded_len })
}

/// Runs the compression function from `state` over whole 64-byte blocks.
pub fn sha256_resume(mut state: [u32; 8], blocks: &[u8]) -> ProverResult<[u32; 8]> {
    if blocks.len() % BLOCK_BYTES != 0 {
        return Err(ProverError::MisalignedCutoff(blocks.len()));
    }
    let blocks: Vec<GenericArray<u8, U64>> = blocks
        .chunks_exact(BLOCK_BYTES)
        .map(GenericArray::clone_from_slice)
        .collect();
    sha2::compress256(&mut state, &blocks);
    Ok(state)
}

/// Intermediate state after hashing the first `cutoff` bytes of a padded buffer.
pub fn partial_sha(padded: &[u8], cutoff: usize) -> ProverResult<[u32; 8]> {
    if cutoff % BLOCK_BYTES != 0 {
        return Err(ProverError::MisalignedCutoff(cutoff));
    }
    if cutoff > padded.len() {
        return Err(ProverError::InvalidLength(format!(
            "cutoff {} beyond buffer of {} bytes",
            cutoff,
            padded.len()
        )));
    }
    sha256_resume(INIT_SHA256HASH, &padded[..cutoff])
}

pub fn state_to_bytes(state: &[u32; 8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

pub fn sha_hash(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}
