use crate::{error::ProverError, sha256::BLOCK_BYTES, utils::find_selector, ProverResult};

pub fn locate_selector(buffer: &[u8], literal: &[u8]) -> ProverResult<usize> {
    find_selector(buffer, literal)
        .ok_or_else(|| ProverError::SelectorNotFound(String::from_utf8_lossy(literal).to_string()))
}

/// Block boundary at or before the selector, so the precomputed prefix never splits a
/// block that contains it.
pub fn cutoff_for_selector(buffer: &[u8], literal: &[u8]) -> ProverResult<usize> {
    let index = locate_selector(buffer, literal)?;
    Ok(index / BLOCK_BYTES * BLOCK_BYTES)
}

/// Offset of the first byte after `literal`.
pub fn selector_index(buffer: &[u8], literal: &[u8]) -> ProverResult<usize> {
    Ok(locate_selector(buffer, literal)? + literal.len())
}

/// Offset where the declared body hash value starts inside the signed header.
pub fn body_hash_index(header: &[u8], body_hash: &str) -> ProverResult<usize> {
    locate_selector(header, body_hash.as_bytes())
}
