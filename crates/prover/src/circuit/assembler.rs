use crate::{
    error::ProverError,
    limbs::{field_element_from_digest, to_circom_bigint_bytes},
    parameters::VariantParameters,
    selector::{body_hash_index, cutoff_for_selector, selector_index},
    sha256::{partial_sha, sha256_pad, sha_hash, state_to_bytes, BLOCK_BYTES},
    types::{CircuitInputRecord, EmailInputs},
    utils::{bytes_to_decimal_strings, zero_pad},
    ProverResult,
};

/// Body capacity: the variant's fixed size, or enough blocks for the body plus its padding.
pub fn body_capacity(body_len: usize, max_body_bytes: usize) -> usize {
    let calc_length = (body_len + 65 + BLOCK_BYTES - 1) / BLOCK_BYTES * BLOCK_BYTES;
    max_body_bytes.max(calc_length)
}

/// Compiles one verified email into the circuit input record.
///
/// Nothing is returned unless every padding, hashing and selector step succeeds.
pub fn assemble_inputs(
    inputs: &EmailInputs,
    params: &VariantParameters,
) -> ProverResult<CircuitInputRecord> {
    params.validate()?;

    let header = &inputs.email_header;
    let header_hash = sha_hash(header);
    let base_message = field_element_from_digest(&header_hash);

    let header_padded = sha256_pad(header, params.max_header_bytes)?;
    let body_padded = sha256_pad(
        &inputs.email_body,
        body_capacity(inputs.email_body.len(), params.max_body_bytes),
    )?;

    // the padding must reproduce the plain digest or the circuit can never verify it
    let header_state = partial_sha(&header_padded.bytes, header_padded.padded_len)?;
    if state_to_bytes(&header_state) != header_hash {
        return Err(ProverError::HashMismatch);
    }

    let body = &body_padded.bytes[..body_padded.padded_len];
    let cutoff = cutoff_for_selector(body, params.body_preselector.as_bytes())?;
    let precompute_text = &body[..cutoff];
    let body_remaining = &body[cutoff..];
    let body_remaining_len = body_remaining.len();

    log::debug!(
        "body padded len: {}, sha cutoff: {}, {} bytes remaining in body",
        body_padded.padded_len,
        cutoff,
        body_remaining_len
    );

    if body_remaining_len % BLOCK_BYTES != 0 {
        return Err(ProverError::MisalignedRemainder(body_remaining_len));
    }
    if body_remaining_len >= params.max_body_bytes {
        return Err(ProverError::RemainderTooLarge {
            remaining: body_remaining_len,
            capacity: params.max_body_bytes,
        });
    }
    let body_remaining = zero_pad(body_remaining, params.max_body_bytes)?;
    let precomputed_sha = partial_sha(precompute_text, cutoff)?;

    let body_hash_idx = body_hash_index(header, &inputs.body_hash)?;
    let email_from_idx = selector_index(header, params.sender_selector.as_bytes())?;
    let email_timestamp_idx = selector_index(header, params.timestamp_selector.as_bytes())?;
    let amount_idx = selector_index(&body_remaining, params.amount_selector.as_bytes())?;
    let reference_code_idx =
        selector_index(&body_remaining, params.reference_code_selector.as_bytes())?;

    log::trace!(
        "indices: body hash {}, from {}, timestamp {}, amount {}, reference {}",
        body_hash_idx,
        email_from_idx,
        email_timestamp_idx,
        amount_idx,
        reference_code_idx
    );

    Ok(CircuitInputRecord {
        modulus: to_circom_bigint_bytes(&inputs.modulus)?,
        signature: to_circom_bigint_bytes(&inputs.signature)?,
        base_message: to_circom_bigint_bytes(&base_message)?,
        in_padded: bytes_to_decimal_strings(&header_padded.bytes),
        in_len_padded_bytes: header_padded.padded_len.to_string(),
        in_body_padded: bytes_to_decimal_strings(&body_remaining),
        in_body_len_padded_bytes: body_remaining_len.to_string(),
        precomputed_sha: bytes_to_decimal_strings(&state_to_bytes(&precomputed_sha)),
        body_hash_idx: body_hash_idx.to_string(),
        email_from_idx: email_from_idx.to_string(),
        email_timestamp_idx: email_timestamp_idx.to_string(),
        amount_idx: amount_idx.to_string(),
        reference_code_idx: reference_code_idx.to_string(),
        intent_hash: inputs.intent_hash.clone(),
    })
}
