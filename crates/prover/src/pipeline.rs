use std::path::Path;

use email_parser::{parser::parse_email_with_domain, SignatureVerifier};

use crate::{
    circuit::{assembler::assemble_inputs, variant::CircuitVariant},
    error::{PipelineError, ProverError},
    parameters::VariantParameters,
    sha256::sha_hash,
    types::{CircuitArtifacts, CircuitInputRecord, EmailInputs, ProofOutput},
    utils::to_0x_hex,
    ProverResult,
};

/// Generates and checks proofs from a circuit input record.
pub trait ProvingBackend {
    fn prove(
        &self,
        inputs: CircuitInputRecord,
        artifacts: &CircuitArtifacts,
    ) -> ProverResult<ProofOutput>;

    fn verify(&self, output: &ProofOutput, artifacts: &CircuitArtifacts) -> ProverResult<bool>;
}

/// Identifier attached to every pipeline failure: the 0x-hex sha256 of the raw email.
pub fn email_id(email_raw_data: &[u8]) -> String {
    to_0x_hex(sha_hash(email_raw_data))
}

fn tag(email_id: &str) -> impl Fn(ProverError) -> PipelineError + '_ {
    move |source| PipelineError {
        email_id: email_id.to_owned(),
        source,
    }
}

fn compile_email<V>(
    email_raw_data: &[u8],
    params: &VariantParameters,
    intent_hash: Option<String>,
    verifier: &V,
) -> ProverResult<CircuitInputRecord>
where
    V: SignatureVerifier + ?Sized,
{
    // a body hash mismatch surfaces as an invalid signature from the verifier
    let parsed = parse_email_with_domain(email_raw_data, &params.signing_domain, true)?;
    let verification = verifier.verify_signature(email_raw_data, &parsed)?;
    if !verification.valid {
        return Err(ProverError::InvalidSignature(params.signing_domain.clone()));
    }

    let inputs = EmailInputs::new(parsed, verification, intent_hash);
    assemble_inputs(&inputs, params)
}

pub fn generate_inputs_with_parameters<V>(
    email_raw_data: &[u8],
    params: &VariantParameters,
    intent_hash: Option<String>,
    verifier: &V,
) -> Result<CircuitInputRecord, PipelineError>
where
    V: SignatureVerifier + ?Sized,
{
    let id = email_id(email_raw_data);
    log::info!("generating inputs for email {}", id);

    let record =
        compile_email(email_raw_data, params, intent_hash, verifier).map_err(tag(&id))?;
    log::info!(
        "email {}: header {} bytes, body remainder {} bytes",
        id,
        record.in_len_padded_bytes,
        record.in_body_len_padded_bytes
    );
    Ok(record)
}

/// Parses, verifies and compiles one raw email for `variant`.
pub fn generate_inputs<V>(
    email_raw_data: &[u8],
    variant: CircuitVariant,
    intent_hash: Option<String>,
    verifier: &V,
) -> Result<CircuitInputRecord, PipelineError>
where
    V: SignatureVerifier + ?Sized,
{
    let params = variant
        .parameters()
        .map_err(tag(&email_id(email_raw_data)))?;
    generate_inputs_with_parameters(email_raw_data, &params, intent_hash, verifier)
}

/// Compiles the inputs, then proves and verifies them against the artifacts in `build_dir`.
pub fn prove_email<V, B, P>(
    email_raw_data: &[u8],
    variant: CircuitVariant,
    intent_hash: Option<String>,
    verifier: &V,
    backend: &B,
    build_dir: P,
) -> Result<ProofOutput, PipelineError>
where
    V: SignatureVerifier + ?Sized,
    B: ProvingBackend + ?Sized,
    P: AsRef<Path>,
{
    let record = generate_inputs(email_raw_data, variant, intent_hash, verifier)?;

    let id = email_id(email_raw_data);
    let artifacts = variant.artifacts(build_dir);
    log::debug!("proving email {} with {:?}", id, artifacts);

    let output = backend.prove(record, &artifacts).map_err(tag(&id))?;
    let valid = backend.verify(&output, &artifacts).map_err(tag(&id))?;
    if !valid {
        return Err(tag(&id)(ProverError::SpecificError(
            "proof verification failed".to_owned(),
        )));
    }

    log::info!("email {}: proof verified", id);
    Ok(output)
}
