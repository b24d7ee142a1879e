use std::path::PathBuf;

use email_parser::types::{DkimVerification, ParsedEmail};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::ProverResult;

/// What the assembler needs from one verified email.
#[derive(Clone, Debug)]
pub struct EmailInputs {
    pub signature: BigUint,
    pub modulus: BigUint,
    pub email_header: Vec<u8>,
    pub email_body: Vec<u8>,
    pub body_hash: String,
    pub intent_hash: Option<String>,
}

impl EmailInputs {
    pub fn new(
        parsed: ParsedEmail,
        verification: DkimVerification,
        intent_hash: Option<String>,
    ) -> Self {
        EmailInputs {
            signature: verification.signature,
            modulus: verification.modulus,
            email_header: parsed.email_header,
            email_body: parsed.email_body,
            body_hash: parsed.dkim_header.body_hash,
            intent_hash,
        }
    }
}

/// Circuit witness inputs, keyed by signal name. Every value is a decimal string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitInputRecord {
    pub modulus: Vec<String>,
    pub signature: Vec<String>,
    pub base_message: Vec<String>,
    pub in_padded: Vec<String>,
    pub in_len_padded_bytes: String,
    pub in_body_padded: Vec<String>,
    pub in_body_len_padded_bytes: String,
    pub precomputed_sha: Vec<String>,
    pub body_hash_idx: String,
    pub email_from_idx: String,
    pub email_timestamp_idx: String,
    pub amount_idx: String,
    pub reference_code_idx: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_hash: Option<String>,
}

impl CircuitInputRecord {
    pub fn to_json_pretty(&self) -> ProverResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Compiled circuit files handed to the proving backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitArtifacts {
    pub wasm: PathBuf,
    pub zkey: PathBuf,
    pub vkey: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOutput {
    pub proof: serde_json::Value,
    pub public_signals: Vec<String>,
}
