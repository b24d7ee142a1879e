use std::io;

use email_parser::error::ParserError;

/// Error thrown while compiling an email into circuit inputs.
#[derive(Debug, thiserror::Error)]
pub enum ProverError {
    #[error("invalid length: `{0}`")]
    InvalidLength(String),
    #[error("capacity exceeded: {required} bytes required, {capacity} available")]
    CapacityExceeded { required: usize, capacity: usize },
    #[error("cutoff {0} is not a multiple of 64")]
    MisalignedCutoff(usize),
    #[error("selector `{0}` not found")]
    SelectorNotFound(String),
    #[error("sha256 calculation did not match")]
    HashMismatch,
    #[error("body remainder of {0} bytes is not a multiple of 64")]
    MisalignedRemainder(usize),
    #[error("body remainder of {remaining} bytes does not fit capacity {capacity}")]
    RemainderTooLarge { remaining: usize, capacity: usize },
    #[error("value of {bits} bits does not fit {limb_count} limbs of {limb_bits} bits")]
    Overflow {
        bits: u64,
        limb_bits: usize,
        limb_count: usize,
    },
    #[error("circuit variant `{0}` is not supported")]
    UnsupportedVariant(String),
    #[error("dkim signature is not valid for `{0}`")]
    InvalidSignature(String),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error("error:`{0}`")]
    SpecificError(String),
}

/// A failed pipeline run, tagged with the email it was run on.
#[derive(Debug, thiserror::Error)]
#[error("email {email_id}: {source}")]
pub struct PipelineError {
    pub email_id: String,
    #[source]
    pub source: ProverError,
}
