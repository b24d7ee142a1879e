use error::ProverError;

pub mod circuit;
pub mod error;
pub mod limbs;
pub mod parameters;
pub mod pipeline;
pub mod selector;
pub mod sha256;
pub mod types;
pub mod utils;

pub type ProverResult<T> = Result<T, ProverError>;
