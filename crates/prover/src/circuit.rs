pub mod assembler;
pub mod variant;
