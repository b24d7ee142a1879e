/// Error thrown while extracting or verifying the signed parts of an email.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("pubkey not found for `{domain}` selector `{selector}`")]
    PubkeyNotFound { domain: String, selector: String },
    #[error("header format error: `{0}`")]
    HeaderFormatError(String),
    #[error("no dkim-signature header for domain `{0}`")]
    DkimHeaderNotFound(String),
    #[error("unsupported signing algorithm `{0}`")]
    UnsupportedAlgorithm(String),
    #[error("unsupported canonicalization `{0}`")]
    UnsupportedCanonicalization(String),
    #[error("body hash mismatch: declared `{declared}`, computed `{computed}`")]
    BodyHashMismatch { declared: String, computed: String },
    #[error("invalid public key: `{0}`")]
    InvalidPublicKey(String),
    #[error("mail parsing error: `{0}`")]
    MailParse(#[from] mailparse::MailParseError),
    #[error("dkim error: `{0}`")]
    Dkim(#[from] cfdkim::DKIMError),
    #[error("base64 error: `{0}`")]
    Base64(#[from] base64::DecodeError),
    #[error("error:`{0}`")]
    SpecificError(String),
}

impl From<rsa::pkcs8::spki::Error> for ParserError {
    fn from(e: rsa::pkcs8::spki::Error) -> Self {
        ParserError::InvalidPublicKey(format!("{:?}", e))
    }
}

impl From<rsa::pkcs1::Error> for ParserError {
    fn from(e: rsa::pkcs1::Error) -> Self {
        ParserError::InvalidPublicKey(format!("{:?}", e))
    }
}
