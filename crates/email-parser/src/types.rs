use num_bigint::BigUint;
use serde::{de, Deserialize, Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Canonicalization {
    Simple,
    Relaxed,
}

/// The tags of one `DKIM-Signature` header that the pipeline relies on.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimHeader {
    pub algorithm: String,
    pub sdid: String,
    pub selector: String,
    pub header_canonicalization: Canonicalization,
    pub body_canonicalization: Canonicalization,
    pub signed_headers: Vec<String>,
    pub body_hash: String,
    pub body_length: Option<usize>,
    /// `b=` as written in the header, folding whitespace included.
    pub raw_signature: String,
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub signature: Vec<u8>,
}

/// Canonicalized signed header and body of an email, as hashed by the signer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEmail {
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub email_header: Vec<u8>,
    #[serde(
        deserialize_with = "deserialize_hex_string",
        serialize_with = "serialize_hex_string"
    )]
    pub email_body: Vec<u8>,
    pub dkim_header: DkimHeader,
}

impl ParsedEmail {
    pub fn signature_int(&self) -> BigUint {
        BigUint::from_bytes_be(&self.dkim_header.signature)
    }
}

#[derive(Clone, Debug)]
pub struct DkimVerification {
    pub valid: bool,
    pub modulus: BigUint,
    pub signature: BigUint,
}

pub fn deserialize_hex_string<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let s: String = de::Deserialize::deserialize(deserializer)?;
    Ok(hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| de::Error::custom(format!("deserialize call failed:{:?}", e)))?)
}

pub fn serialize_hex_string<S>(v: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut s = String::from("0x");
    s += &hex::encode(v);
    serializer.serialize_str(&s)
}
