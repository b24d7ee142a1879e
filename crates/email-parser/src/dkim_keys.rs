use std::{collections::HashMap, sync::Arc};

use base64::{engine::general_purpose, Engine as _};
use cfdkim::{dns::Lookup, DKIMError};
use futures::future::BoxFuture;
use num_bigint::BigUint;
use rsa::{
    pkcs1::DecodeRsaPublicKey,
    pkcs8::{DecodePublicKey, EncodePublicKey},
    traits::PublicKeyParts,
    Pkcs1v15Sign, RsaPublicKey,
};
use sha2::{Digest, Sha256};

use crate::{
    error::ParserError,
    types::{DkimVerification, ParsedEmail},
    ParserResult,
};

/// Checks the domain signature of an email and hands back the key material.
pub trait SignatureVerifier {
    fn verify_signature(
        &self,
        email_raw_data: &[u8],
        email: &ParsedEmail,
    ) -> ParserResult<DkimVerification>;
}

/// DKIM public keys indexed by `(domain, selector)`.
#[derive(Clone, Debug, Default)]
pub struct DkimKeyStore {
    keys: HashMap<(String, String), RsaPublicKey>,
}

fn key_id(domain: &str, selector: &str) -> (String, String) {
    (domain.to_lowercase(), selector.to_owned())
}

impl DkimKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, domain: &str, selector: &str, key: RsaPublicKey) {
        self.keys.insert(key_id(domain, selector), key);
    }

    pub fn get(&self, domain: &str, selector: &str) -> Option<&RsaPublicKey> {
        self.keys.get(&key_id(domain, selector))
    }

    /// Accepts both `BEGIN PUBLIC KEY` and `BEGIN RSA PUBLIC KEY` encodings.
    pub fn insert_pem(&mut self, domain: &str, selector: &str, pem: &str) -> ParserResult<()> {
        let key = match RsaPublicKey::from_public_key_pem(pem) {
            Ok(key) => key,
            Err(_) => RsaPublicKey::from_pkcs1_pem(pem)?,
        };
        self.insert(domain, selector, key);
        Ok(())
    }

    /// Registers the key published in a `<selector>._domainkey.<domain>` TXT record.
    pub fn insert_dns_record(
        &mut self,
        domain: &str,
        selector: &str,
        record: &str,
    ) -> ParserResult<()> {
        let (_, tags) = cfdkim::parse_tag_list(&record.replace("\" \"", ""))
            .map_err(|e| ParserError::InvalidPublicKey(e.to_string()))?;
        let get = |name: &str| tags.iter().find(|tag| tag.name == name);

        let key_type = get("k").map_or("rsa", |tag| tag.value.as_str());
        if key_type != "rsa" {
            return Err(ParserError::UnsupportedAlgorithm(key_type.to_owned()));
        }
        let public_key = match get("p") {
            Some(p) if !p.value.is_empty() => &p.value,
            Some(_) => return Err(ParserError::InvalidPublicKey("key revoked".to_owned())),
            None => return Err(ParserError::InvalidPublicKey("missing p= tag".to_owned())),
        };

        let der = general_purpose::STANDARD.decode(public_key)?;
        let key = match RsaPublicKey::from_public_key_der(&der) {
            Ok(key) => key,
            Err(_) => RsaPublicKey::from_pkcs1_der(&der)?,
        };
        self.insert(domain, selector, key);
        Ok(())
    }
}

/// Serves one stored key to cfdkim as the TXT record it would otherwise fetch from DNS.
struct KeyRecord {
    name: String,
    txt: String,
}

impl KeyRecord {
    fn new(domain: &str, selector: &str, key: &RsaPublicKey) -> ParserResult<Self> {
        let der = key.to_public_key_der()?;
        Ok(KeyRecord {
            name: format!("{}._domainkey.{}", selector, domain),
            txt: format!(
                "v=DKIM1; k=rsa; p={}",
                general_purpose::STANDARD.encode(der.as_bytes())
            ),
        })
    }
}

impl Lookup for KeyRecord {
    fn lookup_txt<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<String>, DKIMError>> {
        let found = if name.eq_ignore_ascii_case(&self.name) {
            Ok(vec![self.txt.clone()])
        } else {
            Err(DKIMError::NoKeyForSignature)
        };
        Box::pin(futures::future::ready(found))
    }
}

impl SignatureVerifier for DkimKeyStore {
    fn verify_signature(
        &self,
        email_raw_data: &[u8],
        email: &ParsedEmail,
    ) -> ParserResult<DkimVerification> {
        let dkim_header = &email.dkim_header;
        let key = self
            .get(&dkim_header.sdid, &dkim_header.selector)
            .ok_or_else(|| ParserError::PubkeyNotFound {
                domain: dkim_header.sdid.clone(),
                selector: dkim_header.selector.clone(),
            })?;

        let resolver = KeyRecord::new(&dkim_header.sdid, &dkim_header.selector, key)?;
        let mail = mailparse::parse_mail(email_raw_data)?;
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let result = futures::executor::block_on(cfdkim::verify_email_with_resolver(
            &logger,
            &dkim_header.sdid,
            &mail,
            Arc::new(resolver),
        ))?;
        if let Some(e) = result.error() {
            log::debug!("cfdkim rejected {}: {}", dkim_header.sdid, e);
        }

        // the circuit hashes `email_header`, so it has to be the exact signed message
        let header_signed = key
            .verify(
                Pkcs1v15Sign::new::<Sha256>(),
                &Sha256::digest(&email.email_header),
                &dkim_header.signature,
            )
            .is_ok();
        let valid = result.summary() == "pass" && header_signed;

        log::debug!(
            "dkim signature for {} (selector {}) valid: {}",
            dkim_header.sdid,
            dkim_header.selector,
            valid
        );

        Ok(DkimVerification {
            valid,
            modulus: BigUint::from_bytes_be(&key.n().to_bytes_be()),
            signature: email.signature_int(),
        })
    }
}
