use base64::{engine::general_purpose, Engine as _};
use cfdkim::Tag;
use mailparse::MailHeader;
use sha2::{Digest, Sha256};

use crate::{
    error::ParserError,
    types::{Canonicalization, DkimHeader, ParsedEmail},
    ParserResult,
};

const DKIM_SIGNATURE: &str = "DKIM-Signature";
const REQUIRED_TAGS: [&str; 7] = ["v", "a", "b", "bh", "d", "h", "s"];

fn parse_tags(value: &str) -> ParserResult<Vec<Tag>> {
    let (rest, tags) =
        cfdkim::parse_tag_list(value).map_err(|e| ParserError::HeaderFormatError(e.to_string()))?;
    if !rest.trim().is_empty() {
        return Err(ParserError::HeaderFormatError(rest.trim().to_owned()));
    }
    for (i, tag) in tags.iter().enumerate() {
        if tags[..i].iter().any(|seen| seen.name == tag.name) {
            return Err(ParserError::HeaderFormatError(format!(
                "duplicate `{}=` tag",
                tag.name
            )));
        }
    }
    Ok(tags)
}

fn parse_canonicalization(value: &str) -> ParserResult<Canonicalization> {
    match value {
        "simple" => Ok(Canonicalization::Simple),
        "relaxed" => Ok(Canonicalization::Relaxed),
        other => Err(ParserError::UnsupportedCanonicalization(other.to_owned())),
    }
}

pub fn parse_dkim_header(value: &[u8]) -> ParserResult<DkimHeader> {
    let value = String::from_utf8_lossy(value);
    let tags = parse_tags(&value)?;
    let get = |name: &str| tags.iter().find(|tag| tag.name == name);
    let value_of = |name: &str| get(name).map(|tag| tag.value.as_str()).unwrap_or_default();

    for name in REQUIRED_TAGS {
        if get(name).is_none() {
            return Err(ParserError::HeaderFormatError(format!(
                "missing `{}=` tag",
                name
            )));
        }
    }

    let algorithm = value_of("a").to_lowercase();
    if algorithm != "rsa-sha256" {
        return Err(ParserError::UnsupportedAlgorithm(algorithm));
    }

    // an absent `c=` means simple/simple, a lone algorithm applies to the header only
    let (header_canonicalization, body_canonicalization) = match get("c") {
        None => (Canonicalization::Simple, Canonicalization::Simple),
        Some(c) => match c.value.split_once('/') {
            Some((header, body)) => (
                parse_canonicalization(header)?,
                parse_canonicalization(body)?,
            ),
            None => (parse_canonicalization(&c.value)?, Canonicalization::Simple),
        },
    };

    let body_length = match get("l") {
        Some(l) => Some(
            l.value
                .parse::<usize>()
                .map_err(|_| ParserError::HeaderFormatError(format!("l={}", l.value)))?,
        ),
        None => None,
    };

    let signature = general_purpose::STANDARD.decode(value_of("b"))?;

    Ok(DkimHeader {
        algorithm,
        sdid: value_of("d").to_owned(),
        selector: value_of("s").to_owned(),
        header_canonicalization,
        body_canonicalization,
        signed_headers: value_of("h")
            .split(':')
            .filter(|name| !name.is_empty())
            .map(|name| name.to_lowercase())
            .collect(),
        body_hash: value_of("bh").to_owned(),
        body_length,
        raw_signature: get("b").map(|b| b.raw_value.clone()).unwrap_or_default(),
        signature,
    })
}

/// Unfolds a header value, collapses whitespace runs and trims both ends.
fn relaxed_header_value(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut pending_space = false;
    for &b in value {
        match b {
            b'\r' | b'\n' => {}
            b' ' | b'\t' => pending_space = true,
            _ => {
                if pending_space && !out.is_empty() {
                    out.push(b' ');
                }
                pending_space = false;
                out.push(b);
            }
        }
    }
    out
}

pub fn canonicalize_header_relaxed(key: &str, value: &[u8]) -> Vec<u8> {
    let mut out = key.trim().to_lowercase().into_bytes();
    out.push(b':');
    out.extend(relaxed_header_value(value));
    out
}

/// `value` is the raw value as split by mailparse, which drops the spaces after the colon.
pub fn canonicalize_header_simple(key: &str, value: &[u8]) -> Vec<u8> {
    let mut out = key.as_bytes().to_vec();
    out.extend_from_slice(b": ");
    out.extend_from_slice(value);
    out
}

fn canonicalize_header(kind: Canonicalization, key: &str, value: &[u8]) -> Vec<u8> {
    match kind {
        Canonicalization::Simple => canonicalize_header_simple(key, value),
        Canonicalization::Relaxed => canonicalize_header_relaxed(key, value),
    }
}

fn canonicalize_signed_headers(
    headers: &[MailHeader<'_>],
    dkim_index: usize,
    dkim_header: &DkimHeader,
) -> Vec<u8> {
    let kind = dkim_header.header_canonicalization;
    let mut used = vec![false; headers.len()];
    used[dkim_index] = true;

    let mut out = vec![];
    for name in &dkim_header.signed_headers {
        // repeated names consume occurrences from the bottom of the header block upwards
        let found = (0..headers.len())
            .rev()
            .find(|&i| !used[i] && headers[i].get_key_ref().eq_ignore_ascii_case(name));
        if let Some(i) = found {
            used[i] = true;
            out.extend(canonicalize_header(
                kind,
                &headers[i].get_key_ref(),
                headers[i].get_value_raw(),
            ));
            out.extend_from_slice(b"\r\n");
        }
    }

    // the signature header is hashed with its `b=` value removed and without the final CRLF
    let dkim_value = String::from_utf8_lossy(headers[dkim_index].get_value_raw());
    let unsigned = if dkim_header.raw_signature.is_empty() {
        dkim_value.into_owned()
    } else {
        dkim_value.replace(&dkim_header.raw_signature, "")
    };
    out.extend(canonicalize_header(kind, DKIM_SIGNATURE, unsigned.as_bytes()));

    log::trace!("canonical header len: {}", out.len());

    out
}

pub fn canonicalize_body_simple(body: &[u8]) -> Vec<u8> {
    let mut end = body.len();
    while end >= 2 && &body[end - 2..end] == b"\r\n" {
        end -= 2;
    }
    let mut out = body[..end].to_vec();
    out.extend_from_slice(b"\r\n");
    out
}

pub fn canonicalize_body_relaxed(body: &[u8]) -> Vec<u8> {
    let mut lines: Vec<Vec<u8>> = body
        .split(|&b| b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let mut out = Vec::with_capacity(line.len());
            let mut pending_space = false;
            for &b in line {
                if b == b' ' || b == b'\t' {
                    pending_space = true;
                } else {
                    if pending_space {
                        out.push(b' ');
                    }
                    pending_space = false;
                    out.push(b);
                }
            }
            out
        })
        .collect();

    while lines.last().map_or(false, |line| line.is_empty()) {
        lines.pop();
    }

    let mut out = vec![];
    for line in lines {
        out.extend(line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

pub fn canonicalize_body(body: &[u8], dkim_header: &DkimHeader) -> Vec<u8> {
    let mut canonical = match dkim_header.body_canonicalization {
        Canonicalization::Simple => canonicalize_body_simple(body),
        Canonicalization::Relaxed => canonicalize_body_relaxed(body),
    };
    if let Some(limit) = dkim_header.body_length {
        canonical.truncate(limit);
    }
    canonical
}

pub fn body_hash(canonical_body: &[u8]) -> String {
    general_purpose::STANDARD.encode(Sha256::digest(canonical_body))
}

fn parse_email_by<P>(
    email_raw_data: &[u8],
    ignore_body_hash_check: bool,
    domain_label: &str,
    predicate: P,
) -> ParserResult<ParsedEmail>
where
    P: Fn(&DkimHeader) -> bool,
{
    let (headers, body_index) = mailparse::parse_headers(email_raw_data)?;

    let mut chosen = None;
    for (i, header) in headers.iter().enumerate() {
        if !header.get_key_ref().eq_ignore_ascii_case(DKIM_SIGNATURE) {
            continue;
        }
        match parse_dkim_header(header.get_value_raw()) {
            Ok(dkim_header) if predicate(&dkim_header) => {
                chosen = Some((i, dkim_header));
                break;
            }
            Ok(dkim_header) => {
                log::trace!("skip dkim-signature for domain {}", dkim_header.sdid);
            }
            Err(e) => {
                log::debug!("skip unusable dkim-signature header: {}", e);
            }
        }
    }

    let (dkim_index, dkim_header) = match chosen {
        Some(chosen) => chosen,
        None => return Err(ParserError::DkimHeaderNotFound(domain_label.to_owned())),
    };

    let email_header = canonicalize_signed_headers(&headers, dkim_index, &dkim_header);
    let raw_body = email_raw_data.get(body_index..).unwrap_or(&[]);
    let email_body = canonicalize_body(raw_body, &dkim_header);

    let computed = body_hash(&email_body);
    if computed != dkim_header.body_hash {
        if ignore_body_hash_check {
            log::debug!(
                "body hash mismatch ignored: declared {}, computed {}",
                dkim_header.body_hash,
                computed
            );
        } else {
            return Err(ParserError::BodyHashMismatch {
                declared: dkim_header.body_hash.clone(),
                computed,
            });
        }
    }

    Ok(ParsedEmail {
        email_header,
        email_body,
        dkim_header,
    })
}

pub fn parse_email_with_domain(
    email_raw_data: &[u8],
    domain: &str,
    ignore_body_hash_check: bool,
) -> ParserResult<ParsedEmail> {
    parse_email_by(email_raw_data, ignore_body_hash_check, domain, |dkim_header| {
        dkim_header.sdid.eq_ignore_ascii_case(domain)
    })
}

pub fn parse_email(email_raw_data: &[u8], ignore_body_hash_check: bool) -> ParserResult<ParsedEmail> {
    parse_email_by(email_raw_data, ignore_body_hash_check, "*", |_| true)
}

#[cfg(test)]
mod tests {
    use cfdkim::{canonicalization::Type, DkimPrivateKey, SignerBuilder};
    use rand::{rngs::StdRng, SeedableRng};
    use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

    use super::*;

    fn signed_email(body: &str) -> String {
        let bh = body_hash(&canonicalize_body_relaxed(body.as_bytes()));
        format!(
            "From: Wise <noreply@wise.com>\r\n\
             To: alice@example.com\r\n\
             Subject:  You received\r\n \tmoney\r\n\
             DKIM-Signature: v=1; a=rsa-sha256; c=relaxed/relaxed; d=wise.com;\r\n \
             s=s1; t=1716487535; h=from:to:subject;\r\n \
             bh={}; b=AAEC\r\n \
             AwQ=\r\n\
             \r\n\
             {}",
            bh, body
        )
    }

    const MESSAGE: &str = "From: Wise <noreply@wise.com>\r\n\
        To: alice@example.com\r\n\
        Subject: You received\r\n \tmoney\r\n\
        \r\n\
        Hello  Alice,\r\n\
        \r\n\
        You received 100.00 EUR\r\n\
        \r\n";

    /// Signs `MESSAGE` with cfdkim's own signer.
    fn cfdkim_signed(private_key: &RsaPrivateKey, header: Type, body: Type) -> Vec<u8> {
        let email = mailparse::parse_mail(MESSAGE.as_bytes()).unwrap();
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let signer = SignerBuilder::new()
            .with_signed_headers(&["From", "To", "Subject"])
            .unwrap()
            .with_private_key(DkimPrivateKey::Rsa(private_key.clone()))
            .with_selector("s1")
            .with_signing_domain("wise.com")
            .with_logger(&logger)
            .with_header_canonicalization(header)
            .with_body_canonicalization(body)
            .build()
            .unwrap();
        let signature = signer.sign(&email).unwrap();
        [signature.as_bytes(), b"\r\n", MESSAGE.as_bytes()].concat()
    }

    fn header_is_signed(public_key: &RsaPublicKey, parsed: &ParsedEmail) -> bool {
        public_key
            .verify(
                Pkcs1v15Sign::new::<Sha256>(),
                &Sha256::digest(&parsed.email_header),
                &parsed.dkim_header.signature,
            )
            .is_ok()
    }

    #[test]
    fn relaxed_header_canonicalization() {
        assert_eq!(
            canonicalize_header_relaxed("Subject", b"  You received\r\n \tmoney  "),
            b"subject:You received money".to_vec()
        );
    }

    #[test]
    fn simple_header_canonicalization() {
        assert_eq!(
            canonicalize_header_simple("Subject", b"You received\r\n \tmoney"),
            b"Subject: You received\r\n \tmoney".to_vec()
        );
    }

    #[test]
    fn relaxed_body_canonicalization() {
        let body = b"Hello  \t world \r\nline two\r\n\r\n\r\n";
        assert_eq!(
            canonicalize_body_relaxed(body),
            b"Hello world\r\nline two\r\n".to_vec()
        );
        assert!(canonicalize_body_relaxed(b"\r\n\r\n").is_empty());
    }

    #[test]
    fn simple_body_canonicalization() {
        assert_eq!(canonicalize_body_simple(b""), b"\r\n".to_vec());
        assert_eq!(
            canonicalize_body_simple(b"a \r\nb\r\n\r\n"),
            b"a \r\nb\r\n".to_vec()
        );
    }

    #[test]
    fn parse_signed_header() {
        let raw = signed_email("Hello\r\nYou received 100.00 EUR\r\n");
        let parsed = parse_email_with_domain(raw.as_bytes(), "wise.com", false).unwrap();

        assert_eq!(parsed.dkim_header.sdid, "wise.com");
        assert_eq!(parsed.dkim_header.selector, "s1");
        assert_eq!(parsed.dkim_header.signature, vec![0, 1, 2, 3, 4]);
        assert_eq!(parsed.dkim_header.raw_signature, "AAEC\r\n AwQ=");
        assert_eq!(
            parsed.dkim_header.signed_headers,
            vec!["from", "to", "subject"]
        );

        let expected = format!(
            "from:Wise <noreply@wise.com>\r\n\
             to:alice@example.com\r\n\
             subject:You received money\r\n\
             dkim-signature:v=1; a=rsa-sha256; c=relaxed/relaxed; d=wise.com; \
             s=s1; t=1716487535; h=from:to:subject; bh={}; b=",
            parsed.dkim_header.body_hash
        );
        assert_eq!(String::from_utf8_lossy(&parsed.email_header), expected);
        assert_eq!(parsed.email_body, b"Hello\r\nYou received 100.00 EUR\r\n".to_vec());
    }

    #[test]
    fn parse_simple_header() {
        let raw = signed_email("Hello\r\n").replace("c=relaxed/relaxed", "c=simple/relaxed");
        let parsed = parse_email(raw.as_bytes(), false).unwrap();
        assert_eq!(
            parsed.dkim_header.header_canonicalization,
            Canonicalization::Simple
        );

        let expected = format!(
            "From: Wise <noreply@wise.com>\r\n\
             To: alice@example.com\r\n\
             Subject: You received\r\n \tmoney\r\n\
             DKIM-Signature: v=1; a=rsa-sha256; c=simple/relaxed; d=wise.com;\r\n \
             s=s1; t=1716487535; h=from:to:subject;\r\n \
             bh={}; b=",
            parsed.dkim_header.body_hash
        );
        assert_eq!(String::from_utf8_lossy(&parsed.email_header), expected);
    }

    #[test]
    fn canonicalization_defaults() {
        let header = |c: &str| {
            parse_dkim_header(
                format!("v=1; a=rsa-sha256; {}d=wise.com; s=s1; h=from; bh=YQ==; b=YQ==", c)
                    .as_bytes(),
            )
        };

        let missing = header("").unwrap();
        assert_eq!(missing.header_canonicalization, Canonicalization::Simple);
        assert_eq!(missing.body_canonicalization, Canonicalization::Simple);

        let header_only = header("c=relaxed; ").unwrap();
        assert_eq!(header_only.header_canonicalization, Canonicalization::Relaxed);
        assert_eq!(header_only.body_canonicalization, Canonicalization::Simple);

        assert!(matches!(
            header("c=nowsp/simple; "),
            Err(ParserError::UnsupportedCanonicalization(_))
        ));
    }

    #[test]
    fn malformed_tag_lists() {
        assert!(matches!(
            parse_dkim_header(b"v=1; a=rsa-sha256; d=wise.com; s=s1; h=from; bh=YQ=="),
            Err(ParserError::HeaderFormatError(_))
        ));
        assert!(matches!(
            parse_dkim_header(b"v=1; a=rsa-sha256; d=wise.com; d=evil.com; s=s1; h=from; bh=YQ==; b="),
            Err(ParserError::HeaderFormatError(_))
        ));
        assert!(matches!(
            parse_dkim_header(b"v=1; a=rsa-sha1; d=wise.com; s=s1; h=from; bh=YQ==; b="),
            Err(ParserError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn canonical_bytes_match_cfdkim_signer() {
        let mut rng = StdRng::seed_from_u64(5);
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public_key = RsaPublicKey::from(&private_key);

        for (header, body) in [
            (Type::Simple, Type::Simple),
            (Type::Simple, Type::Relaxed),
            (Type::Relaxed, Type::Simple),
            (Type::Relaxed, Type::Relaxed),
        ] {
            let label = format!("{}/{}", header.to_string(), body.to_string());
            let raw = cfdkim_signed(&private_key, header, body);
            let parsed = parse_email_with_domain(&raw, "wise.com", false)
                .unwrap_or_else(|e| panic!("{}: {}", label, e));
            assert!(header_is_signed(&public_key, &parsed), "{}", label);
        }
    }

    #[test]
    fn simple_canonical_bytes() {
        let mut rng = StdRng::seed_from_u64(5);
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let raw = cfdkim_signed(&private_key, Type::Simple, Type::Simple);
        let parsed = parse_email(&raw, false).unwrap();

        let header = String::from_utf8(parsed.email_header).unwrap();
        assert!(header.starts_with(
            "From: Wise <noreply@wise.com>\r\n\
             To: alice@example.com\r\n\
             Subject: You received\r\n \tmoney\r\n\
             DKIM-Signature: v=1; a=rsa-sha256; d=wise.com; s=s1; c=simple/simple; bh="
        ));
        assert!(header.ends_with("; b=;"));
        assert_eq!(
            parsed.email_body,
            b"Hello  Alice,\r\n\r\nYou received 100.00 EUR\r\n".to_vec()
        );
    }

    #[test]
    fn body_hash_mismatch() {
        let raw = signed_email("Hello\r\n").replace("Hello", "Bye");

        match parse_email(raw.as_bytes(), false) {
            Err(ParserError::BodyHashMismatch { .. }) => {}
            other => panic!("unexpected result: {:?}", other.map(|p| p.dkim_header)),
        }
        assert!(parse_email(raw.as_bytes(), true).is_ok());
    }

    #[test]
    fn domain_not_found() {
        let raw = signed_email("Hello\r\n");
        assert!(matches!(
            parse_email_with_domain(raw.as_bytes(), "venmo.com", true),
            Err(ParserError::DkimHeaderNotFound(_))
        ));
    }
}
