//! ACS3-HMAC-SHA256 request signing
//!
//! RPC-style calls carry every parameter in the query string and send an
//! empty body, so the payload hash is the constant SHA-256 of "".
//! Reference: <https://www.alibabacloud.com/help/en/sdk/product-overview/v3-request-structure-and-signature>

use ddns_core::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub(crate) const ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// SHA-256 of the empty body
pub(crate) const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const SIGNED_HEADERS: &str =
    "host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version";

/// Everything that goes into one request signature
pub(crate) struct SigningInput<'a> {
    pub host: &'a str,
    pub action: &'a str,
    pub version: &'a str,
    pub canonical_query: &'a str,
    pub timestamp: &'a str,
    pub nonce: &'a str,
}

/// Build the `Authorization` header value
pub(crate) fn authorization(key_id: &str, secret: &str, input: &SigningInput<'_>) -> Result<String> {
    let canonical_headers = format!(
        "host:{}\nx-acs-action:{}\nx-acs-content-sha256:{}\nx-acs-date:{}\nx-acs-signature-nonce:{}\nx-acs-version:{}\n",
        input.host, input.action, EMPTY_BODY_SHA256, input.timestamp, input.nonce, input.version
    );

    let canonical_request = format!(
        "POST\n/\n{}\n{}\n{}\n{}",
        input.canonical_query, canonical_headers, SIGNED_HEADERS, EMPTY_BODY_SHA256
    );

    let hashed_request = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let string_to_sign = format!("{}\n{}", ALGORITHM, hashed_request);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::invalid_input(format!("unusable signing secret: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!(
        "{} Credential={},SignedHeaders={},Signature={}",
        ALGORITHM, key_id, SIGNED_HEADERS, signature
    ))
}
