//! Per-call HMAC-SHA1 checksum.
//!
//! The issuer authenticates each call with
//! `hex(HMAC-SHA1(secret, method + terminal_id + arg1 + ... + argN))`.
//! Fields are concatenated with no separators, so `("ab", "c")` and
//! `("a", "bc")` produce the same message. That ambiguity is part of the
//! issuer's contract and has to be kept for the checksums to verify.

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::ClientError;
use crate::value::Value;

type HmacSha1 = Hmac<Sha1>;

/// Builds the concatenated checksum message.
pub fn checksum_message(method: &str, terminal_id: &str, args: &[Value]) -> String {
    let mut message = String::with_capacity(method.len() + terminal_id.len() + args.len() * 16);
    message.push_str(method);
    message.push_str(terminal_id);
    for arg in args {
        message.push_str(&arg.checksum_form());
    }
    message
}

/// Lowercase hex HMAC-SHA1 of the call, keyed by `secret`.
///
/// The checksum is only defined when at least one argument is present; an
/// empty `args` slice yields `ClientError::EmptyChecksumInput`.
pub fn compute_checksum(
    secret: &str,
    method: &str,
    terminal_id: &str,
    args: &[Value],
) -> Result<String, ClientError> {
    if args.is_empty() {
        return Err(ClientError::EmptyChecksumInput {
            method: method.to_string(),
        });
    }
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| ClientError::Configuration(format!("unusable shared secret: {e}")))?;
    mac.update(checksum_message(method, terminal_id, args).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a received checksum against the expected one.
pub fn verify_checksum(
    secret: &str,
    method: &str,
    terminal_id: &str,
    args: &[Value],
    checksum: &str,
) -> bool {
    let Ok(expected) = hex::decode(checksum) else {
        return false;
    };
    if args.is_empty() {
        return false;
    }
    let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(checksum_message(method, terminal_id, args).as_bytes());
    mac.verify_slice(&expected).is_ok()
}
