//! Case identity: name checks, param stringification and equality.

use crate::query::{BIG_SEPARATOR, PARAM_KV_SEPARATOR, PARAM_SEPARATOR, WILDCARD};
use crate::{Error, Result};

use super::{extract_public_params, param_key_is_public, params_to_json, CaseParams, ParamValue};

/// Characters an encoded param value may not contain.
///
/// `%` is included so values survive URL decoding unchanged.
pub const BAD_PARAM_VALUE_CHARS: &[char] =
    &[BIG_SEPARATOR, PARAM_SEPARATOR, PARAM_KV_SEPARATOR, WILDCARD, '%'];

/// True if every character is in `[a-zA-Z0-9_]`.
pub fn is_valid_name_part(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decode `%XX` escapes. Returns `None` on a malformed escape or invalid UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    if !input.contains('%') {
        return Some(input.to_string());
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Normalize and validate one segment of a test name.
///
/// Spaces become underscores; the result must be a valid name part that
/// survives percent-decoding unchanged.
pub fn validate_name_part(raw: &str) -> Result<String> {
    let name = raw.replace(' ', "_");
    if !is_valid_name_part(&name) {
        return Err(Error::InvalidName(format!(
            "`{}` must match [a-zA-Z0-9_]+",
            raw
        )));
    }
    if percent_decode(&name).as_deref() != Some(name.as_str()) {
        return Err(Error::InvalidName(format!(
            "`{}` is not idempotent under percent-decoding",
            raw
        )));
    }
    Ok(name)
}

/// Stringify one param as `key=value`, rejecting values that would make
/// the query string ambiguous.
pub fn stringify_single_param(key: &str, value: &ParamValue) -> Result<String> {
    let encoded = value.encode();
    if encoded.contains(BAD_PARAM_VALUE_CHARS) {
        return Err(Error::ForbiddenCharacter {
            key: key.to_string(),
            value: encoded,
        });
    }
    Ok(format!("{}{}{}", key, PARAM_KV_SEPARATOR, encoded))
}

/// Stringify the public params, in order.
pub fn stringify_public_params(params: &CaseParams) -> Result<Vec<String>> {
    params
        .iter()
        .filter(|(k, _)| param_key_is_public(k))
        .map(|(k, v)| stringify_single_param(k, v))
        .collect()
}

/// Check that public keys are addressable and values encodable.
pub fn validate_public_params(params: &CaseParams) -> Result<()> {
    for (key, value) in params {
        value.validate(key)?;
        if !param_key_is_public(key) {
            continue;
        }
        if !is_valid_name_part(key) {
            return Err(Error::InvalidName(format!(
                "param key `{}` must match [a-zA-Z0-9_]+",
                key
            )));
        }
        stringify_single_param(key, value)?;
    }
    Ok(())
}

/// Equality where an absent key equals an explicit `undefined`.
pub fn params_equals(x: &CaseParams, y: &CaseParams) -> bool {
    fn covered_by(a: &CaseParams, b: &CaseParams) -> bool {
        a.iter().all(|(k, v)| match b.get(k) {
            Some(other) => other == v,
            None => v.is_undefined(),
        })
    }
    covered_by(x, y) && covered_by(y, x)
}

pub fn public_params_equals(x: &CaseParams, y: &CaseParams) -> bool {
    params_equals(&extract_public_params(x), &extract_public_params(y))
}

/// True if every key of `sub` is in `sup` with an identical value.
pub fn params_supersets(sup: &CaseParams, sub: &CaseParams) -> bool {
    sub.iter().all(|(k, v)| sup.get(k) == Some(v))
}

/// Reject two cases with the same public projection. Quadratic.
pub fn check_duplicate_cases(cases: &[CaseParams]) -> Result<()> {
    let mut seen: Vec<CaseParams> = Vec::with_capacity(cases.len());
    for case in cases {
        let public = extract_public_params(case);
        if seen.iter().any(|s| params_equals(s, &public)) {
            return Err(Error::DuplicateCase(params_to_json(&public).to_string()));
        }
        seen.push(public);
    }
    Ok(())
}
