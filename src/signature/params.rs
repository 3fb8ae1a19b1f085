//! MD5-keyed parameter signatures (epay scheme).
//!
//! Canonical form: drop `sign`/`sign_type` and empty values, sort keys
//! byte-wise, join as `k=v` with `&`, append `&key=<secret>`, MD5, lowercase
//! hex.

use std::collections::BTreeMap;

/// Parameter carrying the signature itself
pub const SIGN_FIELD: &str = "sign";

/// Parameter naming the signature algorithm
pub const SIGN_TYPE_FIELD: &str = "sign_type";

/// Build the sorted `k1=v1&k2=v2` string over the signable parameters.
///
/// `BTreeMap<&str, _>` orders keys by their bytes, which is exactly the
/// ordering the gateway uses.
pub fn canonical_string<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let sorted: BTreeMap<&str, &str> = params
        .into_iter()
        .filter(|(k, v)| k.as_str() != SIGN_FIELD && k.as_str() != SIGN_TYPE_FIELD && !v.is_empty())
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Compute the lowercase hex MD5 signature of a parameter map.
pub fn sign_params<'a, I>(params: I, secret: &str) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let payload = format!("{}&key={}", canonical_string(params), secret);
    format!("{:x}", md5::compute(payload.as_bytes()))
}

/// Verify the `sign` field of a parameter map.
///
/// Absent or empty `sign` always fails. Comparison is case-sensitive.
pub fn verify_params<'a, I>(params: I, secret: &str) -> bool
where
    I: IntoIterator<Item = (&'a String, &'a String)> + Clone,
{
    let provided = params
        .clone()
        .into_iter()
        .find(|(k, _)| k.as_str() == SIGN_FIELD)
        .map(|(_, v)| v.clone());

    match provided {
        Some(sign) if !sign.is_empty() => sign_params(params, secret) == sign,
        _ => false,
    }
}

/// Return a copy of `params` with `sign` and `sign_type=MD5` filled in.
pub fn generate_params(
    params: &BTreeMap<String, String>,
    secret: &str,
) -> BTreeMap<String, String> {
    let mut signed = params.clone();
    signed.insert(SIGN_FIELD.to_string(), sign_params(params, secret));
    signed.insert(SIGN_TYPE_FIELD.to_string(), "MD5".to_string());
    signed
}
