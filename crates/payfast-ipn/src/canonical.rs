use std::borrow::Cow;

use crate::constants::{PAIR_SEPARATOR, PASSPHRASE_FIELD, SIGNATURE_FIELD};
use crate::payload::Payload;
use crate::policy::{CanonicalPolicy, EmptyValues, KeyOrder, ValueEncoding};

/// Build the canonical parameter string that the signature is computed over.
///
/// The `signature` field is always left out. Remaining fields are filtered,
/// ordered and encoded according to `policy`; a non-empty `secret` is
/// appended last as `passphrase=<secret>` using the same value encoding.
/// Keys are written as received.
pub fn canonicalize(payload: &Payload, secret: Option<&str>, policy: &CanonicalPolicy) -> String {
    let mut fields: Vec<(&str, &str)> = payload
        .iter()
        .filter(|(key, _)| *key != SIGNATURE_FIELD)
        .filter(|(_, value)| policy.empty_values == EmptyValues::Include || !value.is_empty())
        .collect();

    if policy.key_order == KeyOrder::Sorted {
        // Keys are unique, so an unstable sort is deterministic.
        fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
    }

    let mut canonical = String::new();
    for (key, value) in fields {
        push_pair(&mut canonical, key, value, policy.value_encoding);
    }

    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        push_pair(&mut canonical, PASSPHRASE_FIELD, secret, policy.value_encoding);
    }

    canonical
}

fn push_pair(out: &mut String, key: &str, value: &str, encoding: ValueEncoding) {
    if !out.is_empty() {
        out.push(PAIR_SEPARATOR);
    }
    out.push_str(key);
    out.push('=');
    out.push_str(&encode_value(value, encoding));
}

/// Write a single value the way `encoding` prescribes.
///
/// Form encoding uses the `application/x-www-form-urlencoded` alphabet:
/// `A-Z a-z 0-9 * - . _` pass through and a space becomes `+`. Percent
/// encoding leaves `A-Z a-z 0-9 - _ . ~` alone. Both emit uppercase hex for
/// every other byte. Decoding replaces invalid UTF-8 with U+FFFD.
pub fn encode_value(value: &str, encoding: ValueEncoding) -> Cow<'_, str> {
    match encoding {
        ValueEncoding::FormEncoded => url::form_urlencoded::byte_serialize(value.as_bytes()).collect(),
        ValueEncoding::PercentEncoded => urlencoding::encode(value),
        ValueEncoding::Decoded => match urlencoding::decode_binary(value.as_bytes()) {
            Cow::Borrowed(_) => Cow::Borrowed(value),
            Cow::Owned(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
        },
    }
}
