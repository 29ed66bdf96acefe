//! Typed IPN payload.
//!
//! The boundary turns the request body into a [`Payload`] before anything
//! else touches it. Values are always strings; anything that cannot be
//! represented that way is rejected as [`IpnError::MalformedPayload`].

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::constants::SIGNATURE_FIELD;
use crate::error::IpnError;

/// Flat string-to-string field map that remembers arrival order.
///
/// Field names are unique. Lookups are linear; IPN bodies carry a few dozen
/// fields at most.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    fields: Vec<(String, String)>,
}

impl Payload {
    /// Build a payload from `(name, value)` pairs, keeping their order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, IpnError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut payload = Payload::default();
        for (key, value) in pairs {
            payload.push(key.into(), value.into())?;
        }
        Ok(payload)
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    ///
    /// A repeated field name is rejected: form parsers on the sending side
    /// would turn it into a list, which is not a valid IPN value.
    pub fn from_form(body: &[u8]) -> Result<Self, IpnError> {
        Self::from_pairs(url::form_urlencoded::parse(body).into_owned())
    }

    /// Accept an already-parsed JSON object whose values are all strings.
    ///
    /// A [`Value`] has already collapsed repeated keys, so request bodies go
    /// through [`Payload::from_json_slice`] instead.
    pub fn from_json(value: &Value) -> Result<Self, IpnError> {
        let object = value.as_object().ok_or_else(|| {
            IpnError::MalformedPayload("expected a JSON object at the top level".to_string())
        })?;

        let mut payload = Payload::default();
        for (key, value) in object {
            let value = string_value(key, value).map_err(IpnError::MalformedPayload)?;
            payload.push(key.clone(), value)?;
        }
        Ok(payload)
    }

    /// Parse a JSON body straight from bytes.
    ///
    /// Fields are read one at a time, so a key repeated in the body is
    /// rejected just like a repeated form field.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, IpnError> {
        serde_json::from_slice(body).map_err(|e| match e.classify() {
            serde_json::error::Category::Data => IpnError::MalformedPayload(e.to_string()),
            _ => IpnError::MalformedPayload(format!("invalid JSON: {e}")),
        })
    }

    fn push(&mut self, key: String, value: String) -> Result<(), IpnError> {
        if self.get(&key).is_some() {
            return Err(IpnError::MalformedPayload(duplicate_message(&key)));
        }
        self.fields.push((key, value));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The signature the sender claims for this payload, if any.
    pub fn signature(&self) -> Option<&str> {
        self.get(SIGNATURE_FIELD)
    }

    /// Fields in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serialized as a JSON object in arrival order, exactly as received.
impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PayloadVisitor)
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = Payload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object with string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Payload, A::Error> {
        let mut payload = Payload::default();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            if payload.get(&key).is_some() {
                return Err(de::Error::custom(duplicate_message(&key)));
            }
            let value = string_value(&key, &value).map_err(de::Error::custom)?;
            payload.fields.push((key, value));
        }
        Ok(payload)
    }
}

fn duplicate_message(key: &str) -> String {
    format!("field '{key}' appears more than once")
}

fn string_value(key: &str, value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!(
            "field '{key}' must be a string, got {}",
            json_kind(other)
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_keeps_arrival_order_and_decodes() {
        let payload =
            Payload::from_form(b"m_payment_id=01&item_name=Test+Item&email=a%40b.co").unwrap();
        let fields: Vec<_> = payload.iter().collect();
        assert_eq!(
            fields,
            vec![
                ("m_payment_id", "01"),
                ("item_name", "Test Item"),
                ("email", "a@b.co"),
            ]
        );
    }

    #[test]
    fn form_body_rejects_repeated_keys() {
        let err = Payload::from_form(b"a=1&a=2").unwrap_err();
        assert_eq!(
            err,
            IpnError::MalformedPayload("field 'a' appears more than once".to_string())
        );
    }

    #[test]
    fn form_body_keeps_empty_values() {
        let payload = Payload::from_form(b"a=1&b=&c=2").unwrap();
        assert_eq!(payload.get("b"), Some(""));
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn json_object_of_strings_is_accepted() {
        let value = serde_json::json!({"amount_gross": "10.00", "signature": "abc"});
        let payload = Payload::from_json(&value).unwrap();
        assert_eq!(payload.get("amount_gross"), Some("10.00"));
        assert_eq!(payload.signature(), Some("abc"));
    }

    #[test]
    fn json_non_string_values_are_malformed() {
        for (value, kind) in [
            (serde_json::json!({"amount": 10}), "a number"),
            (serde_json::json!({"amount": null}), "null"),
            (serde_json::json!({"amount": true}), "a boolean"),
            (serde_json::json!({"amount": ["1"]}), "an array"),
            (serde_json::json!({"amount": {"v": "1"}}), "an object"),
        ] {
            let err = Payload::from_json(&value).unwrap_err();
            assert_eq!(
                err,
                IpnError::MalformedPayload(format!("field 'amount' must be a string, got {kind}"))
            );
        }
    }

    #[test]
    fn json_top_level_must_be_object() {
        assert!(Payload::from_json(&serde_json::json!(["a"])).is_err());
        assert!(Payload::from_json_slice(br#"["a"]"#).is_err());
        let err = Payload::from_json_slice(b"not json").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn json_body_rejects_repeated_keys() {
        let err = Payload::from_json_slice(br#"{"amount":"1.00","amount":"100.00"}"#).unwrap_err();
        match err {
            IpnError::MalformedPayload(msg) => {
                assert!(msg.contains("field 'amount' appears more than once"), "{msg}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn json_body_keeps_arrival_order() {
        let payload =
            Payload::from_json_slice(br#"{"z":"1","a":"2","signature":"abc"}"#).unwrap();
        let keys: Vec<_> = payload.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "a", "signature"]);
        assert_eq!(payload.signature(), Some("abc"));
    }

    #[test]
    fn json_body_names_non_string_field() {
        let err = Payload::from_json_slice(br#"{"amount": 100.0, "signature": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("field 'amount' must be a string, got a number"));
    }

    #[test]
    fn serializes_in_arrival_order() {
        let payload = Payload::from_pairs([("z", "1"), ("a", "2")]).unwrap();
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"z":"1","a":"2"}"#);
    }

    #[test]
    fn missing_signature_is_none() {
        let payload = Payload::from_pairs([("a", "1")]).unwrap();
        assert_eq!(payload.signature(), None);
        assert!(!payload.is_empty());
    }
}
