//! Canonicalization policy.
//!
//! Integrations of this protocol disagree on how the canonical string is
//! built, so each axis is configurable. Payer and verifier must run the same
//! policy or every signature will mismatch.

use std::fmt;
use std::str::FromStr;

use crate::error::IpnError;

/// Order in which payload fields are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyOrder {
    /// Fields in the order they arrived in the request body.
    Arrival,
    /// Fields sorted by key, ascending byte order.
    #[default]
    Sorted,
}

/// Treatment of fields whose value is the empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyValues {
    #[default]
    Exclude,
    /// Emitted as `key=`.
    Include,
}

/// How each value (and the passphrase) is written into the canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueEncoding {
    /// Percent-encode, then write spaces as `+` instead of `%20`.
    #[default]
    FormEncoded,
    /// Percent-encode, spaces stay `%20`.
    PercentEncoded,
    /// Treat the stored value as percent-encoded, decode it, and join it raw.
    Decoded,
}

/// The full policy: one choice per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanonicalPolicy {
    pub key_order: KeyOrder,
    pub empty_values: EmptyValues,
    pub value_encoding: ValueEncoding,
}

impl CanonicalPolicy {
    pub fn new(
        key_order: KeyOrder,
        empty_values: EmptyValues,
        value_encoding: ValueEncoding,
    ) -> Self {
        Self {
            key_order,
            empty_values,
            value_encoding,
        }
    }

    pub fn with_key_order(mut self, key_order: KeyOrder) -> Self {
        self.key_order = key_order;
        self
    }

    pub fn with_empty_values(mut self, empty_values: EmptyValues) -> Self {
        self.empty_values = empty_values;
        self
    }

    pub fn with_value_encoding(mut self, value_encoding: ValueEncoding) -> Self {
        self.value_encoding = value_encoding;
        self
    }
}

impl fmt::Display for CanonicalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "keys={} empty={} encoding={}",
            self.key_order, self.empty_values, self.value_encoding
        )
    }
}

impl KeyOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOrder::Arrival => "arrival",
            KeyOrder::Sorted => "sorted",
        }
    }
}

impl EmptyValues {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyValues::Exclude => "exclude",
            EmptyValues::Include => "include",
        }
    }
}

impl ValueEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueEncoding::FormEncoded => "form",
            ValueEncoding::PercentEncoded => "percent",
            ValueEncoding::Decoded => "decoded",
        }
    }
}

impl fmt::Display for KeyOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EmptyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ValueEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyOrder {
    type Err = IpnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrival" | "original" => Ok(KeyOrder::Arrival),
            "sorted" | "alphabetical" => Ok(KeyOrder::Sorted),
            other => Err(IpnError::InvalidPolicy(format!(
                "unknown key order '{other}' (expected 'arrival' or 'sorted')"
            ))),
        }
    }
}

impl FromStr for EmptyValues {
    type Err = IpnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(EmptyValues::Exclude),
            "include" => Ok(EmptyValues::Include),
            other => Err(IpnError::InvalidPolicy(format!(
                "unknown empty-value handling '{other}' (expected 'exclude' or 'include')"
            ))),
        }
    }
}

impl FromStr for ValueEncoding {
    type Err = IpnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(ValueEncoding::FormEncoded),
            "percent" => Ok(ValueEncoding::PercentEncoded),
            "decoded" | "decode" => Ok(ValueEncoding::Decoded),
            other => Err(IpnError::InvalidPolicy(format!(
                "unknown value encoding '{other}' (expected 'form', 'percent' or 'decoded')"
            ))),
        }
    }
}
