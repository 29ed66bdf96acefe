use std::fmt;
use std::str::FromStr;

use crate::error::IpnError;

/// Which gateway environment the notifications come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Sandbox,
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Sandbox => "sandbox",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = IpnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" | "test" => Ok(Mode::Sandbox),
            "production" | "live" => Ok(Mode::Production),
            other => Err(IpnError::InvalidPolicy(format!(
                "unknown mode '{other}' (expected 'sandbox' or 'production')"
            ))),
        }
    }
}

/// Per-environment passphrases. Empty strings count as unset.
#[derive(Clone, Default)]
pub struct Passphrases {
    pub sandbox: Option<String>,
    pub production: Option<String>,
}

impl Passphrases {
    pub fn new(sandbox: Option<String>, production: Option<String>) -> Self {
        Self {
            sandbox: sandbox.filter(|s| !s.is_empty()),
            production: production.filter(|s| !s.is_empty()),
        }
    }

    /// The passphrase the active mode signs with, if one is configured.
    pub fn for_mode(&self, mode: Mode) -> Option<&str> {
        match mode {
            Mode::Sandbox => self.sandbox.as_deref(),
            Mode::Production => self.production.as_deref(),
        }
        .filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for Passphrases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passphrases")
            .field("sandbox", &self.sandbox.as_ref().map(|_| "[REDACTED]"))
            .field("production", &self.production.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
