/// Payload field carrying the sender's claimed digest. Never part of the canonical string.
pub const SIGNATURE_FIELD: &str = "signature";

/// Name under which the shared secret is appended to the canonical string.
pub const PASSPHRASE_FIELD: &str = "passphrase";

/// Separator between `key=value` pairs in the canonical string.
pub const PAIR_SEPARATOR: char = '&';

/// Length of a hex-encoded MD5 digest.
pub const SIGNATURE_HEX_LEN: usize = 32;
