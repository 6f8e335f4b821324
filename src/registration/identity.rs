//! Device identity token.

use std::fmt;

use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::{Digest, Sha1};

use crate::logging::Redacted;

/// Bytes escaped by form-style URL encoding. Space is kept here and turned
/// into `+` afterwards.
const FORM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b' ');

/// Length of a decoded identity.
pub const IDENTITY_LEN: usize = 20;

/// URL-encoded 20-byte device identity sent with every registration call.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    /// Use `raw` as-is when it already decodes to 20 bytes, otherwise hash
    /// it with SHA-1 and URL-encode the digest in lower case.
    pub fn from_raw(raw: &str) -> Self {
        if Self::is_encoded_identity(raw) {
            return Self(raw.to_string());
        }
        let digest = Sha1::digest(raw.as_bytes());
        Self(form_encode(&digest).to_lowercase())
    }

    /// Whether `s` URL-decodes to exactly 20 bytes.
    pub fn is_encoded_identity(s: &str) -> bool {
        percent_decode_str(s).count() == IDENTITY_LEN
    }

    /// Encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Identity").field(&Redacted(&self.0)).finish()
    }
}

/// Form-style encoding: unreserved bytes pass through, space becomes `+`,
/// everything else is `%XX`.
fn form_encode(bytes: &[u8]) -> String {
    percent_encode(bytes, FORM).to_string().replace(' ', "+")
}

/// Percent-encode a query value the same way, for callers building tokens.
pub fn url_encode(s: &str) -> String {
    form_encode(s.as_bytes())
}
