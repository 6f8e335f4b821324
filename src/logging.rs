//! Logging setup and redaction helpers.
//!
//! Library code logs through `tracing`. Applications call [`init`] once to
//! install a subscriber; secrets are wrapped so they never reach the output.

use std::fmt;

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber.
///
/// `RUST_LOG` overrides `level` when set. Returns false if a global
/// subscriber was already installed.
pub fn init(level: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

/// A wrapper that redacts sensitive data when displayed.
pub struct Redacted<T>(pub T);

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Redact a byte slice, showing only length.
pub struct RedactedBytes<'a>(pub &'a [u8]);

impl fmt::Display for RedactedBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} bytes]", self.0.len())
    }
}

impl fmt::Debug for RedactedBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Redact a phone number, keeping the last 3 digits.
pub struct RedactedPhone<'a>(pub &'a str);

impl fmt::Display for RedactedPhone<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        if s.len() > 5 && s.is_ascii() {
            write!(f, "***{}", &s[s.len() - 3..])
        } else {
            write!(f, "[REDACTED PHONE]")
        }
    }
}

impl fmt::Debug for RedactedPhone<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
