//! Registration API response bodies.
//!
//! The API is loose about types: numeric fields arrive either as JSON
//! numbers or as strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Credential check and code registration answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountResponse {
    /// `ok` or `fail`.
    pub status: String,
    /// Phone number with calling code.
    #[serde(default, deserialize_with = "lenient_string")]
    pub login: Option<String>,
    /// Account password (base64).
    #[serde(default)]
    pub pw: Option<String>,
    /// Account type.
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
    /// Expiration, unix seconds.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub expiration: Option<i64>,
    /// Account kind.
    #[serde(default)]
    pub kind: Option<String>,
    /// Formatted price.
    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,
    /// Decimal price.
    #[serde(default, deserialize_with = "lenient_string")]
    pub cost: Option<String>,
    /// Price currency.
    #[serde(default)]
    pub currency: Option<String>,
    /// Price expiration, unix seconds.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub price_expiration: Option<i64>,
    /// Failure reason.
    #[serde(default)]
    pub reason: Option<String>,
}

impl AccountResponse {
    /// Whether the API answered `ok`.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Code request answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeRequestResponse {
    /// `sent`, `ok` (already registered) or `fail`.
    pub status: String,
    /// Length of the code that was sent.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub length: Option<i64>,
    /// Delivery method used.
    #[serde(default)]
    pub method: Option<String>,
    /// Failure reason, e.g. `too_recent`, `missing_param`, `bad_param`.
    #[serde(default)]
    pub reason: Option<String>,
    /// Offending parameter for `missing_param`/`bad_param`.
    #[serde(default)]
    pub param: Option<String>,
    /// Seconds to wait before asking again.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub retry_after: Option<i64>,
    /// Phone number when already registered.
    #[serde(default, deserialize_with = "lenient_string")]
    pub login: Option<String>,
    /// Password when already registered.
    #[serde(default)]
    pub pw: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_numeric_fields_lenient() {
        let a: AccountResponse = serde_json::from_str(
            r#"{"status":"ok","login":34600000000,"pw":"cGFzcw==","type":"existing",
                "expiration":"1424533437","kind":"free","price":"0,89 €","cost":0.89,
                "currency":"EUR","price_expiration":1395000000}"#,
        )
        .unwrap();
        assert!(a.is_ok());
        assert_eq!(a.login.as_deref(), Some("34600000000"));
        assert_eq!(a.account_type.as_deref(), Some("existing"));
        assert_eq!(a.expiration, Some(1424533437));
        assert_eq!(a.cost.as_deref(), Some("0.89"));
        assert_eq!(a.price_expiration, Some(1395000000));
    }

    #[test]
    fn test_code_request_fail() {
        let r: CodeRequestResponse = serde_json::from_str(
            r#"{"status":"fail","reason":"too_recent","retry_after":"3600"}"#,
        )
        .unwrap();
        assert_eq!(r.status, "fail");
        assert_eq!(r.retry_after, Some(3600));
        assert_eq!(r.length, None);
    }

    #[test]
    fn test_code_request_sent() {
        let r: CodeRequestResponse =
            serde_json::from_str(r#"{"status":"sent","length":6,"method":"sms"}"#).unwrap();
        assert_eq!(r.length, Some(6));
        assert_eq!(r.method.as_deref(), Some("sms"));
    }
}
