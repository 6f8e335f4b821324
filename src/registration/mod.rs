//! Account registration over the HTTP API.
//!
//! Three blocking GET calls, each answered with a small JSON object:
//!
//! | Call                | Endpoint            | Answer                  |
//! |---------------------|---------------------|-------------------------|
//! | credential check    | `check_url`         | [`AccountResponse`]     |
//! | code request        | `code_url`          | [`CodeRequestResponse`] |
//! | code registration   | `register_url`      | [`AccountResponse`]     |
//!
//! Every call carries the calling code (`cc`), national number (`in`) and
//! the device [`Identity`] (`id`).

mod identity;
mod response;

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};

pub use identity::{url_encode, Identity, IDENTITY_LEN};
pub use response::{AccountResponse, CodeRequestResponse};

use crate::config::Config;
use crate::error::{FunXmppError, Result};
use crate::logging::RedactedPhone;
use crate::phone::Phone;
use crate::protocol::MNC;

/// Fixed cookie sent with credential checks and code registration.
pub const REGISTRATION_COOKIE: &str = "cookie";

/// Blocking client for the registration endpoints.
#[derive(Debug)]
pub struct RegistrationClient {
    client: Client,
    config: Config,
    phone: Phone,
    identity: Identity,
}

impl RegistrationClient {
    /// Build a client for `phone`, identified by `identity`.
    pub fn new(config: Config, phone: Phone, identity: Identity) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.registration.timeout_secs))
            .build()
            .map_err(|e| FunXmppError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            phone,
            identity,
        })
    }

    /// Phone this client registers.
    pub fn phone(&self) -> &Phone {
        &self.phone
    }

    /// Ask whether the identity already holds credentials for the number.
    ///
    /// Any answer carrying a `status` is returned, `fail` included; only an
    /// answer without one is an error.
    pub fn check_credentials(&self) -> Result<AccountResponse> {
        let query = self.base_query(&[("c", REGISTRATION_COOKIE)]);
        let body = self.get(&self.config.registration.check_url, &query)?;
        let response: AccountResponse = decode(&body)?;
        tracing::debug!(
            "Credential check for {}: {}",
            RedactedPhone(&self.phone.number),
            response.status
        );
        Ok(response)
    }

    /// Ask the server to send a registration code via `method` (`sms` or
    /// `voice`).
    pub fn request_code(&self, method: &str, token: &str) -> Result<CodeRequestResponse> {
        let lg = self.phone.iso639.as_deref().unwrap_or("en");
        let lc = self.phone.iso3166.as_deref().unwrap_or("US");
        let mcc = self.phone.mcc_padded();
        let query = self.base_query(&[
            ("to", self.phone.number.as_str()),
            ("lg", lg),
            ("lc", lc),
            ("method", method),
            ("mcc", mcc.as_str()),
            ("mnc", MNC),
            ("token", token),
        ]);
        let body = self.get(&self.config.registration.code_url, &query)?;
        let response: CodeRequestResponse = decode(&body)?;

        match response.status.as_str() {
            "ok" | "sent" => {
                tracing::info!(
                    "Registration code for {} requested via {}",
                    RedactedPhone(&self.phone.number),
                    method
                );
                Ok(response)
            }
            _ => Err(code_request_error(&response)),
        }
    }

    /// Register the code the user received.
    pub fn register_code(&self, code: &str) -> Result<AccountResponse> {
        let code = code.replace('-', "");
        let query = self.base_query(&[("code", code.as_str()), ("c", REGISTRATION_COOKIE)]);
        let body = self.get(&self.config.registration.register_url, &query)?;
        let response: AccountResponse = decode(&body)?;

        if !response.is_ok() {
            return Err(FunXmppError::Registration(format!(
                "An error occurred registering the registration code from WhatsApp. Reason: {}",
                response.reason.as_deref().unwrap_or(&response.status)
            )));
        }
        tracing::info!("Registered {}", RedactedPhone(&self.phone.number));
        Ok(response)
    }

    /// `cc`, `in`, then `extra`, then `id`.
    fn base_query(&self, extra: &[(&str, &str)]) -> String {
        let mut parts = vec![
            format!("cc={}", url_encode(&self.phone.cc)),
            format!("in={}", url_encode(&self.phone.national)),
        ];
        parts.extend(extra.iter().map(|(k, v)| format!("{}={}", k, url_encode(v))));
        // already URL-encoded
        parts.push(format!("id={}", self.identity.as_str()));
        parts.join("&")
    }

    fn get(&self, url: &str, query: &str) -> Result<String> {
        let full = format!("{url}?{query}");
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(&full)
            .header(ACCEPT, "text/json")
            .header(USER_AGENT, &self.config.client.user_agent)
            .send()?;
        Ok(response.text()?)
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        FunXmppError::Registration(format!("Unexpected registration answer: {e}"))
    })
}

fn code_request_error(response: &CodeRequestResponse) -> FunXmppError {
    let reason = response.reason.as_deref().unwrap_or("unknown");
    if reason == "too_recent" {
        let minutes = (response.retry_after.unwrap_or(0) as f64 / 60.0).round() as i64;
        return FunXmppError::Registration(format!(
            "Code already sent. Retry after {minutes} minutes."
        ));
    }
    match response.param.as_deref() {
        Some(param) => FunXmppError::Registration(format!(
            "There was a problem trying to request the code. Reason: {reason}, param: {param}"
        )),
        None => FunXmppError::Registration(format!(
            "There was a problem trying to request the code. Reason: {reason}"
        )),
    }
}
