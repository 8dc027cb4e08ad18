//! Las Cumbres Observatory observing portal gateway.
//!
//! Talks to the portal's REST API with token authentication:
//!
//! ```text
//! POST {portal}/api/requestgroups/validate/   → {"errors": {...}}
//! POST {portal}/api/requestgroups/            → {"id": N, "requests": [{"id": M}, ...]}
//! GET  {portal}/api/requests/{id}/            → {"state": "PENDING", ...}
//! ```
//!
//! Stored parameters must already be a complete portal request-group body
//! (proposal, requests, windows and so on) whose window bounds live under the
//! top-level `start` and `end` keys. They are forwarded unchanged; nothing is
//! reshaped or filled in here. A fresh blocking client is built per call so
//! the gateway can be used from any worker thread.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::config::LcoSettings;
use crate::error::{CadenceError, FieldErrors, Result};
use crate::paths;
use crate::record::Parameters;
use crate::window::window_bound;

use super::Facility;

const START_KEY: &str = "start";
const END_KEY: &str = "end";

/// Observation subtypes the portal accepts.
const OBSERVATION_TYPES: &[&str] = &[
    "IMAGING",
    "SPECTRA",
    "PHOTOMETRIC_SEQUENCE",
    "SPECTROSCOPIC_SEQUENCE",
];

/// Response bodies longer than this are cut in error messages.
const BODY_EXCERPT: usize = 500;

/// Contents of the LCO credentials file. Other keys (submitter,
/// proposal_id) may be present and are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LcoCredentials {
    pub lco_token: String,
}

impl LcoCredentials {
    pub fn load(path: &Path) -> Result<Self> {
        let path = paths::expand_home(path)?;
        let data = std::fs::read_to_string(&path).map_err(|e| {
            CadenceError::Configuration(format!(
                "cannot read LCO credentials {}: {e}",
                path.display()
            ))
        })?;
        let creds: LcoCredentials = serde_json::from_str(&data)?;
        if creds.lco_token.trim().is_empty() {
            return Err(CadenceError::Configuration(format!(
                "LCO credentials {} contain an empty lco_token",
                path.display()
            )));
        }
        Ok(creds)
    }
}

pub struct LcoFacility {
    name: String,
    portal_url: String,
    token: String,
    http_timeout: Duration,
}

impl LcoFacility {
    pub fn new(name: impl Into<String>, portal_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            portal_url: portal_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(name: &str, settings: &LcoSettings) -> Result<Self> {
        let creds = LcoCredentials::load(&settings.credentials_file)?;
        Ok(Self::new(name, &settings.portal_url, creds.lco_token)
            .with_http_timeout(Duration::from_secs(settings.http_timeout_secs)))
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.portal_url, endpoint.trim_matches('/')) + "/"
    }

    fn client(&self, fail: fn(String) -> CadenceError) -> Result<Client> {
        Client::builder()
            .timeout(self.http_timeout)
            .build()
            .map_err(|e| fail(format!("cannot build HTTP client: {e}")))
    }

    fn auth(&self) -> String {
        format!("Token {}", self.token)
    }

    fn check_locally(&self, observation_type: Option<&str>, payload: &Parameters) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if let Some(kind) = observation_type {
            if !OBSERVATION_TYPES.contains(&kind) {
                errors.push(
                    "observation_type",
                    format!("unsupported observation type '{kind}'"),
                );
            }
        }

        let start = window_bound(payload, START_KEY);
        let end = window_bound(payload, END_KEY);
        if let Err(e) = &start {
            errors.push(START_KEY, e.to_string());
        }
        if let Err(e) = &end {
            errors.push(END_KEY, e.to_string());
        }
        if let (Ok(start), Ok(end)) = (start, end) {
            if start.instant() >= end.instant() {
                errors.push(END_KEY, "window end must be after window start");
            }
        }
        errors
    }
}

impl Facility for LcoFacility {
    fn name(&self) -> &str {
        &self.name
    }

    fn window_keys(&self) -> (&str, &str) {
        (START_KEY, END_KEY)
    }

    fn validate(&self, observation_type: Option<&str>, payload: &Parameters) -> Result<()> {
        let local = self.check_locally(observation_type, payload);
        if !local.is_empty() {
            return Err(CadenceError::Validation {
                facility: self.name.clone(),
                errors: local,
            });
        }

        let response = self
            .client(CadenceError::ValidationUnavailable)?
            .post(self.url("requestgroups/validate"))
            .header("Authorization", self.auth())
            .json(payload)
            .send()
            .map_err(|e| CadenceError::ValidationUnavailable(e.to_string()))?;
        let body = json_body(response, CadenceError::ValidationUnavailable)?;

        let mut errors = FieldErrors::new();
        if let Some(remote) = body.get("errors") {
            flatten_errors(remote, "", &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CadenceError::Validation {
                facility: self.name.clone(),
                errors,
            })
        }
    }

    fn submit(&self, payload: &Parameters) -> Result<Vec<String>> {
        let response = self
            .client(CadenceError::Submission)?
            .post(self.url("requestgroups"))
            .header("Authorization", self.auth())
            .json(payload)
            .send()
            .map_err(|e| CadenceError::Submission(e.to_string()))?;
        let body = json_body(response, CadenceError::Submission)?;

        let ids = body
            .get("requests")
            .and_then(|r| r.as_array())
            .map(|requests| {
                requests
                    .iter()
                    .filter_map(|r| r.get("id"))
                    .filter_map(id_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    fn observation_status(&self, observation_id: &str) -> Result<String> {
        let response = self
            .client(CadenceError::StatusQuery)?
            .get(self.url(&format!("requests/{observation_id}")))
            .header("Authorization", self.auth())
            .send()
            .map_err(|e| CadenceError::StatusQuery(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| CadenceError::StatusQuery(e.to_string()))?;
        if !status.is_success() {
            return Err(CadenceError::StatusQuery(format!(
                "HTTP {status}: {}",
                excerpt(&text)
            )));
        }
        let body: Value = serde_json::from_str(&text)?;
        body.get("state")
            .and_then(|s| s.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CadenceError::StatusQuery(format!(
                    "request {observation_id}: response has no state field"
                ))
            })
    }
}

fn json_body(response: Response, fail: fn(String) -> CadenceError) -> Result<Value> {
    let status = response.status();
    let text = response.text().map_err(|e| fail(e.to_string()))?;
    if !status.is_success() {
        return Err(fail(format!(
            "HTTP {status}: {}",
            excerpt(&text)
        )));
    }
    Ok(serde_json::from_str(&text)?)
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT).collect()
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Flatten the portal's nested error document into dotted field paths.
fn flatten_errors(value: &Value, prefix: &str, out: &mut FieldErrors) {
    let field = if prefix.is_empty() {
        "non_field_errors"
    } else {
        prefix
    };
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let path = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_errors(v, &path, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => out.push(field, s.clone()),
                    _ => flatten_errors(item, &format!("{prefix}[{i}]"), out),
                }
            }
        }
        Value::String(s) => out.push(field, s.clone()),
        Value::Null => {}
        other => out.push(field, other.to_string()),
    }
}
