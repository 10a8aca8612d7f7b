//! Commit-status document exchanged with the status-reporting function.
//!
//! The reporter answers every post with a rotated auth token. A token that
//! is not valid JSON, or that contains anything other than ASCII
//! alphanumerics, `-`, `_` and `.`, degrades to the empty token.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PushEvent;

/// Context used for the whole-stack status.
pub const STACK_CONTEXT: &str = "stack-deploy";

pub const EMPTY_AUTH_TOKEN: &str = "";

const TOKEN_FIELD: &str = "token";

const AUTH_TOKEN_PATTERN: &str = r"^[A-Za-z0-9\-_.]*$";

static VALID_TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // arch-lint: allow(no-silent-result-drop) reason="constant pattern; a failed compile rejects every token"
    Regex::new(AUTH_TOKEN_PATTERN).ok()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Success,
    Failure,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub status: CommitState,
    pub description: String,
    pub context: String,
}

/// Identifies the commit a status document refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(default)]
    pub service: String,
    pub owner: String,
    pub repository: String,
    pub sha: String,
    #[serde(default)]
    pub url: String,
}

impl StatusEvent {
    pub fn from_push(event: &PushEvent) -> Self {
        Self {
            service: String::new(),
            owner: event.owner().to_owned(),
            repository: event.repo_name().to_owned(),
            sha: event.sha().to_owned(),
            url: event.repository.clone_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    /// Keyed by context. Adding a status for an existing context replaces
    /// it in place, so each context is reported once, in first-added order.
    #[serde(rename = "commit-statuses", default)]
    pub commit_statuses: IndexMap<String, CommitStatus>,
    #[serde(rename = "event")]
    pub event: StatusEvent,
    #[serde(
        rename = "auth-token",
        serialize_with = "expose_token",
        deserialize_with = "secret_token",
        default = "empty_token"
    )]
    auth_token: SecretString,
}

impl Status {
    pub fn new(event: StatusEvent, token: SecretString) -> Self {
        Self {
            commit_statuses: IndexMap::new(),
            event,
            auth_token: token,
        }
    }

    pub fn add_status(&mut self, state: CommitState, description: &str, context: &str) {
        self.commit_statuses.insert(
            context.to_owned(),
            CommitStatus {
                status: state,
                description: description.to_owned(),
                context: context.to_owned(),
            },
        );
    }

    pub fn auth_token(&self) -> &SecretString {
        &self.auth_token
    }

    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| crate::Error::StatusEncode { source: e })
    }

    pub fn from_json(data: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// Store the token from a reporter response and clear reported statuses.
    pub fn rotate_token(&mut self, response: &[u8]) -> &SecretString {
        self.auth_token = SecretString::from(parse_token(response));
        self.commit_statuses.clear();
        &self.auth_token
    }
}

/// Status context for a single function.
pub fn function_context(function: &str) -> String {
    function.to_owned()
}

/// Whether the whole string is made of token characters.
pub fn valid_token(token: &str) -> bool {
    VALID_TOKEN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(token))
}

/// `{"token": "<token>"}`
pub fn token_json(token: &str) -> String {
    serde_json::json!({ TOKEN_FIELD: token }).to_string()
}

/// Extract and validate the token from a reporter response.
pub fn parse_token(data: &[u8]) -> String {
    let map: IndexMap<String, String> = match serde_json::from_slice(data) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "invalid auth token format received; make sure combined output is disabled for the status function",
            );
            return EMPTY_AUTH_TOKEN.to_owned();
        }
    };

    let token = map.get(TOKEN_FIELD).map(String::as_str).unwrap_or_default();
    if !valid_token(token) {
        tracing::warn!("invalid auth token received; make sure combined output is disabled for the status function");
        return EMPTY_AUTH_TOKEN.to_owned();
    }
    token.to_owned()
}

fn expose_token<S: Serializer>(token: &SecretString, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(token.expose_secret())
}

fn secret_token<'de, D: Deserializer<'de>>(de: D) -> Result<SecretString, D::Error> {
    String::deserialize(de).map(SecretString::from)
}

fn empty_token() -> SecretString {
    SecretString::from(EMPTY_AUTH_TOKEN.to_owned())
}
