use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Push-trigger payload. One event identifies one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    pub repository: Repository,
    /// Commit SHA the push moved the branch to
    #[serde(rename = "after")]
    pub after_commit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub clone_url: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    #[serde(default)]
    pub email: String,
}

impl PushEvent {
    /// Parse and validate a push payload.
    pub fn from_json(data: &[u8]) -> crate::Result<Self> {
        let event: Self =
            serde_json::from_slice(data).map_err(|e| crate::Error::EventParse { source: e })?;

        let required = [
            ("repository.name", &event.repository.name),
            ("repository.clone_url", &event.repository.clone_url),
            ("repository.owner.login", &event.repository.owner.login),
            ("after", &event.after_commit_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(crate::Error::EventField { field });
            }
        }

        Ok(event)
    }

    pub fn repo_name(&self) -> &str {
        &self.repository.name
    }

    pub fn owner(&self) -> &str {
        &self.repository.owner.login
    }

    pub fn sha(&self) -> &str {
        &self.after_commit_id
    }
}

/// Reconciliation input: the functions a repository currently declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbageRequest {
    pub functions: Vec<String>,
    pub repo: String,
    pub owner: String,
}

impl GarbageRequest {
    pub fn from_json(data: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(data).map_err(|e| crate::Error::GarbageRequestParse { source: e })
    }
}

/// One entry of the platform's function inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedFunction {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: HashMap<String, String>,
}

fn null_as_empty<'de, D>(de: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(de)?.unwrap_or_default())
}
