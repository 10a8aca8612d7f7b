use gitship_core::{CommitState, Status};
use secrecy::ExposeSecret;

use crate::gateway::{Gateway, GatewayError};

/// Accumulates commit statuses and posts them to the status function.
pub struct StatusReporter<G: Gateway> {
    gateway: G,
    status: Status,
}

impl<G: Gateway> StatusReporter<G> {
    pub fn new(gateway: G, status: Status) -> Self {
        Self { gateway, status }
    }

    pub fn add(&mut self, state: CommitState, description: &str, context: &str) {
        self.status.add_status(state, description, context);
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Post pending statuses and store the rotated token.
    pub async fn report(&mut self) -> Result<(), ReportError> {
        if self.status.commit_statuses.is_empty() {
            return Ok(());
        }

        let document = self
            .status
            .to_json()
            .map_err(|e| ReportError::Encode { source: e })?;
        let response = self
            .gateway
            .post_status(document)
            .await
            .map_err(|e| ReportError::Post { source: e })?;

        let token = self.status.rotate_token(&response);
        if token.expose_secret().is_empty() {
            tracing::warn!("status function returned no usable token");
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to encode status document")]
    Encode { source: gitship_core::Error },

    #[error("failed to post commit status")]
    Post { source: GatewayError },
}
