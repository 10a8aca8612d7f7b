use gitship_core::{DeployedFunction, GarbageRequest};

/// Metadata sent alongside a packaged archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub owner: String,
    pub repo: String,
    pub service: String,
    pub image: String,
}

/// Abstraction over the platform gateway for testability.
///
/// Production code uses [`HttpGateway`](crate::HttpGateway), tests use
/// mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait Gateway: Send + Sync {
    /// Stream one archive to the deploy function. Returns the HTTP status.
    async fn deploy(
        &self,
        request: &DeployRequest,
        archive: tokio::fs::File,
    ) -> Result<u16, GatewayError>;

    /// Every deployed function, across all tenants.
    async fn list_functions(&self) -> Result<Vec<DeployedFunction>, GatewayError>;

    /// Remove a function by its full (owner-prefixed) name.
    async fn delete_function(&self, name: &str) -> Result<String, GatewayError>;

    /// Ask the collector function to reconcile. Returns its response body.
    async fn collect(&self, request: &GarbageRequest) -> Result<String, GatewayError>;

    /// Post a status document. Returns the raw response body.
    async fn post_status(&self, document: Vec<u8>) -> Result<Vec<u8>, GatewayError>;
}

impl<G: Gateway + ?Sized> Gateway for &G {
    async fn deploy(
        &self,
        request: &DeployRequest,
        archive: tokio::fs::File,
    ) -> Result<u16, GatewayError> {
        (**self).deploy(request, archive).await
    }

    async fn list_functions(&self) -> Result<Vec<DeployedFunction>, GatewayError> {
        (**self).list_functions().await
    }

    async fn delete_function(&self, name: &str) -> Result<String, GatewayError> {
        (**self).delete_function(name).await
    }

    async fn collect(&self, request: &GarbageRequest) -> Result<String, GatewayError> {
        (**self).collect(request).await
    }

    async fn post_status(&self, document: Vec<u8>) -> Result<Vec<u8>, GatewayError> {
        (**self).post_status(document).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to build HTTP client")]
    Client { source: reqwest::Error },

    #[error("request to {url} failed")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}")]
    Decode { url: String, source: reqwest::Error },
}
