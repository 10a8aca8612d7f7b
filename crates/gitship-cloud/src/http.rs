use gitship_core::{DeployedFunction, GarbageRequest, GatewayConfig};
use serde::Serialize;

use crate::gateway::{DeployRequest, Gateway, GatewayError};

/// Body of `DELETE /system/functions`.
#[derive(Serialize)]
struct DeleteRequest<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
}

/// Gateway reached over HTTP.
///
/// Inventory, delete and collector calls use the configured timeout.
/// Deploy and status calls have none: archives can be large and the
/// receiving function builds the image before answering.
pub struct HttpGateway {
    config: GatewayConfig,
    unbounded: reqwest::Client,
    bounded: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let unbounded = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Client { source: e })?;
        let bounded = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Client { source: e })?;

        Ok(Self {
            config: config.clone(),
            unbounded,
            bounded,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl Gateway for HttpGateway {
    async fn deploy(
        &self,
        request: &DeployRequest,
        archive: tokio::fs::File,
    ) -> Result<u16, GatewayError> {
        let url = self.config.function_url(&self.config.deploy_endpoint);

        let response = self
            .unbounded
            .post(&url)
            .header("Repo", &request.repo)
            .header("Owner", &request.owner)
            .header("Service", &request.service)
            .header("Image", &request.image)
            .body(reqwest::Body::from(archive))
            .send()
            .await
            .map_err(|e| request_err(&url, e))?;

        Ok(response.status().as_u16())
    }

    async fn list_functions(&self) -> Result<Vec<DeployedFunction>, GatewayError> {
        let url = self.config.system_functions_url();

        let response = self
            .bounded
            .get(&url)
            .send()
            .await
            .map_err(|e| request_err(&url, e))?;

        success(&url, response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode { url, source: e })
    }

    async fn delete_function(&self, name: &str) -> Result<String, GatewayError> {
        let url = self.config.system_functions_url();

        let response = self
            .bounded
            .delete(&url)
            .json(&DeleteRequest { name })
            .send()
            .await
            .map_err(|e| request_err(&url, e))?;

        text(&url, success(&url, response).await?).await
    }

    async fn collect(&self, request: &GarbageRequest) -> Result<String, GatewayError> {
        let url = self.config.function_url(&self.config.collect_endpoint);

        let response = self
            .bounded
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| request_err(&url, e))?;

        text(&url, success(&url, response).await?).await
    }

    async fn post_status(&self, document: Vec<u8>) -> Result<Vec<u8>, GatewayError> {
        let url = self.config.function_url(&self.config.status_endpoint);

        let response = self
            .unbounded
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(document)
            .send()
            .await
            .map_err(|e| request_err(&url, e))?;

        let body = success(&url, response)
            .await?
            .bytes()
            .await
            .map_err(|e| GatewayError::Decode {
                url: url.clone(),
                source: e,
            })?;
        Ok(body.to_vec())
    }
}

// ── Helpers ──

fn request_err(url: &str, source: reqwest::Error) -> GatewayError {
    GatewayError::Request {
        url: url.to_owned(),
        source,
    }
}

async fn success(url: &str, response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {e}>"),
    };
    Err(GatewayError::Status {
        url: url.to_owned(),
        status: status.as_u16(),
        body,
    })
}

async fn text(url: &str, response: reqwest::Response) -> Result<String, GatewayError> {
    response.text().await.map_err(|e| GatewayError::Decode {
        url: url.to_owned(),
        source: e,
    })
}
