//! Veo client for the Gemini API.
//!
//! Video generation is a long-running operation: `predictLongRunning`
//! returns an operation name which is then polled until `done`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use veo_models::ApiKey;

use crate::client::{ArtifactRef, GenerationClient, GenerationRequest, Operation};
use crate::config::GenAiConfig;
use crate::error::{GenAiError, GenAiResult};

pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API client for Veo models.
#[derive(Debug, Clone)]
pub struct VeoClient {
    client: Client,
    config: GenAiConfig,
}

/// `predictLongRunning` request.
#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<Instance>,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Instance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<InlineImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    aspect_ratio: String,
    sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
}

/// Long-running operation resource.
#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<OperationResult>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

impl From<OperationResponse> for Operation {
    fn from(raw: OperationResponse) -> Self {
        let video_response = raw.response.and_then(|r| r.generate_video_response);
        let (artifacts, filtered_reasons) = match video_response {
            Some(v) => (
                v.generated_samples
                    .into_iter()
                    .filter_map(|s| s.video.and_then(|v| v.uri))
                    .map(|uri| ArtifactRef {
                        uri: decode_uri(&uri),
                    })
                    .collect(),
                v.rai_media_filtered_reasons,
            ),
            None => (Vec::new(), Vec::new()),
        };

        Operation {
            name: raw.name,
            done: raw.done,
            artifacts,
            error: raw.error.map(|e| e.message),
            filtered_reasons,
        }
    }
}

fn decode_uri(uri: &str) -> String {
    urlencoding::decode(uri)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| uri.to_string())
}

impl VeoClient {
    /// Create a new client.
    pub fn new(config: GenAiConfig) -> GenAiResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn build_request(request: &GenerationRequest) -> PredictRequest {
        PredictRequest {
            instances: vec![Instance {
                prompt: request.prompt.clone(),
                image: request.image.as_ref().map(|img| InlineImage {
                    bytes_base64_encoded: img.to_base64(),
                    mime_type: img.mime_type.clone(),
                }),
            }],
            parameters: Parameters {
                aspect_ratio: request.config.aspect_ratio.to_string(),
                sample_count: 1,
                seed: request.config.seed,
            },
        }
    }

    async fn read_operation(response: reqwest::Response) -> GenAiResult<Operation> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_status(status, error_text));
        }

        let raw: OperationResponse = response
            .json()
            .await
            .map_err(|e| GenAiError::invalid_response(format!("Failed to parse operation: {}", e)))?;
        Ok(raw.into())
    }
}

#[async_trait]
impl GenerationClient for VeoClient {
    async fn submit(&self, credential: &ApiKey, request: &GenerationRequest) -> GenAiResult<Operation> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.config.base_url, request.model
        );
        info!("Submitting generation to model {}", request.model);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, credential.expose())
            .json(&Self::build_request(request))
            .send()
            .await?;

        let operation = Self::read_operation(response).await?;
        debug!("Operation started: {}", operation.name);
        Ok(operation)
    }

    async fn poll(&self, credential: &ApiKey, operation: &Operation) -> GenAiResult<Operation> {
        let url = format!("{}/{}", self.config.base_url, operation.name);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await?;

        let operation = Self::read_operation(response).await?;
        debug!("Operation {} done={}", operation.name, operation.done);
        Ok(operation)
    }
}
