use std::{future::Future, io::Cursor, time::Duration};

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::CaptionError;

pub const SYSTEM_PROMPT: &str = "You are a helpful image captioner.";

/// Anything that can turn an image and a prompt into a caption.
pub trait Captioner: Send + Sync + 'static {
    fn caption(
        &self,
        image: &[u8],
        prompt: &str,
    ) -> impl Future<Output = Result<String, CaptionError>> + Send;
}

/// Connection and sampling settings for an OpenAI compatible endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Model id; the first model listed by the endpoint when unset.
    pub model: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/v1".to_string(),
            api_key: String::new(),
            model: None,
            temperature: 0.9,
            top_p: 0.7,
            max_tokens: 256,
            request_timeout_secs: 120,
        }
    }
}

impl ApiConfig {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiCaptioner {
    client: reqwest::Client,
    config: ApiConfig,
    model: OnceCell<String>,
}

impl OpenAiCaptioner {
    pub fn new(config: ApiConfig) -> Result<Self, CaptionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let model = match &config.model {
            Some(m) if !m.is_empty() => OnceCell::new_with(Some(m.clone())),
            _ => OnceCell::new(),
        };
        Ok(Self {
            client,
            config,
            model,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The model in use, once configured or discovered.
    pub fn model_id(&self) -> Option<&str> {
        self.model.get().map(String::as_str)
    }

    pub async fn list_models(&self) -> Result<Vec<String>, CaptionError> {
        let response = self
            .client
            .get(self.config.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CaptionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let list: ModelList = serde_json::from_str(&body)
            .map_err(|e| CaptionError::MalformedResponse(e.to_string()))?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    /// Returns the model the endpoint will caption with.
    pub async fn test_connection(&self) -> Result<String, CaptionError> {
        let models = self.list_models().await?;
        models.into_iter().next().ok_or(CaptionError::NoModel)
    }

    async fn model(&self) -> Result<&str, CaptionError> {
        self.model
            .get_or_try_init(|| async {
                let model = self.test_connection().await?;
                tracing::info!(%model, "resolved captioning model");
                Ok::<_, CaptionError>(model)
            })
            .await
            .map(String::as_str)
    }

    async fn request_caption(&self, image: &[u8], prompt: &str) -> Result<String, CaptionError> {
        let image_url = to_png_data_url(image)?;
        let model = self.model().await?;

        let payload = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        { "type": "image_url", "image_url": { "url": image_url } }
                    ]
                }
            ],
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "max_tokens": self.config.max_tokens,
        });

        tracing::debug!(%model, "sending chat completion request");

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CaptionError::Upstream {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let completion: ChatCompletion = serde_json::from_str(&body)
            .map_err(|e| CaptionError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| CaptionError::MalformedResponse("no caption in response".into()))
    }
}

impl Captioner for OpenAiCaptioner {
    async fn caption(&self, image: &[u8], prompt: &str) -> Result<String, CaptionError> {
        self.request_caption(image, prompt).await
    }
}

/// Decode any supported image format and re-encode it as a PNG data URL.
pub fn to_png_data_url(image: &[u8]) -> Result<String, CaptionError> {
    let img = image::load_from_memory(image)?;

    let mut png_bytes = Vec::new();
    img.write_to(
        &mut Cursor::new(&mut png_bytes),
        image::ImageOutputFormat::Png,
    )?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(&png_bytes)
    ))
}
