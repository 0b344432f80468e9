use std::{collections::HashMap, sync::Arc, time::Instant};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::{
    artifact,
    client::{ApiConfig, Captioner, OpenAiCaptioner},
    dispatch::{self, DispatchOptions},
    error::{ApiError, CaptionError},
    page,
    prompt::PromptSpec,
    summary,
    types::{BatchResult, PromptConfig, WorkItem},
};

pub struct AppState {
    pub api: ApiConfig,
    pub options: DispatchOptions,
    pub body_limit: usize,
}

/// Per-request overrides of the server's default endpoint settings.
#[derive(Debug, Default, Deserialize)]
pub struct ApiOverride {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ApiOverride {
    pub fn apply(self, base: &ApiConfig) -> ApiConfig {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let mut config = base.clone();
        if let Some(base_url) = non_empty(self.base_url) {
            config.base_url = base_url;
        }
        if let Some(api_key) = non_empty(self.api_key) {
            config.api_key = api_key;
        }
        if let Some(model) = non_empty(self.model) {
            config.model = Some(model);
        }
        config.temperature = self.temperature.unwrap_or(config.temperature);
        config.top_p = self.top_p.unwrap_or(config.top_p);
        config.max_tokens = self.max_tokens.unwrap_or(config.max_tokens);
        config
    }
}

#[derive(Serialize)]
struct ConnectionResponse {
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct CaptionResponse {
    caption: String,
    prompt: String,
    model: Option<String>,
    processing_time_ms: u128,
}

#[derive(Serialize)]
struct BatchResponse {
    summary: String,
    result: BatchResult,
    archive_name: &'static str,
    archive_base64: String,
    processing_time_ms: u128,
}

pub fn router(state: Arc<AppState>) -> Router {
    let layers = ServiceBuilder::new()
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(state.body_limit));

    Router::new()
        .route("/", get(index))
        .route("/api/test-connection", post(test_connection))
        .route("/api/caption", post(caption_single))
        .route("/api/batch", post(caption_batch))
        .layer(layers)
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(page::INDEX)
}

async fn test_connection(
    State(state): State<Arc<AppState>>,
    Json(overrides): Json<ApiOverride>,
) -> Result<Json<ConnectionResponse>, ApiError> {
    let api = overrides.apply(&state.api);
    let captioner = OpenAiCaptioner::new(api)?;
    let model = captioner.test_connection().await?;

    tracing::info!(%model, base_url = %captioner.config().base_url, "connection test passed");

    Ok(Json(ConnectionResponse {
        model,
        base_url: captioner.config().base_url.clone(),
    }))
}

/// Uploaded files plus the remaining text fields of a multipart form.
struct UploadForm {
    images: Vec<WorkItem>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut images = Vec::new();
        let mut fields = HashMap::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" | "images" => {
                    let label = field
                        .file_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("image_{}", images.len() + 1));
                    let data = field.bytes().await?;
                    if !data.is_empty() {
                        images.push(WorkItem::new(label, data.to_vec()));
                    }
                }
                _ => {
                    let value = field.text().await?;
                    fields.insert(name, value);
                }
            }
        }

        Ok(Self { images, fields })
    }

    fn api(&mut self, base: &ApiConfig) -> Result<ApiConfig, ApiError> {
        let overrides = match self.fields.remove("api") {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<ApiOverride>(&raw)?,
            _ => ApiOverride::default(),
        };
        Ok(overrides.apply(base))
    }

    fn prompts(&mut self) -> Result<Vec<PromptSpec>, ApiError> {
        match self.fields.remove("prompts") {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn seed(&self) -> Result<Option<u64>, ApiError> {
        match self.fields.get("seed").map(|s| s.trim()) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("invalid seed: {}", raw))),
        }
    }
}

async fn caption_single(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<CaptionResponse>, ApiError> {
    let start = Instant::now();
    let mut form = UploadForm::read(multipart).await?;
    let api = form.api(&state.api)?;

    let image = form
        .images
        .pop()
        .ok_or_else(|| ApiError::bad_request("please upload an image first"))?;
    let prompt = match form.fields.get("prompt") {
        Some(raw) => serde_json::from_str::<PromptSpec>(raw)?.to_config().prompt,
        None => form
            .fields
            .get("prompt_text")
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .ok_or_else(|| ApiError::bad_request("a prompt is required"))?,
    };

    let captioner = OpenAiCaptioner::new(api)?;
    let limit = state.options.per_item_timeout;
    let caption = tokio::time::timeout(limit, captioner.caption(&image.payload, &prompt))
        .await
        .map_err(|_| CaptionError::TimedOut(limit))??;

    let elapsed = start.elapsed().as_millis();
    tracing::info!(label = %image.label, elapsed_ms = elapsed as u64, "single caption done");

    Ok(Json(CaptionResponse {
        caption,
        prompt,
        model: captioner.model_id().map(str::to_string),
        processing_time_ms: elapsed,
    }))
}

async fn caption_batch(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let start = Instant::now();
    let mut form = UploadForm::read(multipart).await?;
    let api = form.api(&state.api)?;
    let seed = form.seed()?;
    let configs: Vec<PromptConfig> = form.prompts()?.iter().map(PromptSpec::to_config).collect();

    // checked here so a bad form never builds a client
    dispatch::validate(&form.images, &configs, &state.options)?;

    let captioner = Arc::new(OpenAiCaptioner::new(api.clone())?);
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let result = dispatch::run(
        form.images,
        &configs,
        captioner,
        &mut rng,
        &state.options,
        |done, total| tracing::debug!("batch progress {}/{}", done, total),
    )
    .await?;

    let archive = artifact::write_archive(&result)
        .map_err(|e| ApiError::internal(format!("failed to build archive: {}", e)))?;
    let names = artifact::artifact_names(&result);
    let summary = summary::render(&result, &configs, &names, &api)
        .map_err(|e| ApiError::internal(format!("failed to render summary: {}", e)))?;

    Ok(Json(BatchResponse {
        summary,
        result,
        archive_name: artifact::ARCHIVE_NAME,
        archive_base64: general_purpose::STANDARD.encode(archive),
        processing_time_ms: start.elapsed().as_millis(),
    }))
}
