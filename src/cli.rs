use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    artifact,
    client::{ApiConfig, OpenAiCaptioner},
    dispatch::{self, DispatchOptions},
    prompt::PromptSpec,
    server::{self, AppState},
    summary,
    types::{PromptConfig, WorkItem},
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif", "tif", "tiff"];

#[derive(Parser, Debug)]
#[command(name = "mixcaption", version, about = "Weighted multi-prompt image captioning")]
pub struct Cli {
    #[command(flatten)]
    pub api: ApiArgs,

    #[command(flatten)]
    pub dispatch: DispatchArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the web UI
    Serve {
        #[arg(long, env = "MIXCAPTION_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "MIXCAPTION_PORT", default_value_t = 7860)]
        port: u16,

        /// Maximum upload size in megabytes
        #[arg(long, default_value_t = 200)]
        body_limit_mb: usize,
    },

    /// Caption image files or directories
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Prompt as type:length:weight[:extra,...], repeatable
        #[arg(long = "prompt", short = 'p')]
        prompts: Vec<PromptSpec>,

        /// Seed for prompt assignment
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory, or a path ending in .zip
        #[arg(long, short = 'o', default_value = "captions")]
        out: PathBuf,
    },

    /// Check that the endpoint is reachable and lists a model
    TestConnection,
}

#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    #[arg(long, global = true, env = "MIXCAPTION_API_BASE", default_value = "http://127.0.0.1:8000/v1")]
    pub api_base: String,

    #[arg(long, global = true, env = "MIXCAPTION_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, global = true, env = "MIXCAPTION_MODEL")]
    pub model: Option<String>,

    #[arg(long, global = true, default_value_t = 0.9)]
    pub temperature: f32,

    #[arg(long, global = true, default_value_t = 0.7)]
    pub top_p: f32,

    #[arg(long, global = true, default_value_t = 256)]
    pub max_tokens: u32,

    /// HTTP timeout per request, in seconds
    #[arg(long, global = true, default_value_t = 120)]
    pub request_timeout: u64,
}

impl ApiArgs {
    pub fn to_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone().filter(|m| !m.is_empty()),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            request_timeout_secs: self.request_timeout,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DispatchArgs {
    /// Concurrent caption requests
    #[arg(long, global = true, env = "MIXCAPTION_WORKERS", default_value_t = 3)]
    pub workers: usize,

    /// Seconds to wait for one image before recording it as failed
    #[arg(long, global = true, default_value_t = 60)]
    pub item_timeout: u64,

    /// Pick prompts uniformly when every weight is zero
    #[arg(long, global = true)]
    pub uniform_fallback: bool,
}

impl DispatchArgs {
    pub fn to_options(&self) -> DispatchOptions {
        DispatchOptions {
            max_workers: self.workers.max(1),
            per_item_timeout: Duration::from_secs(self.item_timeout),
            uniform_fallback: self.uniform_fallback,
            ..DispatchOptions::default()
        }
    }
}

/// The two-prompt mix the web form starts with.
pub fn default_prompts() -> Vec<PromptSpec> {
    ["descriptive:short:2.0", "casual:short:1.5"]
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

pub async fn handle_serve(
    api: ApiConfig,
    options: DispatchOptions,
    host: &str,
    port: u16,
    body_limit_mb: usize,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        api,
        options,
        body_limit: body_limit_mb * 1024 * 1024,
    });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", host, port))?;
    let addr = listener.local_addr()?;

    tracing::info!("server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn handle_test_connection(api: ApiConfig) -> anyhow::Result<()> {
    let captioner = OpenAiCaptioner::new(api)?;
    let model = captioner
        .test_connection()
        .await
        .with_context(|| format!("connection to {} failed", captioner.config().base_url))?;
    println!("connected, available model: {}", model);
    Ok(())
}

pub async fn handle_batch(
    api: ApiConfig,
    options: DispatchOptions,
    inputs: &[PathBuf],
    prompts: Vec<PromptSpec>,
    seed: Option<u64>,
    out: &Path,
) -> anyhow::Result<()> {
    let items = collect_inputs(inputs)?;
    let prompts = if prompts.is_empty() {
        default_prompts()
    } else {
        prompts
    };
    let configs: Vec<PromptConfig> = prompts.iter().map(PromptSpec::to_config).collect();

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let captioner = Arc::new(OpenAiCaptioner::new(api.clone())?);
    let result = dispatch::run(items, &configs, captioner, &mut rng, &options, |done, total| {
        tracing::info!("captioned {}/{} images", done, total);
    })
    .await?;

    let names = if out.extension().is_some_and(|ext| ext == "zip") {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(out, artifact::write_archive(&result)?)?;
        artifact::artifact_names(&result)
    } else {
        artifact::write_dir(&result, out)?
    };

    println!("{}", summary::render(&result, &configs, &names, &api)?);
    Ok(())
}

/// Files are taken as given; directories contribute their image files,
/// sorted by name.
pub fn collect_inputs(paths: &[PathBuf]) -> anyhow::Result<Vec<WorkItem>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)
                .with_context(|| format!("failed to read {}", path.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image_path(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }

    files
        .into_iter()
        .map(|path| {
            let payload =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(WorkItem::new(label, payload))
        })
        .collect()
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
