pub mod artifact;
pub mod cli;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod page;
pub mod prompt;
pub mod selector;
pub mod server;
pub mod summary;
pub mod types;

pub use client::{ApiConfig, Captioner, OpenAiCaptioner};
pub use dispatch::{run, DispatchOptions};
pub use error::{CaptionError, ConfigError};
pub use types::{Artifact, ArtifactContent, BatchResult, PromptConfig, WorkItem};
