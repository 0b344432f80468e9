//! Batch captioning under a bounded worker pool.
//!
//! A run validates its inputs, assigns every item a prompt up front, then
//! captions all items concurrently with at most `max_workers` calls in flight.
//! Per-item failures and timeouts are recorded in the result and never abort
//! the batch.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use rand::Rng;
use tokio::{sync::Semaphore, task::JoinSet, time::timeout};

use crate::{
    client::Captioner,
    error::{CaptionError, ConfigError},
    selector,
    types::{Artifact, ArtifactContent, BatchResult, PromptConfig, WorkItem, FAILURE_PREFIX},
};

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub max_workers: usize,
    pub per_item_timeout: Duration,
    /// Dispatch with uniform selection when no config has positive weight,
    /// instead of failing with [`ConfigError::NoUsablePrompt`].
    pub uniform_fallback: bool,
    /// Treat captions starting with `Error:` as failures.
    pub legacy_error_prefix: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_workers: 3,
            per_item_timeout: Duration::from_secs(60),
            uniform_fallback: false,
            legacy_error_prefix: true,
        }
    }
}

/// Checks the preconditions of a batch without touching the captioner.
pub fn validate(
    items: &[WorkItem],
    configs: &[PromptConfig],
    options: &DispatchOptions,
) -> Result<(), ConfigError> {
    if items.is_empty() {
        return Err(ConfigError::NoInput);
    }
    if configs.is_empty() || configs.iter().any(|c| c.prompt.trim().is_empty()) {
        return Err(ConfigError::NoUsablePrompt);
    }
    if !options.uniform_fallback && !configs.iter().any(PromptConfig::is_eligible) {
        return Err(ConfigError::NoUsablePrompt);
    }
    Ok(())
}

pub async fn run<C, R, P>(
    items: Vec<WorkItem>,
    configs: &[PromptConfig],
    captioner: Arc<C>,
    rng: &mut R,
    options: &DispatchOptions,
    mut on_progress: P,
) -> Result<BatchResult, ConfigError>
where
    C: Captioner,
    R: Rng + ?Sized,
    P: FnMut(usize, usize),
{
    validate(&items, configs, options)?;

    let total = items.len();
    let assignments = selector::assign(total, configs, rng);

    let mut usage_counts: BTreeMap<usize, usize> = (0..configs.len()).map(|i| (i, 0)).collect();
    for &index in &assignments {
        *usage_counts.entry(index).or_default() += 1;
    }

    tracing::info!(
        total,
        prompts = configs.len(),
        workers = options.max_workers,
        "dispatching caption batch"
    );

    let semaphore = Arc::new(Semaphore::new(options.max_workers.max(1)));
    let mut labels = Vec::with_capacity(total);
    let mut workers = JoinSet::new();

    for (position, (item, &prompt_index)) in items.into_iter().zip(&assignments).enumerate() {
        labels.push(item.label);

        let semaphore = Arc::clone(&semaphore);
        let captioner = Arc::clone(&captioner);
        let prompt = configs[prompt_index].prompt.clone();
        let payload = item.payload;
        let limit = options.per_item_timeout;

        workers.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => match timeout(limit, captioner.caption(&payload, &prompt)).await {
                    Ok(result) => result,
                    Err(_) => Err(CaptionError::TimedOut(limit)),
                },
                Err(_) => Err(CaptionError::Rejected("worker pool closed".into())),
            };
            (position, outcome)
        });
    }

    let mut slots: Vec<Option<ArtifactContent>> = vec![None; total];
    let mut completed = 0;

    while let Some(joined) = workers.join_next().await {
        completed += 1;
        match joined {
            Ok((position, outcome)) => {
                let content = classify(outcome, options.legacy_error_prefix);
                if let ArtifactContent::Failed(message) = &content {
                    tracing::warn!(label = %labels[position], "caption failed: {}", message);
                } else {
                    tracing::debug!(label = %labels[position], "caption done");
                }
                slots[position] = Some(content);
            }
            // the slot stays empty and is reported as failed below
            Err(e) => tracing::error!("caption worker aborted: {}", e),
        }
        on_progress(completed, total);
    }

    let artifacts: Vec<Artifact> = labels
        .into_iter()
        .zip(assignments)
        .zip(slots)
        .map(|((label, prompt_index), slot)| Artifact {
            label,
            prompt_index,
            content: slot
                .unwrap_or_else(|| ArtifactContent::Failed("caption worker aborted".into())),
        })
        .collect();

    let succeeded = artifacts.iter().filter(|a| a.content.is_success()).count();
    let result = BatchResult {
        total,
        succeeded,
        failed: total - succeeded,
        usage_counts,
        artifacts,
    };

    tracing::info!(
        total,
        succeeded = result.succeeded,
        failed = result.failed,
        "caption batch finished"
    );

    Ok(result)
}

fn classify(outcome: Result<String, CaptionError>, legacy_error_prefix: bool) -> ArtifactContent {
    match outcome {
        Ok(text) if legacy_error_prefix && text.starts_with(FAILURE_PREFIX) => {
            ArtifactContent::Failed(text[FAILURE_PREFIX.len()..].trim_start().to_string())
        }
        Ok(text) => ArtifactContent::Caption(text),
        Err(e) => ArtifactContent::Failed(e.to_string()),
    }
}
