use std::fmt::{self, Write};

use crate::{
    client::ApiConfig,
    selector::total_weight,
    types::{BatchResult, PromptConfig},
};

const LISTED_FILES: usize = 10;

/// Markdown report of a finished batch.
pub fn render(
    result: &BatchResult,
    configs: &[PromptConfig],
    file_names: &[String],
    api: &ApiConfig,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let total_weight = total_weight(configs);

    writeln!(out, "## Caption batch complete\n")?;
    writeln!(out, "### Statistics")?;
    writeln!(out, "- **Total images**: {}", result.total)?;
    writeln!(out, "- **Succeeded**: {}", result.succeeded)?;
    writeln!(out, "- **Failed**: {}", result.failed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", result.success_rate() * 100.0)?;

    writeln!(out, "### Prompt usage")?;
    for (index, config) in configs.iter().enumerate() {
        let used = result.usage_counts.get(&index).copied().unwrap_or(0);
        let weight_share = if total_weight > 0.0 && config.is_eligible() {
            config.weight / total_weight * 100.0
        } else {
            0.0
        };
        let usage_share = if result.total > 0 {
            used as f64 / result.total as f64 * 100.0
        } else {
            0.0
        };
        writeln!(
            out,
            "- **Prompt {}**: weight {:.1} ({:.1}%) -> used {} times ({:.1}%)",
            index + 1,
            config.weight,
            weight_share,
            used,
            usage_share
        )?;
    }

    writeln!(out, "\n### Files")?;
    for name in file_names.iter().take(LISTED_FILES) {
        writeln!(out, "- {}", name)?;
    }
    if file_names.len() > LISTED_FILES {
        writeln!(out, "... and {} more", file_names.len() - LISTED_FILES)?;
    }

    writeln!(out, "\n### Settings")?;
    writeln!(out, "- **API endpoint**: {}", api.base_url)?;
    writeln!(
        out,
        "- **Sampling**: Temperature={}, Top-p={}, Max-tokens={}",
        api.temperature, api.top_p, api.max_tokens
    )?;
    writeln!(
        out,
        "- **Active prompts**: {}",
        configs.iter().filter(|c| c.is_eligible()).count()
    )?;

    Ok(out)
}
