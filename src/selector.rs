//! Weighted random prompt selection.
//!
//! A draw `r` is taken uniformly from `[0, total)` where `total` is the sum of
//! positive weights. Configs are walked in order and the first one whose
//! running weight reaches `r` wins, so ties go to the earliest index.

use rand::Rng;

use crate::types::PromptConfig;

/// Pick one config index. Returns `None` only for an empty slice.
///
/// When no config carries a positive weight the choice falls back to a
/// uniform draw over all configs.
pub fn select<R: Rng + ?Sized>(configs: &[PromptConfig], rng: &mut R) -> Option<usize> {
    if configs.is_empty() {
        return None;
    }

    if total_weight(configs) <= 0.0 {
        return Some(rng.gen_range(0..configs.len()));
    }

    select_with_fraction(configs, rng.gen::<f64>())
}

/// Walk `configs` with `r = fraction * total`. `fraction` is expected in
/// `[0, 1)`. Returns `None` when no config is eligible.
pub fn select_with_fraction(configs: &[PromptConfig], fraction: f64) -> Option<usize> {
    let total = total_weight(configs);
    if total <= 0.0 {
        return None;
    }

    let r = fraction * total;
    let mut running = 0.0;
    let mut last_eligible = None;

    for (index, config) in configs.iter().enumerate() {
        if !config.is_eligible() {
            continue;
        }
        running += config.weight;
        last_eligible = Some(index);
        if running >= r {
            return Some(index);
        }
    }

    // rounding left the running sum just short of `r`
    last_eligible
}

/// Assign a config index to each of `count` items, independently.
pub fn assign<R: Rng + ?Sized>(count: usize, configs: &[PromptConfig], rng: &mut R) -> Vec<usize> {
    (0..count).filter_map(|_| select(configs, rng)).collect()
}

pub fn total_weight(configs: &[PromptConfig]) -> f64 {
    configs
        .iter()
        .filter(|c| c.is_eligible())
        .map(|c| c.weight)
        .sum()
}
