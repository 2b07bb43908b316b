use crate::settings::ScoreSettings;

use super::MetricsSnapshot;

const MAX_SCORE: i32 = 100;

/// Score a snapshot: start at 100 and subtract the penalty once for every
/// threshold exceeded. Missing memory metrics never cost points.
pub fn compute_score(snapshot: &MetricsSnapshot, settings: &ScoreSettings) -> u8 {
    let timing = &snapshot.timing;
    let memory_over = snapshot
        .memory
        .map(|memory| memory.percentage > settings.memory_threshold_percent)
        .unwrap_or(false);

    let violations = [
        timing.lcp > settings.lcp_threshold_ms,
        timing.fid > settings.fid_threshold_ms,
        timing.cls > settings.cls_threshold,
        memory_over,
    ]
    .iter()
    .filter(|violated| **violated)
    .count() as i32;

    let score = MAX_SCORE - violations * i32::from(settings.penalty);
    score.clamp(0, MAX_SCORE) as u8
}
