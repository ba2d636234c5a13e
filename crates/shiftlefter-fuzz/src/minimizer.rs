//! Delta-debug minimization: shrink a failing case while preserving the
//! failure signature it reproduces.
//!
//! Two strategies run in sequence: `structured`, which removes whole
//! blank-line-separated blocks (a scenario, an examples table, a docstring),
//! then `raw_lines`, which removes individual lines once no whole block can
//! be dropped. Both are the classic ddmin algorithm over different chunkings
//! of the same text.

use std::time::{Duration, Instant};

fn split_structured(src: &str) -> Vec<String> {
    src.split("\n\n").map(str::to_owned).collect()
}

fn split_raw_lines(src: &str) -> Vec<String> {
    src.lines().map(str::to_owned).collect()
}

/// Shrinks a failing case against a caller-supplied reproduction check,
/// bounded by a global wall-clock budget.
pub struct Minimizer {
    deadline: Instant,
}

impl Minimizer {
    /// Build a minimizer with `budget` wall-clock time to spend overall,
    /// across both strategies.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Shrink `source`, calling `check(candidate)` for each candidate and
    /// keeping it only if `check` returns `true` (the candidate still
    /// reproduces the target failure). Returns the smallest input found.
    pub fn minimize(&self, source: &str, mut check: impl FnMut(&str) -> bool) -> String {
        let structured = self.ddmin(split_structured(source), "\n\n", &mut check);
        let joined = structured.join("\n\n");
        if self.expired() {
            return joined;
        }
        let raw = self.ddmin(split_raw_lines(&joined), "\n", &mut check);
        raw.join("\n")
    }

    fn ddmin(&self, mut chunks: Vec<String>, sep: &str, check: &mut impl FnMut(&str) -> bool) -> Vec<String> {
        let mut granularity = 2usize;
        while chunks.len() >= 2 {
            if self.expired() {
                break;
            }
            let len = chunks.len();
            let subset_len = len.div_ceil(granularity);
            let mut reduced = false;
            let mut start = 0;
            while start < len {
                if self.expired() {
                    break;
                }
                let end = (start + subset_len).min(len);
                let complement: Vec<String> = chunks
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i < start || *i >= end)
                    .map(|(_, c)| c.clone())
                    .collect();
                if !complement.is_empty() && check(&complement.join(sep)) {
                    chunks = complement;
                    granularity = granularity.saturating_sub(1).max(2);
                    reduced = true;
                    break;
                }
                start += subset_len;
            }
            if !reduced {
                if granularity >= chunks.len() {
                    break;
                }
                granularity = (granularity * 2).min(chunks.len());
            }
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrinks_to_the_single_line_carrying_the_marker() {
        let source = "a\nb\nBOOM\nc\nd\ne\n";
        let minimizer = Minimizer::new(Duration::from_secs(2));
        let result = minimizer.minimize(source, |candidate| candidate.contains("BOOM"));
        assert!(result.contains("BOOM"));
        assert!(result.len() < source.len());
    }

    #[test]
    fn never_shrinks_past_what_still_reproduces() {
        let source = "x\ny\nBOOM\nz\n";
        let minimizer = Minimizer::new(Duration::from_secs(2));
        let result = minimizer.minimize(source, |candidate| candidate.contains("BOOM"));
        assert!(result.contains("BOOM"));
    }

    #[test]
    fn an_expired_budget_stops_without_panicking() {
        let source = "a\nb\nBOOM\nc\n";
        let minimizer = Minimizer::new(Duration::from_nanos(1));
        let result = minimizer.minimize(source, |candidate| candidate.contains("BOOM"));
        assert!(result.contains("BOOM"));
    }
}
