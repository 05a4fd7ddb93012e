//! Best-parse selection among grammar-branch candidates.

use std::cmp::Ordering;

use tracing::{debug, trace};

use super::ast::ParseCandidate;

/// Orders candidates so that the better one compares greater.
///
/// More arguments win; then the longer contiguous run of matched lines;
/// then the lower branch priority. The branch name settles anything left so
/// the choice never depends on input order.
pub fn compare_candidates(a: &ParseCandidate, b: &ParseCandidate) -> Ordering {
    a.arg_count()
        .cmp(&b.arg_count())
        .then_with(|| a.longest_run.cmp(&b.longest_run))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| b.strategy.cmp(a.strategy))
}

/// Picks the winning candidate, or `None` when no branch produced one.
pub fn select_best(candidates: Vec<ParseCandidate>) -> Option<ParseCandidate> {
    for candidate in &candidates {
        trace!(
            strategy = candidate.strategy,
            args = candidate.arg_count(),
            longest_run = candidate.longest_run,
            matched_lines = candidate.matched_lines,
            priority = candidate.priority,
            "parse candidate"
        );
    }
    let best = candidates.into_iter().max_by(compare_candidates)?;
    debug!(
        strategy = best.strategy,
        args = best.arg_count(),
        span_start = best.span.line_start,
        span_end = best.span.line_end,
        "selected parse"
    );
    Some(best)
}
