use std::collections::HashSet;

use tracing::debug;

use crate::types::{ListingCandidate, ListingKey};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterStats {
    pub total: usize,
    pub rejected_no_key: usize,
    pub rejected_low_feedback: usize,
    pub rejected_known: usize,
    pub admitted: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FilterOutcome {
    /// New, admissible candidates in the order the search returned them.
    pub admitted: Vec<ListingCandidate>,
    pub stats: FilterStats,
}

enum Rejection {
    NoKey,
    LowFeedback(f64),
    Known,
}

/// Select the candidates worth alerting on: keyed, from a seller at or above
/// `min_feedback_percent`, and not already in `known`.
///
/// Input order is preserved. Candidates are not deduplicated against each other.
pub fn filter_new_listings(
    raw: &[ListingCandidate],
    min_feedback_percent: f64,
    known: &HashSet<ListingKey>,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    outcome.stats.total = raw.len();

    for candidate in raw {
        match check_candidate(candidate, min_feedback_percent, known) {
            Ok(()) => outcome.admitted.push(candidate.clone()),
            Err(Rejection::NoKey) => outcome.stats.rejected_no_key += 1,
            Err(Rejection::LowFeedback(pct)) => {
                outcome.stats.rejected_low_feedback += 1;
                debug!(
                    feedback = pct,
                    title = candidate.display_title(),
                    "Skipping listing from seller with {pct}% feedback",
                );
            }
            Err(Rejection::Known) => outcome.stats.rejected_known += 1,
        }
    }

    outcome.stats.admitted = outcome.admitted.len();
    outcome
}

fn check_candidate(
    candidate: &ListingCandidate,
    min_feedback_percent: f64,
    known: &HashSet<ListingKey>,
) -> std::result::Result<(), Rejection> {
    let Some(key) = candidate.listing_key() else {
        return Err(Rejection::NoKey);
    };

    let feedback = candidate.feedback_percent();
    if feedback < min_feedback_percent {
        return Err(Rejection::LowFeedback(feedback));
    }

    if known.contains(key) {
        return Err(Rejection::Known);
    }

    Ok(())
}

/// Item price plus the first shipping cost, rendered to two decimals.
/// Missing or unparseable amounts count as zero.
pub fn total_price(candidate: &ListingCandidate) -> String {
    let price = candidate.price.as_ref().map(|m| m.amount()).unwrap_or(0.0);
    let shipping = candidate
        .shipping_cost
        .as_ref()
        .map(|m| m.amount())
        .unwrap_or(0.0);
    format!("{:.2}", price + shipping)
}
