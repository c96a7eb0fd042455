use std::collections::HashMap;

use uuid::Uuid;

use crate::api::{PollOptionResult, PollResults};
use crate::models::PollOption;

/// Share of `total` held by `count`, in percent. Zero when nobody has voted.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

/// Build the results a single viewer sees.
///
/// `counts` maps option id to its running tally; options without a counter
/// count as zero. The total is taken over every counter, matching what the
/// tally table holds rather than only the options currently listed.
pub fn results_for_viewer(
    post_id: Uuid,
    options: &[PollOption],
    counts: &HashMap<String, u64>,
    voted: bool,
) -> PollResults {
    let total: u64 = counts.values().sum();

    let options = options
        .iter()
        .map(|option| {
            let votes = counts.get(&option.id).copied().unwrap_or(0);
            PollOptionResult {
                id: option.id.clone(),
                text: option.text.clone(),
                votes: voted.then_some(votes),
                percentage: voted.then(|| percentage(votes, total)),
            }
        })
        .collect();

    PollResults {
        post_id,
        voted,
        total_votes: voted.then_some(total),
        options,
    }
}
