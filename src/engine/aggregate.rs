//! Deterministic merge of per-app result batches

use crate::DisplayRow;

/// All rows produced for one app during a refresh
#[derive(Debug, Clone, PartialEq)]
pub struct AppBatch {
    pub app: String,
    /// Rows in label order, or the single synthetic `Connection` row
    pub rows: Vec<DisplayRow>,
}

/// Flatten batches into display order.
///
/// Batches arrive in completion order; the result is ordered by app name
/// with each batch's internal order preserved, so the output only depends on
/// the set of batches.
pub fn aggregate(mut batches: Vec<AppBatch>) -> Vec<DisplayRow> {
    batches.sort_by(|a, b| a.app.cmp(&b.app));

    batches.into_iter().flat_map(|batch| batch.rows).collect()
}
