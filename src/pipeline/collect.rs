use futures::future::join_all;
use indicatif::ProgressBar;
use tracing::{info, warn};

use super::region;
use crate::config::CollectorConfig;
use crate::error::CollectionError;
use crate::fetch::PageFetcher;
use crate::model::AggregateDocument;

/// Run every region in `config.regions` at once and concatenate their
/// measurements in region-id order.
///
/// Regions do not cancel each other; each runs to completion. If any of them
/// failed, the run fails as a whole and no document is produced.
pub async fn collect<F: PageFetcher>(
    fetcher: &F,
    config: &CollectorConfig,
    progress: &ProgressBar,
) -> Result<AggregateDocument, CollectionError> {
    let ids: Vec<u32> = config.regions.clone().collect();
    info!(
        "Collecting {} regions from {} ({})",
        ids.len(),
        config.source.name,
        config.source.url
    );

    // join_all yields results in input order, whatever order they finish in
    let results = join_all(ids.iter().map(|&id| async move {
        let result = region::collect(fetcher, config, id).await;
        progress.inc(1);
        result
    }))
    .await;

    let total = results.len();
    let mut measurements = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(report) => measurements.extend(report.measurements),
            Err(e) => {
                warn!("{}", e);
                failures.push(e);
            }
        }
    }

    if !failures.is_empty() {
        return Err(CollectionError { total, failures });
    }

    info!("Collected {} measurements from {} regions", measurements.len(), total);
    Ok(AggregateDocument::new(measurements))
}
