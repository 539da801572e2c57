use tracing::info;

use super::stations;
use crate::config::CollectorConfig;
use crate::error::RegionError;
use crate::fetch::PageFetcher;
use crate::model::{Measurement, Region};
use crate::parser;

/// What one region contributes to the aggregate document.
#[derive(Debug)]
pub struct RegionReport {
    pub id: u32,
    pub name: String,
    pub stations: usize,
    pub measurements: Vec<Measurement>,
}

/// Fetch a region page and resolve its stations, without touching them.
pub async fn discover<F: PageFetcher>(
    fetcher: &F,
    config: &CollectorConfig,
    region_id: u32,
) -> Result<Region, RegionError> {
    let url = config
        .source
        .region_url(region_id)
        .map_err(|source| RegionError::InvalidUrl { region_id, source })?;

    let body = fetcher
        .fetch(&url, &config.menu_url())
        .await
        .map_err(|source| RegionError::Fetch { region_id, source })?;

    let page = parser::region::parse(&body);
    let stations = parser::region::resolve_stations(&page.station_links, &config.base_url);

    Ok(Region {
        id: region_id,
        url,
        display_name: page.display_name,
        stations,
    })
}

/// Discovery followed by both station batches for one region. A region
/// without station links contributes an empty list.
pub async fn collect<F: PageFetcher>(
    fetcher: &F,
    config: &CollectorConfig,
    region_id: u32,
) -> Result<RegionReport, RegionError> {
    let region = discover(fetcher, config, region_id).await?;

    if region.stations.is_empty() {
        info!("{}: no station links", region.label());
        return Ok(RegionReport {
            id: region.id,
            name: region.display_name,
            stations: 0,
            measurements: Vec::new(),
        });
    }

    info!("{}: {} stations", region.label(), region.stations.len());
    let measurements = stations::collect(fetcher, &region, config.station_concurrency)
        .await
        .map_err(|source| RegionError::Batch {
            region_id,
            region: region.label(),
            source,
        })?;

    Ok(RegionReport {
        id: region.id,
        stations: region.stations.len(),
        name: region.display_name,
        measurements,
    })
}
