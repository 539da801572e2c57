use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use super::element_text;
use crate::model::{Station, StationId};
use crate::text::fix_directional_text;

static CAPTION_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#lblCaption").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

const CAPTION_SEPARATOR: &str = "- ";
const STATION_PAGE: &str = "StationInfo5";
const INTERVAL_PAGE: &str = "StationReportFast";

/// What a region page yields before any station is contacted.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPage {
    pub display_name: String,
    /// Raw `href` values of station-detail links, in page order.
    pub station_links: Vec<String>,
}

pub fn parse(body: &str) -> RegionPage {
    let doc = Html::parse_document(body);

    let caption = doc
        .select(&CAPTION_SEL)
        .next()
        .map(element_text)
        .unwrap_or_default();
    let display_name = caption
        .split(CAPTION_SEPARATOR)
        .nth(1)
        .map(|name| fix_directional_text(name.trim()))
        .unwrap_or_default();

    let station_links = doc
        .select(&ANCHOR_SEL)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(STATION_PAGE))
        .map(str::to_string)
        .collect();

    RegionPage {
        display_name,
        station_links,
    }
}

/// Resolve station links against the site root. Ids follow link order and
/// are assigned before resolution, so a skipped link never shifts the ids of
/// the links after it.
pub fn resolve_stations(links: &[String], base: &Url) -> Vec<Station> {
    links
        .iter()
        .enumerate()
        .filter_map(|(index, href)| {
            let interval_href = href.replace(STATION_PAGE, INTERVAL_PAGE);
            match (base.join(href), base.join(&interval_href)) {
                (Ok(data_url), Ok(interval_url)) => Some(Station {
                    id: StationId(index),
                    data_url,
                    interval_url,
                }),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Skipping unresolvable station link {:?}: {}", href, e);
                    None
                }
            }
        })
        .collect()
}
