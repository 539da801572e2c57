use std::ops::RangeInclusive;
use std::time::Duration;

use url::Url;

pub const DEFAULT_SOURCE_NAME: &str = "israel";
pub const DEFAULT_URL_TEMPLATE: &str = "http://www.svivaaqm.net/DynamicTable.aspx?G_ID=<id>";
pub const DEFAULT_BASE_URL: &str = "http://www.svivaaqm.net/";
pub const DEFAULT_FIRST_REGION: u32 = 9;
pub const DEFAULT_LAST_REGION: u32 = 20;
/// Simultaneous requests per station batch. The upstream host starts
/// refusing connections when hit harder than this.
pub const DEFAULT_STATION_CONCURRENCY: usize = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const ID_PLACEHOLDER: &str = "<id>";
pub const MENU_PAGE: &str = "MenuSite.aspx";

/// Where region pages live. `url` carries an `<id>` placeholder.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> anyhow::Result<Self> {
        let url = url.into();
        anyhow::ensure!(
            url.contains(ID_PLACEHOLDER),
            "source url template must contain {ID_PLACEHOLDER}: {url}"
        );
        Ok(Self {
            name: name.into(),
            url,
        })
    }

    /// Region page URL for one id. Each call substitutes into the pristine
    /// template, so every region gets its own id.
    pub fn region_url(&self, id: u32) -> Result<Url, url::ParseError> {
        Url::parse(&self.url.replace(ID_PLACEHOLDER, &id.to_string()))
    }
}

impl Default for SourceDescriptor {
    fn default() -> Self {
        Self {
            name: DEFAULT_SOURCE_NAME.to_string(),
            url: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub source: SourceDescriptor,
    pub regions: RangeInclusive<u32>,
    /// Base for resolving relative station links.
    pub base_url: Url,
    pub station_concurrency: usize,
}

impl CollectorConfig {
    /// Referer sent with region page requests.
    pub fn menu_url(&self) -> Url {
        self.base_url
            .join(MENU_PAGE)
            .unwrap_or_else(|_| self.base_url.clone())
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            source: SourceDescriptor::default(),
            regions: DEFAULT_FIRST_REGION..=DEFAULT_LAST_REGION,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            station_concurrency: DEFAULT_STATION_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    /// Extra attempts after a transient failure. Zero keeps single-shot
    /// semantics.
    pub retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: 0,
        }
    }
}
