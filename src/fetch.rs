use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_12_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";
const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const BASE_BACKOFF_MS: u64 = 2000;

/// One GET against the monitoring site.
pub trait PageFetcher {
    /// Fetch `url` with `referer` as the Referer header and return the body
    /// of a 200 response.
    fn fetch(&self, url: &Url, referer: &Url) -> impl Future<Output = Result<String, FetchError>>;
}

/// `reqwest`-backed fetcher sending the browser-like header set the site
/// expects.
pub struct HttpFetcher {
    client: reqwest::Client,
    retries: u32,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(HTML_ACCEPT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            retries: config.retries,
        })
    }

    async fn fetch_once(&self, url: &Url, referer: &Url) -> Result<String, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .header(REFERER, referer.as_str())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, referer: &Url) -> Result<String, FetchError> {
        debug!("GET {}", url);
        for attempt in 0..self.retries {
            match self.fetch_once(url, referer).await {
                Err(e) if e.is_transient() => {
                    let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                    warn!(
                        "{} (attempt {}/{}), backing off {:.1}s",
                        e,
                        attempt + 1,
                        self.retries,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                }
                result => return result,
            }
        }

        self.fetch_once(url, referer).await
    }
}
