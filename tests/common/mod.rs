//! Scripted fetcher and HTML builders shared by the pipeline tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use svivaaqm_collector::config::CollectorConfig;
use svivaaqm_collector::{FetchError, PageFetcher, SourceDescriptor};
use url::Url;

pub const BASE: &str = "http://aq.test/";

#[derive(Clone)]
enum Reply {
    Body(String),
    Status(u16),
}

#[derive(Clone)]
struct Page {
    delay: Duration,
    reply: Reply,
}

#[derive(Default)]
struct Gauge {
    now: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.now.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory site. Unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, Page>,
    requested: Mutex<Vec<String>>,
    data_in_flight: Gauge,
    interval_in_flight: Gauge,
    total_in_flight: Gauge,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, delay_ms: u64, body: String) -> Self {
        self.pages.insert(
            url.to_string(),
            Page {
                delay: Duration::from_millis(delay_ms),
                reply: Reply::Body(body),
            },
        );
        self
    }

    pub fn failing(mut self, url: &str, delay_ms: u64, status: u16) -> Self {
        self.pages.insert(
            url.to_string(),
            Page {
                delay: Duration::from_millis(delay_ms),
                reply: Reply::Status(status),
            },
        );
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn peak_data_in_flight(&self) -> usize {
        self.data_in_flight.peak.load(Ordering::SeqCst)
    }

    pub fn peak_interval_in_flight(&self) -> usize {
        self.interval_in_flight.peak.load(Ordering::SeqCst)
    }

    pub fn peak_total_in_flight(&self) -> usize {
        self.total_in_flight.peak.load(Ordering::SeqCst)
    }
}

impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url, _referer: &Url) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        let page = self.pages.get(url.as_str()).cloned().unwrap_or(Page {
            delay: Duration::ZERO,
            reply: Reply::Status(404),
        });

        let gauge = if url.path().contains("StationReportFast") {
            Some(&self.interval_in_flight)
        } else if url.path().contains("StationInfo5") {
            Some(&self.data_in_flight)
        } else {
            None
        };
        if let Some(g) = gauge {
            g.enter();
        }
        self.total_in_flight.enter();

        if !page.delay.is_zero() {
            tokio::time::sleep(page.delay).await;
        }

        self.total_in_flight.leave();
        if let Some(g) = gauge {
            g.leave();
        }

        match page.reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }
}

pub fn config(first: u32, last: u32) -> CollectorConfig {
    CollectorConfig {
        source: SourceDescriptor::new("test", format!("{BASE}region/<id>")).unwrap(),
        regions: first..=last,
        base_url: Url::parse(BASE).unwrap(),
        station_concurrency: 2,
    }
}

pub fn region_url(id: u32) -> String {
    format!("{BASE}region/{id}")
}

/// Data page URL of station `st` as linked from a region page.
pub fn data_url(st: u32) -> String {
    format!("{BASE}StationInfo5.aspx?ST_ID={st}")
}

pub fn interval_url(st: u32) -> String {
    format!("{BASE}StationReportFast.aspx?ST_ID={st}")
}

/// `caption` is given in display order and emitted reversed, the way the
/// site serves it.
pub fn region_html(caption: &str, stations: &[u32]) -> String {
    let reversed: String = caption.chars().rev().collect();
    let links: String = stations
        .iter()
        .map(|st| format!(r#"<tr><td><a href="StationInfo5.aspx?ST_ID={st}">station {st}</a></td></tr>"#))
        .collect();
    format!(
        r#"<html><body><span id="lblCaption">Stations - {reversed}</span>
<a href="MenuSite.aspx">menu</a><table>{links}</table></body></html>"#
    )
}

pub fn station_html(rows: &[&[&str]]) -> String {
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
            format!("<tr>{cells}</tr>")
        })
        .collect();
    format!(
        r#"<html><body><table><tr><td><table id="C1WebGrid1">{rows}</table></td></tr></table></body></html>"#
    )
}

/// Single-pollutant station page whose SO2 value identifies it in output.
pub fn so2_station_html(value: &str) -> String {
    station_html(&[
        &["Date", "SO2"],
        &["", "ppb"],
        &["01/01/2020 00:00:00", value],
    ])
}

pub fn interval_html(descriptor: &str) -> String {
    format!(
        r#"<html><body><select id="ddlTimeBase"><option>{descriptor}</option><option>1 Hour</option></select></body></html>"#
    )
}
