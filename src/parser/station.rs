use std::sync::LazyLock;

use chrono::{Days, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Asia::Jerusalem;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{child_elements, element_text, table_rows};
use crate::model::{Coordinates, MeasurementDate, Parameter, PendingMeasurement};
use crate::text::{decimal_prefix, has_integer_prefix};

static GRID_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#C1WebGrid1").unwrap());
static INFO_TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div #stationInfoDiv > table").unwrap());
static INFO_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""value">([^<]*)<"#).unwrap());

// The grid sometimes leaves the seconds off.
const TIMESTAMP_FORMATS: [&str; 2] = ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];
const LONGITUDE_ROW: usize = 6;
const LATITUDE_ROW: usize = 7;

// Row layout of the data grid.
const HEADER_ROW: usize = 0;
const UNIT_ROW: usize = 1;
const VALUE_ROW: usize = 2;

/// Raw contents of one station data page.
#[derive(Debug, Clone, PartialEq)]
pub struct StationPage {
    /// Grid rows as cell text. Rows without cells are dropped.
    pub rows: Vec<Vec<String>>,
    pub coordinates: Option<Coordinates>,
}

pub fn parse(body: &str) -> StationPage {
    let doc = Html::parse_document(body);

    // direct rows and cells only, so a table nested in a cell cannot
    // shift the column layout
    let rows = doc
        .select(&GRID_SEL)
        .next()
        .map(|grid| {
            table_rows(grid)
                .into_iter()
                .map(|row| {
                    child_elements(row)
                        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                        .map(element_text)
                        .collect::<Vec<_>>()
                })
                .filter(|cells| !cells.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let coordinates = doc.select(&INFO_TABLE_SEL).find_map(parse_coordinates);

    StationPage { rows, coordinates }
}

fn parse_coordinates(table: ElementRef<'_>) -> Option<Coordinates> {
    let rows = table_rows(table);
    let value_at = |index: usize| -> Option<f64> {
        let html = rows.get(index)?.inner_html();
        let raw = INFO_VALUE_RE.captures(&html)?.get(1)?.as_str().trim().to_string();
        match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                debug!("Unparseable coordinate {:?} in station info row {}", raw, index);
                None
            }
        }
    };

    Some(Coordinates {
        longitude: value_at(LONGITUDE_ROW)?,
        latitude: value_at(LATITUDE_ROW)?,
    })
}

/// Station timestamps are wall-clock Israel time, with or without seconds.
/// The grid writes midnight as `24:00` of the previous day.
pub fn parse_local_time(raw: &str) -> Option<MeasurementDate> {
    let raw = raw.trim();
    let naive = match parse_naive(raw) {
        Some(naive) => naive,
        None if raw.contains(" 24:00") => parse_naive(&raw.replacen(" 24:00", " 00:00", 1))?
            .checked_add_days(Days::new(1))?,
        None => return None,
    };

    let local = Jerusalem.from_local_datetime(&naive).earliest()?;
    Some(MeasurementDate {
        utc: local.with_timezone(&Utc),
        local: local.fixed_offset(),
    })
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Project the grid into readings for tracked pollutants. Pages with fewer
/// than three rows carry no data and yield nothing.
pub fn project_measurements(page: &StationPage) -> Vec<PendingMeasurement> {
    if page.rows.len() <= VALUE_ROW {
        return Vec::new();
    }
    let header = &page.rows[HEADER_ROW];
    let units = &page.rows[UNIT_ROW];
    let values = &page.rows[VALUE_ROW];

    let readings: Vec<(Parameter, f64, String)> = header
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(column, title)| {
            let parameter = Parameter::from_header(title)?;
            let raw = values.get(column)?;
            // integer-prefix test, so "12.7mg" is a reading and "N/A" is not
            if !has_integer_prefix(raw) {
                return None;
            }
            let value = decimal_prefix(raw)?;
            let unit = units.get(column).cloned().unwrap_or_default();
            Some((parameter, value, unit))
        })
        .collect();

    if readings.is_empty() {
        return Vec::new();
    }

    let stamp = values.first().map(String::as_str).unwrap_or_default();
    let Some(date) = parse_local_time(stamp) else {
        warn!("Dropping {} readings with unparseable timestamp {:?}", readings.len(), stamp);
        return Vec::new();
    };

    readings
        .into_iter()
        .map(|(parameter, value, unit)| PendingMeasurement {
            parameter,
            value,
            unit,
            date: date.clone(),
            coordinates: page.coordinates,
        })
        .collect()
}
