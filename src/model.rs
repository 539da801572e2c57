use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use url::Url;

pub const COUNTRY_NAME: &str = "Israel";
pub const ATTRIBUTION_NAME: &str = "Israel Ministry of Environmental Protection";
pub const ATTRIBUTION_URL: &str = "http://svivaaqm.net/";

/// Stable identifier assigned to a station when its region page is parsed.
/// Both station batches carry it so results are joined by key, not position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(pub usize);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub data_url: Url,
    pub interval_url: Url,
}

/// One monitoring region after discovery.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: u32,
    pub url: Url,
    pub display_name: String,
    /// Discovery order, never re-sorted.
    pub stations: Vec<Station>,
}

impl Region {
    /// Human-readable label for logs and error messages. Upstream pages
    /// sometimes carry no caption, in which case the id stands in.
    pub fn label(&self) -> String {
        if self.display_name.is_empty() {
            format!("region {}", self.id)
        } else {
            self.display_name.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Parameter {
    #[serde(rename = "SO2")]
    So2,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "O3")]
    O3,
}

impl Parameter {
    /// Map a raw table column header to a tracked pollutant.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim() {
            "SO2" => Some(Parameter::So2),
            "PM10" => Some(Parameter::Pm10),
            "PM2.5" => Some(Parameter::Pm25),
            // the site spells it both ways
            "NO2" | "No2" => Some(Parameter::No2),
            "O3" => Some(Parameter::O3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementDate {
    pub utc: DateTime<Utc>,
    pub local: DateTime<FixedOffset>,
}

/// Averaging window of a station, in hours when it could be normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SamplingInterval {
    Hours(f64),
    /// Leading token of the descriptor when it is not numeric.
    Unnormalized(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AveragingPeriod {
    pub unit: &'static str,
    pub value: SamplingInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub name: &'static str,
    pub url: &'static str,
}

pub fn attribution() -> Vec<Attribution> {
    vec![Attribution {
        name: ATTRIBUTION_NAME,
        url: ATTRIBUTION_URL,
    }]
}

/// A reading projected from a station table whose averaging period is
/// still unknown. Only [`PendingMeasurement::with_interval`] turns it into a
/// [`Measurement`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMeasurement {
    pub parameter: Parameter,
    pub value: f64,
    pub unit: String,
    pub date: MeasurementDate,
    pub coordinates: Option<Coordinates>,
}

impl PendingMeasurement {
    pub fn with_interval(self, interval: SamplingInterval) -> Measurement {
        Measurement {
            parameter: self.parameter,
            value: self.value,
            unit: self.unit,
            date: self.date,
            coordinates: self.coordinates,
            averaging_period: AveragingPeriod {
                unit: "hours",
                value: interval,
            },
            attribution: attribution(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub parameter: Parameter,
    pub value: f64,
    pub unit: String,
    pub date: MeasurementDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub averaging_period: AveragingPeriod,
    pub attribution: Vec<Attribution>,
}

/// The single artifact of a collection run.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateDocument {
    pub name: &'static str,
    pub measurements: Vec<Measurement>,
}

impl AggregateDocument {
    pub fn new(measurements: Vec<Measurement>) -> Self {
        Self {
            name: COUNTRY_NAME,
            measurements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parameter_headers() {
        assert_eq!(Parameter::from_header("PM2.5"), Some(Parameter::Pm25));
        assert_eq!(Parameter::from_header(" No2 "), Some(Parameter::No2));
        assert_eq!(Parameter::from_header("CO"), None);
        assert_eq!(Parameter::from_header("pm10"), None);
    }

    #[test]
    fn measurement_serializes_openaq_shape() {
        let local = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .unwrap();
        let pending = PendingMeasurement {
            parameter: Parameter::Pm25,
            value: 12.5,
            unit: "ug/m3".into(),
            date: MeasurementDate {
                utc: local.with_timezone(&Utc),
                local,
            },
            coordinates: None,
        };
        let doc = AggregateDocument::new(vec![pending.with_interval(SamplingInterval::Hours(0.5))]);
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["name"], "Israel");
        let m = &json["measurements"][0];
        assert_eq!(m["parameter"], "PM2.5");
        assert_eq!(m["date"]["utc"], "2019-12-31T22:00:00Z");
        assert_eq!(m["date"]["local"], "2020-01-01T00:00:00+02:00");
        assert_eq!(m["averagingPeriod"]["unit"], "hours");
        assert_eq!(m["averagingPeriod"]["value"], 0.5);
        assert_eq!(m["attribution"][0]["name"], ATTRIBUTION_NAME);
        assert!(m.get("coordinates").is_none());
    }
}
