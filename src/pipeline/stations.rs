use std::collections::HashMap;
use std::future::Future;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::{BatchError, BatchKind};
use crate::fetch::PageFetcher;
use crate::model::{Measurement, PendingMeasurement, Region, SamplingInterval, Station, StationId};
use crate::parser;

/// Readings of one station, keyed by the id it was discovered under.
#[derive(Debug)]
pub struct StationReadings {
    pub station: StationId,
    pub readings: Vec<PendingMeasurement>,
}

#[derive(Debug)]
pub struct StationInterval {
    pub station: StationId,
    pub interval: SamplingInterval,
}

/// Fetch every station of `region` twice (data page and interval page) as
/// two batches, each capped at `limit` in-flight requests, then join them.
///
/// Both batches run concurrently with each other. The first failure in
/// either drops every request still pending in both, and nothing is merged.
pub async fn collect<F: PageFetcher>(
    fetcher: &F,
    region: &Region,
    limit: usize,
) -> Result<Vec<Measurement>, BatchError> {
    let measurement_tasks = region
        .stations
        .iter()
        .map(|station| fetch_readings(fetcher, region, station));
    let interval_tasks = region
        .stations
        .iter()
        .map(|station| fetch_interval(fetcher, region, station));

    let (readings, intervals) = tokio::try_join!(
        run_batch(limit, measurement_tasks),
        run_batch(limit, interval_tasks),
    )?;

    let merged = merge(readings, intervals)?;
    info!(
        "{}: {} measurements from {} stations",
        region.label(),
        merged.len(),
        region.stations.len()
    );
    Ok(merged)
}

/// Drive `tasks` with at most `limit` of them past the semaphore at once.
/// Results come back in task order.
pub async fn run_batch<T, Fut>(
    limit: usize,
    tasks: impl IntoIterator<Item = Fut>,
) -> Result<Vec<T>, BatchError>
where
    Fut: Future<Output = Result<T, BatchError>>,
{
    let semaphore = Semaphore::new(limit.max(1));
    let semaphore = &semaphore;

    try_join_all(tasks.into_iter().map(|task| async move {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| BatchError::LimiterClosed)?;
        task.await
    }))
    .await
}

async fn fetch_readings<F: PageFetcher>(
    fetcher: &F,
    region: &Region,
    station: &Station,
) -> Result<StationReadings, BatchError> {
    let body = fetcher
        .fetch(&station.data_url, &region.url)
        .await
        .map_err(|source| BatchError::Station {
            kind: BatchKind::Measurements,
            station: station.id,
            source,
        })?;

    let page = parser::station::parse(&body);
    let readings = parser::station::project_measurements(&page);
    debug!(
        "Station {} ({}): {} rows, {} readings",
        station.id,
        station.data_url,
        page.rows.len(),
        readings.len()
    );

    Ok(StationReadings {
        station: station.id,
        readings,
    })
}

async fn fetch_interval<F: PageFetcher>(
    fetcher: &F,
    region: &Region,
    station: &Station,
) -> Result<StationInterval, BatchError> {
    let body = fetcher
        .fetch(&station.interval_url, &region.url)
        .await
        .map_err(|source| BatchError::Station {
            kind: BatchKind::Intervals,
            station: station.id,
            source,
        })?;

    Ok(StationInterval {
        station: station.id,
        interval: parser::interval::parse(&body),
    })
}

/// Attach each station's interval to that station's readings. Joined on
/// [`StationId`]; a station with readings but no interval fails the batch.
pub fn merge(
    readings: Vec<StationReadings>,
    intervals: Vec<StationInterval>,
) -> Result<Vec<Measurement>, BatchError> {
    let mut by_station: HashMap<StationId, SamplingInterval> = intervals
        .into_iter()
        .map(|i| (i.station, i.interval))
        .collect();

    let mut merged = Vec::new();
    for StationReadings { station, readings } in readings {
        if readings.is_empty() {
            continue;
        }
        let interval = by_station
            .remove(&station)
            .ok_or(BatchError::MissingInterval { station })?;
        merged.extend(
            readings
                .into_iter()
                .map(|reading| reading.with_interval(interval.clone())),
        );
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Parameter;
    use crate::parser::station::parse_local_time;

    fn reading(parameter: Parameter, value: f64) -> PendingMeasurement {
        PendingMeasurement {
            parameter,
            value,
            unit: "ppb".into(),
            date: parse_local_time("01/01/2020 00:00:00").unwrap(),
            coordinates: None,
        }
    }

    #[test]
    fn merge_joins_on_station_not_position() {
        let readings = vec![
            StationReadings {
                station: StationId(0),
                readings: vec![reading(Parameter::So2, 1.0), reading(Parameter::O3, 2.0)],
            },
            StationReadings {
                station: StationId(1),
                readings: vec![reading(Parameter::Pm10, 3.0)],
            },
        ];
        // deliberately out of order
        let intervals = vec![
            StationInterval {
                station: StationId(1),
                interval: SamplingInterval::Hours(1.0),
            },
            StationInterval {
                station: StationId(0),
                interval: SamplingInterval::Hours(0.5),
            },
        ];

        let merged = merge(readings, intervals).unwrap();
        let periods: Vec<_> = merged
            .iter()
            .map(|m| (m.parameter, m.averaging_period.value.clone()))
            .collect();
        assert_eq!(
            periods,
            vec![
                (Parameter::So2, SamplingInterval::Hours(0.5)),
                (Parameter::O3, SamplingInterval::Hours(0.5)),
                (Parameter::Pm10, SamplingInterval::Hours(1.0)),
            ]
        );
    }

    #[test]
    fn merge_rejects_missing_interval() {
        let readings = vec![StationReadings {
            station: StationId(2),
            readings: vec![reading(Parameter::So2, 1.0)],
        }];
        let err = merge(readings, Vec::new()).unwrap_err();
        assert!(matches!(err, BatchError::MissingInterval { station: StationId(2) }));
    }

    #[test]
    fn stations_without_readings_need_no_interval() {
        let readings = vec![StationReadings {
            station: StationId(0),
            readings: Vec::new(),
        }];
        assert!(merge(readings, Vec::new()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_respects_limit() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let tasks = (0..8).map(|i| {
            let (in_flight, peak) = (&in_flight, &peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, BatchError>(i)
            }
        });

        let results = run_batch(2, tasks).await.unwrap();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }
}
