use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;

use feed::{
    samples_for_direction, DirectionID, PositionSample, StopID, StopLocation, Timestamp,
    VehicleName,
};

use crate::{estimate_passages, NadirKind, PassageParams};

/// A vehicle passing one particular stop on the route
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StopPassage {
    pub stop_id: StopID,
    pub direction_id: DirectionID,
    pub ordinal: usize,
    pub vehicle_id: VehicleName,
    pub timestamp: Timestamp,
    pub distance: f64,
    pub kind: NadirKind,
}

/// Estimates passing times at every stop along a route. The result is ordered by position along
/// the route, then direction, then time.
///
/// With `match_direction`, each stop only sees samples reported in its own direction, so a
/// vehicle heading the other way doesn't pass stops across the street.
pub fn estimate_route_passages(
    samples: &[PositionSample],
    stops: &[StopLocation],
    params: &PassageParams,
    match_direction: bool,
) -> Result<Vec<StopPassage>> {
    let per_stop = stops
        .par_iter()
        .map(|stop| -> Result<Vec<StopPassage>> {
            let nadirs = if match_direction {
                estimate_passages(
                    &samples_for_direction(samples, &stop.direction_id),
                    stop,
                    params,
                )?
            } else {
                estimate_passages(samples, stop, params)?
            };
            Ok(nadirs
                .into_iter()
                .map(|nadir| StopPassage {
                    stop_id: stop.stop_id.clone(),
                    direction_id: stop.direction_id.clone(),
                    ordinal: stop.ordinal,
                    vehicle_id: nadir.vehicle_id,
                    timestamp: nadir.timestamp,
                    distance: nadir.distance,
                    kind: nadir.kind,
                })
                .collect())
        })
        .collect::<Result<Vec<Vec<StopPassage>>>>()?;

    let mut passages: Vec<StopPassage> = per_stop.into_iter().flatten().collect();
    passages.sort_by(|a, b| {
        (a.ordinal, &a.direction_id, a.timestamp, &a.vehicle_id, &a.stop_id).cmp(&(
            b.ordinal,
            &b.direction_id,
            b.timestamp,
            &b.vehicle_id,
            &b.stop_id,
        ))
    });
    info!("{} passages across {} stops", passages.len(), stops.len());
    Ok(passages)
}

#[cfg(test)]
mod tests {
    use feed::LonLat;

    use super::*;
    use crate::EARTH_RADIUS_METERS;

    fn stop(id: &str, direction: &str, ordinal: usize, lat: f64) -> StopLocation {
        StopLocation {
            stop_id: StopID::new(id),
            name: String::new(),
            pos: LonLat::new(-122.4292, lat),
            direction_id: DirectionID::new(direction),
            ordinal,
        }
    }

    fn sample(vehicle: &str, lat: f64, time: i64) -> PositionSample {
        PositionSample {
            vehicle_id: VehicleName::new(vehicle),
            timestamp: Timestamp(time),
            pos: LonLat::new(-122.4292, lat),
            direction_id: None,
        }
    }

    fn heading(direction: &str, mut sample: PositionSample) -> PositionSample {
        sample.direction_id = Some(DirectionID::new(direction));
        sample
    }

    #[test]
    fn test_route_passages() {
        // Stops about 2km apart
        let step = (2_000.0 / EARTH_RADIUS_METERS).to_degrees();
        let stops = vec![
            stop("B", "O", 1, 37.0 + step),
            stop("A", "O", 0, 37.0),
            stop("Z", "I", 0, 37.0 + 10.0 * step),
        ];
        // One vehicle drives north past A then B
        let samples = vec![
            sample("1492", 37.0, 0),
            sample("1492", 37.0 + step, 240_000),
            sample("1493", 37.0 + step, 100_000),
        ];
        let passages =
            estimate_route_passages(&samples, &stops, &PassageParams::default(), false).unwrap();
        let summary: Vec<(&str, usize, &str, i64)> = passages
            .iter()
            .map(|p| {
                (
                    p.stop_id.as_str(),
                    p.ordinal,
                    p.vehicle_id.as_str(),
                    p.timestamp.millis(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("A", 0, "1492", 0),
                ("B", 1, "1493", 100_000),
                ("B", 1, "1492", 240_000),
            ]
        );
        assert!(passages.iter().all(|p| p.kind == NadirKind::Confident));
    }

    #[test]
    fn test_bad_stop_fails_everything() {
        let stops = vec![stop("A", "O", 0, 37.0), stop("B", "O", 1, 100.0)];
        let samples = vec![sample("1492", 37.0, 0)];
        assert!(
            estimate_route_passages(&samples, &stops, &PassageParams::default(), false).is_err()
        );
    }

    #[test]
    fn test_match_direction() {
        // Outbound and inbound stops on opposite sides of the same street
        let stops = vec![stop("Out", "O", 0, 37.0), stop("In", "I", 3, 37.0)];
        let samples = vec![
            heading("O", sample("1492", 37.0, 0)),
            heading("I", sample("1493", 37.0, 60_000)),
            sample("1494", 37.0, 120_000),
        ];
        let params = PassageParams::default();

        let everything = estimate_route_passages(&samples, &stops, &params, false).unwrap();
        assert_eq!(everything.len(), 6);

        let matched = estimate_route_passages(&samples, &stops, &params, true).unwrap();
        let summary: Vec<(&str, &str)> = matched
            .iter()
            .map(|p| (p.stop_id.as_str(), p.vehicle_id.as_str()))
            .collect();
        assert_eq!(summary, vec![("Out", "1492"), ("In", "1493")]);
    }
}
