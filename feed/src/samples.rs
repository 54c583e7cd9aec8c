use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{DirectionID, LonLat, Timestamp, VehicleName};

/// One GPS report from one vehicle. Never modified after capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub vehicle_id: VehicleName,
    pub timestamp: Timestamp,
    pub pos: LonLat,
    pub direction_id: Option<DirectionID>,
}

/// Reads `vehicle_id,timestamp,latitude,longitude[,direction_id]` rows. Timestamps are epoch
/// milliseconds. Coordinates aren't validated here.
pub fn load_samples<R: std::io::Read>(reader: R) -> Result<Vec<PositionSample>> {
    let mut samples = Vec::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        samples.push(PositionSample {
            vehicle_id: rec.vehicle_id,
            timestamp: Timestamp(rec.timestamp),
            pos: LonLat::new(rec.longitude, rec.latitude),
            direction_id: rec.direction_id,
        });
    }
    Ok(samples)
}

/// Adjacent query windows can both return the reports at their shared boundary. Drop repeats of
/// the same (vehicle, time), keeping the first.
pub fn dedupe_samples(samples: Vec<PositionSample>) -> Vec<PositionSample> {
    let before = samples.len();
    let mut seen = BTreeSet::new();
    let mut result = Vec::with_capacity(before);
    for sample in samples {
        if seen.insert((sample.vehicle_id.clone(), sample.timestamp)) {
            result.push(sample);
        }
    }
    if result.len() != before {
        debug!("Dropped {} duplicate samples", before - result.len());
    }
    result
}

/// Only the samples reported while headed in `direction`. Samples without a direction are
/// dropped.
pub fn samples_for_direction(
    samples: &[PositionSample],
    direction: &DirectionID,
) -> Vec<PositionSample> {
    samples
        .iter()
        .filter(|s| s.direction_id.as_ref() == Some(direction))
        .cloned()
        .collect()
}

#[derive(Deserialize)]
struct Record {
    vehicle_id: VehicleName,
    timestamp: i64,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    direction_id: Option<DirectionID>,
}
