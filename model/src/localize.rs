use serde::Serialize;

use feed::{LonLat, PositionSample, StopLocation, Timestamp, VehicleName};

use crate::haversine_distance;

/// A position report annotated with how far it is from one particular stop.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistanceSample {
    pub vehicle_id: VehicleName,
    pub timestamp: Timestamp,
    pub pos: LonLat,
    /// Meters to the stop
    pub distance: f64,
}

/// Keeps only the samples strictly closer than `radius` meters to the stop, in their original
/// order.
///
/// Most reports are from elsewhere on the route. Dropping them early also stops a far part of
/// the route that happens to look close as the crow flies from confusing anything downstream.
pub fn localize(
    stop: &StopLocation,
    samples: &[PositionSample],
    radius: f64,
) -> Vec<DistanceSample> {
    samples
        .iter()
        .filter_map(|sample| {
            let distance = haversine_distance(stop.pos, sample.pos);
            if distance < radius {
                Some(DistanceSample {
                    vehicle_id: sample.vehicle_id.clone(),
                    timestamp: sample.timestamp,
                    pos: sample.pos,
                    distance,
                })
            } else {
                None
            }
        })
        .collect()
}
