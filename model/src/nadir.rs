use anyhow::Result;
use serde::Serialize;

use feed::{Timestamp, VehicleName};

use crate::DistanceSample;

/// The estimated moment a vehicle passed a stop during one visit. Nadir is the lowest point an
/// orbiting body reaches.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Nadir {
    pub vehicle_id: VehicleName,
    pub timestamp: Timestamp,
    /// Only informational. For an ambiguous visit, this is the mean of the two tied minimums.
    pub distance: f64,
    pub kind: NadirKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NadirKind {
    /// A sample was close enough to the stop to trust outright
    Confident,
    /// Nothing was close, but exactly one time reached the minimum distance
    Unique,
    /// Nothing was close, and the minimum distance happened at more than one time
    Ambiguous,
}

/// Picks one representative closest-approach time from a visit's samples, which must be sorted
/// by time.
///
/// This is a heuristic. Reports are sparse, so the real pass often falls between two samples.
/// Any sample within `confidence` meters is taken at face value, using the earliest one if the
/// minimum repeats. Otherwise if the minimum distance shows up at two different times, the
/// earliest of those is used.
pub fn select_nadir(visit: &[DistanceSample], confidence: f64) -> Result<Nadir> {
    let forward = match argmin(visit.iter()) {
        Some(x) => x,
        None => bail!("Can't find the nadir of an empty visit"),
    };
    let nadir = |distance, kind| Nadir {
        vehicle_id: forward.vehicle_id.clone(),
        timestamp: forward.timestamp,
        distance,
        kind,
    };

    if forward.distance < confidence {
        return Ok(nadir(forward.distance, NadirKind::Confident));
    }

    // Scanning backwards finds the last sample at the minimum distance
    let backward = match argmin(visit.iter().rev()) {
        Some(x) => x,
        None => bail!("Can't find the nadir of an empty visit"),
    };
    if forward.timestamp == backward.timestamp {
        return Ok(nadir(forward.distance, NadirKind::Unique));
    }

    // TODO The time halfway between the two minimums might be a better estimate than the first
    Ok(nadir(
        (forward.distance + backward.distance) / 2.0,
        NadirKind::Ambiguous,
    ))
}

// The first sample reaching the minimum distance, in iteration order
fn argmin<'a, I: Iterator<Item = &'a DistanceSample>>(samples: I) -> Option<&'a DistanceSample> {
    let mut best: Option<&DistanceSample> = None;
    for sample in samples {
        if best.map(|b| sample.distance < b.distance).unwrap_or(true) {
            best = Some(sample);
        }
    }
    best
}
