use std::collections::BTreeMap;

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use feed::{PositionSample, StopLocation, VehicleName};

use crate::{group_by_vehicle, localize, select_nadir, split_visits, Nadir, Visit};

/// Every knob the estimator has.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassageParams {
    /// A longer gap between two reports means the vehicle left and came back
    pub gap_threshold_ms: i64,
    /// Reports at least this far from the stop are ignored
    pub proximity_radius_m: f64,
    /// Reports closer than this are trusted as the moment of passing
    pub nadir_confidence_m: f64,
}

impl Default for PassageParams {
    fn default() -> Self {
        Self {
            gap_threshold_ms: 30 * 60 * 1000,
            proximity_radius_m: 750.0,
            nadir_confidence_m: 100.0,
        }
    }
}

impl PassageParams {
    pub fn validate(&self) -> Result<()> {
        if self.gap_threshold_ms < 0 {
            bail!("Negative gap threshold {}ms", self.gap_threshold_ms);
        }
        if !self.proximity_radius_m.is_finite() || self.proximity_radius_m < 0.0 {
            bail!("Bad proximity radius {}", self.proximity_radius_m);
        }
        if !self.nadir_confidence_m.is_finite() || self.nadir_confidence_m < 0.0 {
            bail!("Bad nadir confidence distance {}", self.nadir_confidence_m);
        }
        Ok(())
    }
}

/// Each vehicle's visits to the stop. Vehicles that never came near the stop are absent.
///
/// Fails if any sample or the stop has coordinates out of range; nothing is computed then.
pub fn find_visits(
    samples: &[PositionSample],
    stop: &StopLocation,
    params: &PassageParams,
) -> Result<BTreeMap<VehicleName, Vec<Visit>>> {
    params.validate()?;
    stop.pos
        .validate()
        .map_err(|err| anyhow!("Stop {}: {err}", stop.stop_id))?;
    samples.par_iter().try_for_each(|sample| {
        sample.pos.validate().map_err(|err| {
            anyhow!(
                "Sample from {} at {}: {err}",
                sample.vehicle_id,
                sample.timestamp.millis()
            )
        })
    })?;

    let nearby = localize(stop, samples, params.proximity_radius_m);
    info!(
        "{} of {} samples are within {}m of stop {}",
        nearby.len(),
        samples.len(),
        params.proximity_radius_m,
        stop.stop_id
    );

    // Vehicles are independent, but each one has to be sorted before it's split
    let visits: BTreeMap<VehicleName, Vec<Visit>> = group_by_vehicle(nearby)
        .into_par_iter()
        .map(|(vehicle, samples)| {
            let visits = split_visits(samples, params.gap_threshold_ms);
            debug!("{} visits stop {} {} times", vehicle, stop.stop_id, visits.len());
            (vehicle, visits)
        })
        .collect();
    Ok(visits)
}

/// One estimated passing time for every visit any vehicle made to the stop, ordered by vehicle
/// and then time. Vehicles that never came near the stop contribute nothing.
pub fn estimate_passages(
    samples: &[PositionSample],
    stop: &StopLocation,
    params: &PassageParams,
) -> Result<Vec<Nadir>> {
    let visits = find_visits(samples, stop, params)?;
    let nadirs = visits
        .par_iter()
        .flat_map_iter(|(_, visits)| {
            visits
                .iter()
                .map(|visit| select_nadir(visit.samples(), params.nadir_confidence_m))
        })
        .collect::<Result<Vec<Nadir>>>()?;
    info!(
        "{} vehicles passed stop {} {} times",
        visits.len(),
        stop.stop_id,
        nadirs.len()
    );
    Ok(nadirs)
}
