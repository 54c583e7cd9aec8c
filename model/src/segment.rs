use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use feed::{Timestamp, VehicleName};

use crate::DistanceSample;

/// One approach to a stop and departure from it. The samples all belong to one vehicle, are
/// sorted by time, and there's always at least one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Visit {
    samples: Vec<DistanceSample>,
}

impl Visit {
    pub fn new(samples: Vec<DistanceSample>) -> Result<Self> {
        if samples.is_empty() {
            bail!("A visit needs at least one sample");
        }
        for pair in samples.windows(2) {
            if pair[0].vehicle_id != pair[1].vehicle_id {
                bail!(
                    "A visit mixes samples from {} and {}",
                    pair[0].vehicle_id,
                    pair[1].vehicle_id
                );
            }
            if pair[0].timestamp > pair[1].timestamp {
                bail!(
                    "Visit input out-of-order: {} then {}",
                    pair[0].timestamp.millis(),
                    pair[1].timestamp.millis()
                );
            }
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[DistanceSample] {
        &self.samples
    }

    pub fn vehicle_id(&self) -> &VehicleName {
        &self.samples[0].vehicle_id
    }

    pub fn start_time(&self) -> Timestamp {
        self.samples[0].timestamp
    }

    pub fn end_time(&self) -> Timestamp {
        self.samples[self.samples.len() - 1].timestamp
    }
}

/// Partition samples by vehicle. Each vehicle's samples keep their input order.
pub fn group_by_vehicle(
    samples: Vec<DistanceSample>,
) -> BTreeMap<VehicleName, Vec<DistanceSample>> {
    let mut per_vehicle: BTreeMap<VehicleName, Vec<DistanceSample>> = BTreeMap::new();
    for sample in samples {
        per_vehicle
            .entry(sample.vehicle_id.clone())
            .or_insert_with(Vec::new)
            .push(sample);
    }
    per_vehicle
}

/// Splits one vehicle's samples into visits. Vehicles loop around their route and come back to
/// the same stop later; a gap of more than `gap_threshold_ms` between consecutive samples means
/// a new visit. Samples exactly `gap_threshold_ms` apart stay together.
///
/// All of the input must be from the same vehicle. It doesn't need to be sorted.
pub fn split_visits(mut samples: Vec<DistanceSample>, gap_threshold_ms: i64) -> Vec<Visit> {
    // Stable, so ties keep their input order. Ties never split a visit anyway.
    samples.sort_by_key(|s| s.timestamp);

    let mut visits = Vec::new();
    let mut current: Vec<DistanceSample> = Vec::new();
    for sample in samples {
        if let Some(last) = current.last() {
            if sample.timestamp.millis_since(last.timestamp) > gap_threshold_ms {
                visits.push(Visit {
                    samples: std::mem::take(&mut current),
                });
            }
        }
        current.push(sample);
    }
    if !current.is_empty() {
        visits.push(Visit { samples: current });
    }
    visits
}

#[cfg(test)]
mod tests {
    use feed::LonLat;

    use super::*;

    fn sample(vehicle: &str, time: i64, distance: f64) -> DistanceSample {
        DistanceSample {
            vehicle_id: VehicleName::new(vehicle),
            timestamp: Timestamp(time),
            pos: LonLat::new(0.0, 0.0),
            distance,
        }
    }

    fn times(visit: &Visit) -> Vec<i64> {
        visit.samples().iter().map(|s| s.timestamp.millis()).collect()
    }

    const GAP: i64 = 1_800_000;

    #[test]
    fn test_empty_and_single() {
        assert!(split_visits(Vec::new(), GAP).is_empty());

        let visits = split_visits(vec![sample("a", 42, 10.0)], GAP);
        assert_eq!(visits.len(), 1);
        assert_eq!(times(&visits[0]), vec![42]);
        assert_eq!(visits[0].start_time(), visits[0].end_time());
    }

    #[test]
    fn test_threshold_boundary() {
        let visits = split_visits(vec![sample("a", 0, 1.0), sample("a", GAP, 2.0)], GAP);
        assert_eq!(visits.len(), 1);

        let visits = split_visits(vec![sample("a", 0, 1.0), sample("a", GAP + 1, 2.0)], GAP);
        assert_eq!(visits.len(), 2);
        assert_eq!(times(&visits[0]), vec![0]);
        assert_eq!(times(&visits[1]), vec![GAP + 1]);
    }

    #[test]
    fn test_sorts_then_splits() {
        let input = vec![
            sample("a", 5_000_000, 1.0),
            sample("a", 60_000, 2.0),
            sample("a", 4_000_000, 3.0),
            sample("a", 0, 4.0),
            sample("a", 10_000_000, 5.0),
            sample("a", 120_000, 6.0),
        ];
        let mut expected: Vec<i64> = input.iter().map(|s| s.timestamp.millis()).collect();
        expected.sort();

        let visits = split_visits(input, GAP);
        assert_eq!(visits.len(), 3);
        assert_eq!(times(&visits[0]), vec![0, 60_000, 120_000]);
        assert_eq!(times(&visits[1]), vec![4_000_000, 5_000_000]);
        assert_eq!(times(&visits[2]), vec![10_000_000]);

        // Nothing dropped or duplicated
        let concatenated: Vec<i64> = visits.iter().flat_map(times).collect();
        assert_eq!(concatenated, expected);

        // Consecutive visits really are separated by more than the gap
        for pair in visits.windows(2) {
            assert!(pair[1].start_time().millis_since(pair[0].end_time()) > GAP);
        }
    }

    #[test]
    fn test_equal_times() {
        let visits = split_visits(
            vec![sample("a", 100, 1.0), sample("a", 100, 2.0), sample("a", 100, 3.0)],
            GAP,
        );
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].samples().len(), 3);
        // Stable sort
        assert_eq!(visits[0].samples()[1].distance, 2.0);
    }

    #[test]
    fn test_new_visit() {
        assert!(Visit::new(Vec::new()).is_err());
        assert!(Visit::new(vec![sample("a", 0, 1.0), sample("b", 10, 1.0)]).is_err());
        assert!(Visit::new(vec![sample("a", 10, 1.0), sample("a", 0, 1.0)]).is_err());

        let visit = Visit::new(vec![
            sample("a", 0, 1.0),
            sample("a", 0, 2.0),
            sample("a", 10, 3.0),
        ])
        .unwrap();
        assert_eq!(visit.vehicle_id(), &VehicleName::new("a"));
        assert_eq!(visit.start_time(), Timestamp(0));
        assert_eq!(visit.end_time(), Timestamp(10));
        assert_eq!(visit.samples().len(), 3);
    }

    #[test]
    fn test_group_by_vehicle() {
        let groups = group_by_vehicle(vec![
            sample("b", 3, 1.0),
            sample("a", 2, 1.0),
            sample("b", 1, 1.0),
        ]);
        assert_eq!(groups.len(), 2);
        let b: Vec<i64> = groups[&VehicleName::new("b")]
            .iter()
            .map(|s| s.timestamp.millis())
            .collect();
        assert_eq!(b, vec![3, 1]);
        assert_eq!(groups[&VehicleName::new("a")].len(), 1);
    }
}
