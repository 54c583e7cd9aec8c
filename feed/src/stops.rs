use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{DirectionID, LonLat, StopID};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopLocation {
    pub stop_id: StopID,
    pub name: String,
    pub pos: LonLat,
    pub direction_id: DirectionID,
    /// Position of the stop along the route
    pub ordinal: usize,
}

/// Reads `stop_id,name,latitude,longitude,direction_id,ordinal` rows.
pub fn load_stops<R: std::io::Read>(reader: R) -> Result<Vec<StopLocation>> {
    let mut seen = BTreeSet::new();
    let mut stops = Vec::new();
    for rec in csv::Reader::from_reader(reader).deserialize() {
        let rec: Record = rec?;
        if !seen.insert(rec.stop_id.clone()) {
            bail!("Duplicate {:?}", rec.stop_id);
        }
        stops.push(StopLocation {
            stop_id: rec.stop_id,
            name: rec.name.unwrap_or_default(),
            pos: LonLat::new(rec.longitude, rec.latitude),
            direction_id: rec.direction_id,
            ordinal: rec.ordinal,
        });
    }
    Ok(stops)
}

pub fn find_stop<'a>(stops: &'a [StopLocation], id: &StopID) -> Result<&'a StopLocation> {
    match stops.iter().find(|s| &s.stop_id == id) {
        Some(stop) => Ok(stop),
        None => bail!("Unknown stop {}", id),
    }
}

#[derive(Deserialize)]
struct Record {
    stop_id: StopID,
    name: Option<String>,
    latitude: f64,
    longitude: f64,
    direction_id: DirectionID,
    ordinal: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_stops() {
        let input = "stop_id,name,latitude,longitude,direction_id,ordinal
3476,Church St & Duboce Ave,37.7695,-122.4292,I,0
3477,,37.7712,-122.4296,O,1
";
        let stops = load_stops(input.as_bytes()).unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].name, "Church St & Duboce Ave");
        assert_eq!(stops[1].name, "");
        assert_eq!(stops[1].ordinal, 1);
        assert_eq!(stops[1].direction_id, DirectionID::new("O"));

        let found = find_stop(&stops, &StopID::new("3477")).unwrap();
        assert_eq!(found.pos, LonLat::new(-122.4296, 37.7712));
        assert!(find_stop(&stops, &StopID::new("9999")).is_err());
    }

    #[test]
    fn test_duplicate_stop() {
        let input = "stop_id,name,latitude,longitude,direction_id,ordinal
3476,A,37.7695,-122.4292,I,0
3476,B,37.7712,-122.4296,I,1
";
        assert!(load_stops(input.as_bytes()).is_err());
    }
}
