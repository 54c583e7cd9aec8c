use std::collections::BTreeMap;

use anyhow::Result;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde::Serialize;

use feed::{DirectionID, LonLat, StopID, StopLocation, VehicleName};

use crate::{Nadir, NadirKind, StopPassage, Visit};

pub fn nadirs_to_csv(nadirs: &[Nadir]) -> Result<String> {
    let mut out = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        for nadir in nadirs {
            writer.serialize(NadirRow {
                vehicle_id: &nadir.vehicle_id,
                timestamp: nadir.timestamp.millis(),
                time: nadir.timestamp.to_rfc3339(),
                distance: nadir.distance,
                kind: nadir.kind,
            })?;
        }
        writer.flush()?;
    }
    let out = String::from_utf8(out)?;
    Ok(out)
}

pub fn passages_to_csv(passages: &[StopPassage]) -> Result<String> {
    let mut out = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        for passage in passages {
            writer.serialize(PassageRow {
                stop_id: &passage.stop_id,
                direction_id: &passage.direction_id,
                ordinal: passage.ordinal,
                vehicle_id: &passage.vehicle_id,
                timestamp: passage.timestamp.millis(),
                time: passage.timestamp.to_rfc3339(),
                distance: passage.distance,
                kind: passage.kind,
            })?;
        }
        writer.flush()?;
    }
    let out = String::from_utf8(out)?;
    Ok(out)
}

/// The stop and every sample of every visit as points, for eyeballing in a map viewer.
pub fn visits_to_geojson(
    stop: &StopLocation,
    visits: &BTreeMap<VehicleName, Vec<Visit>>,
) -> Result<String> {
    let mut features = Vec::new();

    let mut props = JsonObject::new();
    props.insert("stop_id".to_string(), stop.stop_id.as_str().into());
    props.insert("name".to_string(), stop.name.clone().into());
    props.insert("direction_id".to_string(), stop.direction_id.as_str().into());
    props.insert("ordinal".to_string(), stop.ordinal.into());
    features.push(point(stop.pos, props));

    for (vehicle, list) in visits {
        for (idx, visit) in list.iter().enumerate() {
            for sample in visit.samples() {
                let mut props = JsonObject::new();
                props.insert("vehicle_id".to_string(), vehicle.as_str().into());
                props.insert("visit".to_string(), idx.into());
                props.insert("timestamp".to_string(), sample.timestamp.millis().into());
                props.insert("time".to_string(), sample.timestamp.to_rfc3339().into());
                props.insert("distance".to_string(), sample.distance.into());
                features.push(point(sample.pos, props));
            }
        }
    }

    let gj = GeoJson::FeatureCollection(FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    });
    Ok(serde_json::to_string(&gj)?)
}

fn point(pos: LonLat, props: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![pos.x(), pos.y()]))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

#[derive(Serialize)]
struct NadirRow<'a> {
    vehicle_id: &'a VehicleName,
    timestamp: i64,
    time: String,
    distance: f64,
    kind: NadirKind,
}

#[derive(Serialize)]
struct PassageRow<'a> {
    stop_id: &'a StopID,
    direction_id: &'a DirectionID,
    ordinal: usize,
    vehicle_id: &'a VehicleName,
    timestamp: i64,
    time: String,
    distance: f64,
    kind: NadirKind,
}
