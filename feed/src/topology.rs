use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Deserializer};

use crate::{DirectionID, RawStop, StopID, StopLocation};

/// The parts of a NextBus `routeConfig` document needed to place stops along a route.
pub struct RouteConfig {
    pub tag: String,
    // Stop tag to direction tag. If a stop is served in both directions, the last one listed wins.
    directions: BTreeMap<StopID, DirectionID>,
    // Stop tag to its index in the route's stop list
    ordinals: BTreeMap<StopID, usize>,
    titles: BTreeMap<StopID, String>,
}

impl RouteConfig {
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(body)?;
        let route = raw.route;

        let mut ordinals = BTreeMap::new();
        let mut titles = BTreeMap::new();
        for (idx, stop) in route.stop.into_iter().enumerate() {
            if let Some(title) = stop.title {
                titles.insert(stop.tag.clone(), title);
            }
            ordinals.insert(stop.tag, idx);
        }

        let mut directions = BTreeMap::new();
        for direction in route.direction {
            for stop in direction.stop {
                directions.insert(stop.tag, direction.tag.clone());
            }
        }

        Ok(Self {
            tag: route.tag,
            directions,
            ordinals,
            titles,
        })
    }

    pub fn direction_of(&self, stop: &StopID) -> Option<&DirectionID> {
        self.directions.get(stop)
    }

    pub fn ordinal_of(&self, stop: &StopID) -> Option<usize> {
        self.ordinals.get(stop).cloned()
    }
}

/// Attach direction and ordinal to each stop. Stops no direction serves are dropped.
pub fn assign_topology(
    raw_stops: &[RawStop],
    config: &RouteConfig,
) -> Result<Vec<StopLocation>> {
    let mut stops = Vec::new();
    let mut dropped = 0;
    for raw in raw_stops {
        let direction_id = match config.direction_of(&raw.sid) {
            Some(d) => d.clone(),
            None => {
                dropped += 1;
                continue;
            }
        };
        let ordinal = match config.ordinal_of(&raw.sid) {
            Some(x) => x,
            None => bail!(
                "{:?} is served by {} but isn't in the stop list for route {}",
                raw.sid,
                direction_id,
                config.tag
            ),
        };
        let name = raw
            .name
            .clone()
            .or_else(|| config.titles.get(&raw.sid).cloned())
            .unwrap_or_default();
        stops.push(StopLocation {
            stop_id: raw.sid.clone(),
            name,
            pos: raw.pos(),
            direction_id,
            ordinal,
        });
    }
    if dropped > 0 {
        warn!(
            "{} stops on route {} don't have a direction; skipping them",
            dropped, config.tag
        );
    }
    Ok(stops)
}

#[derive(Deserialize)]
struct RawConfig {
    route: RawConfigRoute,
}

#[derive(Deserialize)]
struct RawConfigRoute {
    tag: String,
    #[serde(default, deserialize_with = "one_or_many")]
    stop: Vec<RawConfigStop>,
    #[serde(default, deserialize_with = "one_or_many")]
    direction: Vec<RawConfigDirection>,
}

#[derive(Deserialize)]
struct RawConfigStop {
    tag: StopID,
    title: Option<String>,
}

#[derive(Deserialize)]
struct RawConfigDirection {
    tag: DirectionID,
    #[serde(default, deserialize_with = "one_or_many")]
    stop: Vec<RawConfigStop>,
}

// NextBus collapses single-element lists into a bare object
fn one_or_many<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Raw::<T>::deserialize(d)? {
        Raw::Many(list) => list,
        Raw::One(x) => vec![x],
    })
}
