//! The trynState GraphQL service hands back vehicle positions for a handful of routes over a
//! time window. We never talk to it directly; `StateSource` is the seam for whatever does.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::Result;
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{DirectionID, LonLat, PositionSample, RouteID, StopID, Timestamp, VehicleName};

const HOUR_MS: i64 = 3_600_000;
// Windows are planned in PST, regardless of daylight savings
const PST_OFFSET_SECONDS: i32 = -8 * 3600;

/// A half-open `[start, end)` window of epoch milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Consecutive windows covering `hours` hours from `start` (a PST wall-clock time), each
/// `1 / per_hour` of an hour long.
///
/// Windows near midnight may return data from the neighboring day; that's for the caller to
/// filter out.
pub fn plan_windows(
    start: NaiveDateTime,
    hours: usize,
    per_hour: usize,
) -> Result<Vec<QueryWindow>> {
    if per_hour == 0 {
        bail!("Need at least one query per hour");
    }
    let offset = FixedOffset::east_opt(PST_OFFSET_SECONDS)
        .ok_or_else(|| anyhow!("Bad PST offset"))?;
    let start = match offset.from_local_datetime(&start).single() {
        Some(dt) => dt.timestamp_millis(),
        None => bail!("Can't place {} in PST", start),
    };
    let count = hours
        .checked_mul(per_hour)
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| anyhow!("Too many windows: {} hours at {} per hour", hours, per_hour))?;
    let per_hour = per_hour as i64;
    // Checking the final bound also covers every intermediate one
    count
        .checked_mul(HOUR_MS)
        .and_then(|span| span.checked_add(start))
        .ok_or_else(|| anyhow!("{} hours from {} overflows", hours, start))?;

    // Every hour boundary is exact, even when per_hour doesn't divide an hour
    let bound = |i: i64| Timestamp(start + i * HOUR_MS / per_hour);
    Ok((0..count)
        .map(|i| QueryWindow {
            start: bound(i),
            end: bound(i + 1),
        })
        .collect())
}

/// The GraphQL query text for one window
pub fn build_query(agency: &str, window: &QueryWindow, routes: &[RouteID]) -> String {
    let route_list = format!(
        "[{}]",
        routes
            .iter()
            .map(|r| format!("\"{}\"", r))
            .collect::<Vec<_>>()
            .join(",")
    );
    format!(
        r#"{{
  trynState(agency: "{agency}", startTime: "{}", endTime: "{}", routes: {route_list}) {{
    agency
    startTime
    routes {{
      rid
      stops {{
        sid
        name
        lat
        lon
      }}
      routeStates {{
        vtime
        vehicles {{
          vid
          lat
          lon
          did
        }}
      }}
    }}
  }}
}}"#,
        window.start.millis(),
        window.end.millis(),
    )
}

pub trait StateSource {
    fn fetch(&self, window: &QueryWindow, routes: &[RouteID]) -> Result<Vec<RawRoute>>;
}

/// Fetch every window and merge the pages per route. Windows that fail are logged and skipped.
///
/// The stops from the first page seen for a route win. Route states are appended page by page,
/// with each page sorted by time.
pub fn collect_routes(
    source: &dyn StateSource,
    windows: &[QueryWindow],
    routes: &[RouteID],
) -> Vec<RawRoute> {
    let mut merged: BTreeMap<RouteID, RawRoute> = BTreeMap::new();
    for window in windows {
        let pages = match source.fetch(window, routes) {
            Ok(pages) => pages,
            Err(err) => {
                warn!(
                    "Error for time range {}-{}: {}",
                    window.start.millis(),
                    window.end.millis(),
                    err
                );
                continue;
            }
        };
        for mut page in pages {
            page.route_states.sort_by_key(|rs| rs.vtime);
            match merged.get_mut(&page.rid) {
                Some(route) => route.route_states.extend(page.route_states),
                None => {
                    merged.insert(page.rid.clone(), page);
                }
            }
        }
    }
    merged.into_values().collect()
}

/// Parses one GraphQL response body. Responses without `data` are errors.
pub fn parse_response(body: &str) -> Result<Vec<RawRoute>> {
    let response: Response = serde_json::from_str(body)?;
    Ok(response.into_state()?.routes)
}

impl Response {
    fn into_state(self) -> Result<TrynState> {
        match self.data {
            Some(data) => Ok(data.tryn_state),
            None => {
                let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
                bail!("No data in response: {}", messages.join("; "))
            }
        }
    }
}

/// Responses captured earlier, looked up by the start time of the window that produced them.
pub struct RecordedSource {
    pages: BTreeMap<Timestamp, Vec<RawRoute>>,
}

impl RecordedSource {
    /// Expects a JSON array of GraphQL responses. Error responses don't say which window they
    /// were for, so they're logged and skipped, leaving a gap like a failed live fetch.
    pub fn from_json(body: &str) -> Result<Self> {
        let responses: Vec<Response> = serde_json::from_str(body)?;
        let mut pages = BTreeMap::new();
        for (idx, response) in responses.into_iter().enumerate() {
            let state = match response.into_state() {
                Ok(state) => state,
                Err(err) => {
                    warn!("Skipping recorded response {}: {}", idx, err);
                    continue;
                }
            };
            if pages.insert(state.start_time, state.routes).is_some() {
                bail!("Multiple responses start at {}", state.start_time.millis());
            }
        }
        Ok(Self { pages })
    }

    /// One window per recorded response, ending where the next begins. The last window is
    /// assumed to be as long as the one before it, or an hour if there's only one.
    pub fn windows(&self) -> Vec<QueryWindow> {
        let starts: Vec<Timestamp> = self.pages.keys().cloned().collect();
        let mut windows = Vec::new();
        for pair in starts.windows(2) {
            windows.push(QueryWindow {
                start: pair[0],
                end: pair[1],
            });
        }
        if let Some(last) = starts.last() {
            let len = windows
                .last()
                .map(|w| w.end.millis_since(w.start))
                .unwrap_or(HOUR_MS);
            windows.push(QueryWindow {
                start: *last,
                end: Timestamp(last.millis() + len),
            });
        }
        windows
    }
}

impl StateSource for RecordedSource {
    fn fetch(&self, window: &QueryWindow, routes: &[RouteID]) -> Result<Vec<RawRoute>> {
        match self.pages.get(&window.start) {
            Some(pages) => Ok(pages
                .iter()
                .filter(|r| routes.is_empty() || routes.contains(&r.rid))
                .cloned()
                .collect()),
            None => bail!("Nothing recorded starting at {}", window.start.millis()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawRoute {
    pub rid: RouteID,
    #[serde(default)]
    pub stops: Vec<RawStop>,
    #[serde(rename = "routeStates", default)]
    pub route_states: Vec<RawRouteState>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawStop {
    pub sid: StopID,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lon: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawRouteState {
    #[serde(deserialize_with = "number_or_string")]
    pub vtime: i64,
    #[serde(default)]
    pub vehicles: Vec<RawVehicle>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawVehicle {
    pub vid: VehicleName,
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lon: f64,
    #[serde(default)]
    pub did: Option<DirectionID>,
}

impl RawRoute {
    /// One sample per vehicle per route state
    pub fn samples(&self) -> Vec<PositionSample> {
        let mut samples = Vec::new();
        for state in &self.route_states {
            for vehicle in &state.vehicles {
                samples.push(PositionSample {
                    vehicle_id: vehicle.vid.clone(),
                    timestamp: Timestamp(state.vtime),
                    pos: LonLat::new(vehicle.lon, vehicle.lat),
                    direction_id: vehicle.did.clone(),
                });
            }
        }
        samples
    }
}

impl RawStop {
    pub fn pos(&self) -> LonLat {
        LonLat::new(self.lon, self.lat)
    }
}

#[derive(Deserialize)]
struct Response {
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Deserialize)]
struct Data {
    #[serde(rename = "trynState")]
    tryn_state: TrynState,
}

#[derive(Deserialize)]
struct TrynState {
    #[serde(rename = "startTime", deserialize_with = "parse_timestamp")]
    start_time: Timestamp,
    #[serde(default)]
    routes: Vec<RawRoute>,
}

#[derive(Deserialize)]
struct ResponseError {
    message: String,
}

// The service is inconsistent about quoting numbers
fn number_or_string<'de, D: Deserializer<'de>, T>(d: D) -> Result<T, D::Error>
where
    T: FromStr + Deserialize<'de>,
    T::Err: std::fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    match Raw::<T>::deserialize(d)? {
        Raw::Number(x) => Ok(x),
        Raw::Text(s) => s
            .trim()
            .parse::<T>()
            .map_err(|err| serde::de::Error::custom(format!("Bad number {s}: {err}"))),
    }
}

fn parse_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
    number_or_string(d).map(Timestamp)
}
