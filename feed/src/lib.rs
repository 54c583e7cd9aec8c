//! Value types for vehicle positions and stops, plus the adapters that shape raw inputs (CSV
//! exports, recorded trynState responses, NextBus route configs) into them.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod bundle;
mod ids;
mod lonlat;
mod samples;
mod stops;
mod time;
mod topology;
mod trynstate;

pub use bundle::{BundleReader, RouteData};
pub use ids::{DirectionID, RouteID, StopID, VehicleName};
pub use lonlat::LonLat;
pub use samples::{dedupe_samples, load_samples, samples_for_direction, PositionSample};
pub use stops::{find_stop, load_stops, StopLocation};
pub use time::Timestamp;
pub use topology::{assign_topology, RouteConfig};
pub use trynstate::{
    build_query, collect_routes, parse_response, plan_windows, QueryWindow, RawRoute,
    RawRouteState, RawStop, RawVehicle, RecordedSource, StateSource,
};
