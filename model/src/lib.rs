//! Estimates when vehicles pass a stop from sparse GPS reports.
//!
//! The pipeline for one stop: annotate every position with its distance to the stop and drop the
//! far-away ones, split each vehicle's remaining reports into separate visits wherever there's a
//! long gap in time, then pick one closest-approach time per visit.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod export;
mod geo;
mod localize;
mod nadir;
mod passage;
mod route;
mod segment;

pub use self::export::{nadirs_to_csv, passages_to_csv, visits_to_geojson};
pub use self::geo::{distances_to, haversine_distance, paired_distances, EARTH_RADIUS_METERS};
pub use self::localize::{localize, DistanceSample};
pub use self::nadir::{select_nadir, Nadir, NadirKind};
pub use self::passage::{estimate_passages, find_visits, PassageParams};
pub use self::route::{estimate_route_passages, StopPassage};
pub use self::segment::{group_by_vehicle, split_visits, Visit};
