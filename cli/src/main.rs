#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use std::path::{Path, PathBuf};

use anyhow::Result;
use structopt::StructOpt;

use feed::{
    find_stop, samples_for_direction, BundleReader, PositionSample, RouteData, RouteID, StopID,
};
use model::PassageParams;

#[derive(StructOpt)]
#[structopt(about = "Estimate when vehicles pass stops from GPS reports")]
struct Args {
    /// A directory or .zip file with either samples.csv and stops.csv, or trynstate.json and
    /// route_config.json
    #[structopt(long)]
    input: PathBuf,
    /// Which route to use, if the input covers several
    #[structopt(long)]
    route: Option<String>,
    /// Only estimate passages for this stop. By default, every stop on the route is used.
    #[structopt(long)]
    stop: Option<String>,
    /// Ignore reports from vehicles headed in a different direction than the stop
    #[structopt(long)]
    same_direction: bool,
    /// A gap longer than this between two reports starts a new visit
    #[structopt(long, default_value = "1800000")]
    gap_threshold_ms: i64,
    /// Reports at least this many meters from a stop are ignored
    #[structopt(long, default_value = "750")]
    proximity_radius: f64,
    /// Reports closer than this many meters are trusted as the passing time
    #[structopt(long, default_value = "100")]
    nadir_confidence: f64,
    /// Write CSV results here instead of STDOUT
    #[structopt(long)]
    output: Option<PathBuf>,
    /// With --stop, also write every visit as GeoJSON points here
    #[structopt(long)]
    geojson: Option<PathBuf>,
}

impl Args {
    fn params(&self) -> PassageParams {
        PassageParams {
            gap_threshold_ms: self.gap_threshold_ms,
            proximity_radius_m: self.proximity_radius,
            nadir_confidence_m: self.nadir_confidence,
        }
    }

    fn load(&self) -> Result<RouteData> {
        let route = self.route.clone().map(RouteID::new);
        if self.input.extension().map(|ext| ext == "zip").unwrap_or(false) {
            let bytes = fs_err::read(&self.input)?;
            return RouteData::from_zip_bytes(bytes, route.as_ref());
        }
        if !self.input.is_dir() {
            bail!("{} isn't a directory or .zip file", self.input.display());
        }
        RouteData::load(&mut DirReader(&self.input), route.as_ref())
    }
}

struct DirReader<'a>(&'a Path);

impl BundleReader for DirReader<'_> {
    fn read_file(&mut self, path: &str) -> Result<Option<String>> {
        let path = self.0.join(path);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs_err::read_to_string(path)?))
    }
}

fn run(args: Args) -> Result<()> {
    if args.geojson.is_some() && args.stop.is_none() {
        bail!("--geojson needs --stop");
    }
    let params = args.params();
    let data = args.load()?;

    let csv = if let Some(ref stop_id) = args.stop {
        let stop = find_stop(&data.stops, &StopID::new(stop_id.clone()))?;
        let same_direction;
        let samples: &[PositionSample] = if args.same_direction {
            same_direction = samples_for_direction(&data.samples, &stop.direction_id);
            &same_direction
        } else {
            &data.samples
        };

        if let Some(ref path) = args.geojson {
            let visits = model::find_visits(samples, stop, &params)?;
            fs_err::write(path, model::visits_to_geojson(stop, &visits)?)?;
            info!("Wrote visits to {}", path.display());
        }

        let nadirs = model::estimate_passages(samples, stop, &params)?;
        model::nadirs_to_csv(&nadirs)?
    } else {
        let passages = model::estimate_route_passages(
            &data.samples,
            &data.stops,
            &params,
            args.same_direction,
        )?;
        model::passages_to_csv(&passages)?
    };

    match args.output {
        Some(ref path) => {
            fs_err::write(path, csv)?;
            info!("Wrote results to {}", path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(Args::from_args())
}
