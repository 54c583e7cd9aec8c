use std::io::{Cursor, Read, Seek};

use anyhow::Result;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::{
    assign_topology, collect_routes, dedupe_samples, load_samples, load_stops, PositionSample,
    RecordedSource, RouteConfig, RouteID, StopLocation,
};

/// Somewhere input files live, like a directory or a zip archive.
pub trait BundleReader {
    /// None if the file doesn't exist
    fn read_file(&mut self, path: &str) -> Result<Option<String>>;
}

impl<R: Read + Seek> BundleReader for ZipArchive<R> {
    fn read_file(&mut self, path: &str) -> Result<Option<String>> {
        let mut file = match self.by_name(path) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => bail!("{path}: {err}"),
        };
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|err| anyhow!("{path}: {err}"))?;
        Ok(Some(contents))
    }
}

/// Everything observed on one route: vehicle positions and the stops they serve.
pub struct RouteData {
    pub route: Option<RouteID>,
    pub samples: Vec<PositionSample>,
    pub stops: Vec<StopLocation>,
}

impl RouteData {
    /// Bundles hold either `samples.csv` and `stops.csv`, or recorded trynState responses in
    /// `trynstate.json` along with a NextBus `route_config.json`. Recorded responses may cover
    /// several routes; `route` picks one, and is only optional when there's exactly one.
    pub fn load(reader: &mut dyn BundleReader, route: Option<&RouteID>) -> Result<Self> {
        if let Some(samples) = reader.read_file("samples.csv")? {
            let stops = require(reader, "stops.csv")?;
            return Self::from_csv(&samples, &stops, route);
        }
        if let Some(pages) = reader.read_file("trynstate.json")? {
            let config = require(reader, "route_config.json")?;
            return Self::from_trynstate(&pages, &config, route);
        }
        bail!("Bundle has neither samples.csv nor trynstate.json")
    }

    pub fn from_zip_bytes(bytes: Vec<u8>, route: Option<&RouteID>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        Self::load(&mut archive, route)
    }

    fn from_csv(samples: &str, stops: &str, route: Option<&RouteID>) -> Result<Self> {
        let samples =
            load_samples(samples.as_bytes()).map_err(|err| anyhow!("samples.csv: {err}"))?;
        let stops = load_stops(stops.as_bytes()).map_err(|err| anyhow!("stops.csv: {err}"))?;
        info!("Loaded {} samples and {} stops", samples.len(), stops.len());
        Ok(Self {
            route: route.cloned(),
            samples: dedupe_samples(samples),
            stops,
        })
    }

    fn from_trynstate(pages: &str, config: &str, route: Option<&RouteID>) -> Result<Self> {
        let source =
            RecordedSource::from_json(pages).map_err(|err| anyhow!("trynstate.json: {err}"))?;
        let config =
            RouteConfig::from_json(config).map_err(|err| anyhow!("route_config.json: {err}"))?;

        let filter: Vec<RouteID> = route.into_iter().cloned().collect();
        let mut routes = collect_routes(&source, &source.windows(), &filter);
        if routes.len() > 1 {
            bail!(
                "trynstate.json covers routes {:?}; pick one",
                routes.iter().map(|r| r.rid.as_str()).collect::<Vec<_>>()
            );
        }
        let raw = match (routes.pop(), route) {
            (Some(raw), _) => raw,
            (None, Some(r)) => bail!("trynstate.json has nothing for route {}", r),
            (None, None) => bail!("trynstate.json has no routes"),
        };
        if raw.rid.as_str() != config.tag {
            warn!(
                "Route config is for {}, but positions are for route {}",
                config.tag, raw.rid
            );
        }

        let samples = dedupe_samples(raw.samples());
        let stops = assign_topology(&raw.stops, &config)?;
        info!(
            "Loaded {} samples and {} stops for route {}",
            samples.len(),
            stops.len(),
            raw.rid
        );
        Ok(Self {
            route: Some(raw.rid),
            samples,
            stops,
        })
    }
}

fn require(reader: &mut dyn BundleReader, path: &str) -> Result<String> {
    match reader.read_file(path)? {
        Some(contents) => Ok(contents),
        None => bail!("Bundle is missing {path}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Write;

    use super::*;
    use crate::{StopID, Timestamp};

    impl BundleReader for BTreeMap<String, String> {
        fn read_file(&mut self, path: &str) -> Result<Option<String>> {
            Ok(self.get(path).cloned())
        }
    }

    const SAMPLES: &str = "vehicle_id,timestamp,latitude,longitude,direction_id
1492,60000,37.7749,-122.4194,I
1492,60000,37.7749,-122.4194,I
1492,120000,37.7750,-122.4195,I
";
    const STOPS: &str = "stop_id,name,latitude,longitude,direction_id,ordinal
3476,Church St,37.7695,-122.4292,I,0
";

    fn response(start: i64, rid: &str) -> String {
        format!(
            r#"{{"data": {{"trynState": {{"startTime": {start}, "routes": [{{"rid": "{rid}", "stops": [{{"sid": "5240", "lat": 37.776, "lon": -122.394}}, {{"sid": "0000", "lat": 37.0, "lon": -122.0}}], "routeStates": [{{"vtime": {}, "vehicles": [{{"vid": "1492", "lat": 37.776, "lon": -122.394, "did": "N____O_F00"}}]}}]}}]}}}}}}"#,
            start + 1
        )
    }

    const CONFIG: &str = r#"{"route": {"tag": "N", "stop": [{"tag": "5240", "title": "King St & 4th St"}], "direction": [{"tag": "N____O_F00", "stop": [{"tag": "5240"}]}]}}"#;

    #[test]
    fn test_load_csv_dedupes() {
        let mut files = BTreeMap::new();
        files.insert("samples.csv".to_string(), SAMPLES.to_string());
        files.insert("stops.csv".to_string(), STOPS.to_string());
        let data = RouteData::load(&mut files, None).unwrap();
        assert_eq!(data.samples.len(), 2);
        assert_eq!(data.stops.len(), 1);
        assert_eq!(data.route, None);
    }

    #[test]
    fn test_missing_files() {
        let mut files = BTreeMap::new();
        assert!(RouteData::load(&mut files, None).is_err());

        files.insert("samples.csv".to_string(), SAMPLES.to_string());
        let err = RouteData::load(&mut files, None).err().unwrap();
        assert!(err.to_string().contains("stops.csv"));
    }

    #[test]
    fn test_load_trynstate() {
        let mut files = BTreeMap::new();
        files.insert(
            "trynstate.json".to_string(),
            format!("[{}, {}]", response(0, "N"), response(3_600_000, "N")),
        );
        files.insert("route_config.json".to_string(), CONFIG.to_string());
        let data = RouteData::load(&mut files, None).unwrap();
        assert_eq!(data.route, Some(RouteID::new("N")));
        assert_eq!(data.samples.len(), 2);
        assert_eq!(data.samples[1].timestamp, Timestamp(3_600_001));
        // The stop with no direction is dropped
        assert_eq!(data.stops.len(), 1);
        assert_eq!(data.stops[0].stop_id, StopID::new("5240"));
        assert_eq!(data.stops[0].name, "King St & 4th St");
    }

    #[test]
    fn test_load_trynstate_with_error_response() {
        let mut files = BTreeMap::new();
        files.insert(
            "trynstate.json".to_string(),
            format!(
                r#"[{}, {{"errors": [{{"message": "timeout"}}]}}, {}]"#,
                response(0, "N"),
                response(7_200_000, "N")
            ),
        );
        files.insert("route_config.json".to_string(), CONFIG.to_string());
        let data = RouteData::load(&mut files, None).unwrap();
        assert_eq!(data.samples.len(), 2);
        assert_eq!(data.samples[0].timestamp, Timestamp(1));
        assert_eq!(data.samples[1].timestamp, Timestamp(7_200_001));
    }

    #[test]
    fn test_load_trynstate_many_routes() {
        let mut files = BTreeMap::new();
        files.insert(
            "trynstate.json".to_string(),
            format!(
                r#"[{}, {{"data": {{"trynState": {{"startTime": 0, "routes": [{{"rid": "J"}}]}}}}}}]"#,
                response(3_600_000, "N")
            ),
        );
        files.insert("route_config.json".to_string(), CONFIG.to_string());
        assert!(RouteData::load(&mut files, None).is_err());

        let data = RouteData::load(&mut files, Some(&RouteID::new("N"))).unwrap();
        assert_eq!(data.samples.len(), 1);
        assert!(RouteData::load(&mut files, Some(&RouteID::new("K"))).is_err());
    }

    #[test]
    fn test_zip() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("samples.csv", options).unwrap();
        writer.write_all(SAMPLES.as_bytes()).unwrap();
        writer.start_file("stops.csv", options).unwrap();
        writer.write_all(STOPS.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let data = RouteData::from_zip_bytes(bytes, Some(&RouteID::new("N"))).unwrap();
        assert_eq!(data.samples.len(), 2);
        assert_eq!(data.route, Some(RouteID::new("N")));
    }
}
