//! CLI command implementations
//!
//! `main` parses arguments with [`cli`] and runs whatever
//! [`SceneKitCommandFactory`] builds from them.

pub mod command_traits;
pub mod inspect_command;
pub mod list_command;
pub mod run_command;

pub use command_traits::{Command, CommandFactory};
pub use inspect_command::InspectCommand;
pub use list_command::ListScenesCommand;
pub use run_command::RunCommand;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command as ClapCommand};
use std::path::PathBuf;

use crate::config::{RegionSource, RunConfig, RunSettings};
use crate::coordinate::BoundingBox;
use crate::errors::SceneResult;
use crate::sensor::SensorRegistry;
use crate::utils::date_utils;

/// Argument definitions of the `scenekit` binary
pub fn cli() -> ClapCommand {
    ClapCommand::new("scenekit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Composite Landsat Level-2 time series into NDVI and LST mosaics")
        .arg(Arg::new("start").long("start").value_name("YYYY-MM-DD").help("First acquisition day (included)"))
        .arg(Arg::new("end").long("end").value_name("YYYY-MM-DD").help("End of the window (excluded)"))
        .arg(
            Arg::new("bbox")
                .long("bbox")
                .value_name("BBOX")
                .help("Region as minx,miny,maxx,maxy in the archive CRS")
                .conflicts_with("region-file"),
        )
        .arg(
            Arg::new("region-file")
                .long("region-file")
                .value_name("FILE")
                .help("Region as a GeoJSON Polygon/MultiPolygon")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("epsg")
                .long("epsg")
                .value_name("CODE")
                .help("EPSG code of the region coordinates")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("archive")
                .long("archive")
                .value_name("DIR")
                .help("Root directory of the scene archive")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(Arg::new("collection").long("collection").value_name("ID").help("Collection id, e.g. LANDSAT/LC08/C02/T1_L2"))
        .arg(Arg::new("sensor").long("sensor").value_name("NAME").help("Sensor profile (landsat4/5/7/8/9 or from --config)"))
        .arg(
            Arg::new("scale")
                .long("scale")
                .value_name("METERS")
                .help("Analysis and export pixel size")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("max-pixels")
                .long("max-pixels")
                .value_name("N")
                .help("Refuse exports larger than N pixels (width x height x bands)")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Where products are written")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("compression")
                .long("compression")
                .value_name("NAME")
                .help("GeoTIFF compression (none, deflate, zstd)"),
        )
        .arg(Arg::new("quicklooks").long("quicklooks").help("Also render PNG quicklooks").action(ArgAction::SetTrue))
        .arg(Arg::new("no-progress").long("no-progress").help("Hide the progress bar").action(ArgAction::SetTrue))
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML file with [run] settings and [sensors.*] profiles")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("list-scenes")
                .long("list-scenes")
                .help("List matching scenes and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("inspect")
                .long("inspect")
                .value_name("TIF")
                .help("Describe a GeoTIFF and exit")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Write the log to FILE (mirrored to stdout)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug output")
                .action(ArgAction::SetTrue),
        )
}

/// The command-line configuration layer
pub fn settings_from_args(args: &ArgMatches) -> SceneResult<RunSettings> {
    let region = match (args.get_one::<String>("bbox"), args.get_one::<PathBuf>("region-file")) {
        (Some(bbox), _) => Some(RegionSource::Bbox(BoundingBox::from_string(bbox)?)),
        (None, Some(file)) => Some(RegionSource::GeoJson(file.clone())),
        (None, None) => None,
    };

    Ok(RunSettings {
        start: args.get_one::<String>("start").map(|d| date_utils::parse_iso_date(d)).transpose()?,
        end: args.get_one::<String>("end").map(|d| date_utils::parse_iso_date(d)).transpose()?,
        region,
        epsg: args.get_one::<u16>("epsg").copied(),
        archive: args.get_one::<PathBuf>("archive").cloned(),
        collection: args.get_one::<String>("collection").cloned(),
        sensor: args.get_one::<String>("sensor").cloned(),
        scale: args.get_one::<f64>("scale").copied(),
        max_pixels: args.get_one::<u64>("max-pixels").copied(),
        output_dir: args.get_one::<PathBuf>("output-dir").cloned(),
        compression: args.get_one::<String>("compression").cloned(),
        quicklooks: args.get_flag("quicklooks").then_some(true),
        progress: args.get_flag("no-progress").then_some(false),
    })
}

/// Config file layer (if any) under the command-line layer
pub fn resolve_config(args: &ArgMatches) -> SceneResult<RunConfig> {
    let mut sensors = SensorRegistry::builtin();
    let file_layer = match args.get_one::<PathBuf>("config") {
        Some(path) => {
            sensors.apply_toml_file(path)?;
            RunSettings::from_toml_file(path)?
        }
        None => RunSettings::default(),
    };
    file_layer.merge(settings_from_args(args)?).resolve(sensors)
}

/// Factory for creating command instances based on CLI arguments
pub struct SceneKitCommandFactory;

impl SceneKitCommandFactory {
    pub fn new() -> Self {
        SceneKitCommandFactory
    }
}

impl Default for SceneKitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for SceneKitCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> SceneResult<Box<dyn Command>> {
        if let Some(path) = args.get_one::<PathBuf>("inspect") {
            return Ok(Box::new(InspectCommand::new(path.clone())));
        }

        let config = resolve_config(args)?;
        if args.get_flag("list-scenes") {
            Ok(Box::new(ListScenesCommand::new(config)))
        } else {
            Ok(Box::new(RunCommand::new(config)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ArgMatches {
        cli().try_get_matches_from(std::iter::once("scenekit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_become_settings() {
        let args = parse(&[
            "--start", "2020-05-01", "--end", "2020-06-30", "--bbox", "0,0,300,300", "--epsg", "32633", "--quicklooks",
        ]);
        let settings = settings_from_args(&args).unwrap();
        assert_eq!(settings.epsg, Some(32633));
        assert_eq!(settings.quicklooks, Some(true));
        assert_eq!(settings.progress, None);
        assert!(matches!(settings.region, Some(RegionSource::Bbox(_))));
    }

    #[test]
    fn bbox_conflicts_with_region_file() {
        let result = cli().try_get_matches_from(["scenekit", "--bbox", "0,0,1,1", "--region-file", "r.geojson"]);
        assert!(result.is_err());
    }

    #[test]
    fn bad_date_is_a_config_error() {
        let args = parse(&["--start", "May 1"]);
        assert!(settings_from_args(&args).is_err());
    }

    #[test]
    fn inspect_needs_no_run_settings() {
        let args = parse(&["--inspect", "product.tif"]);
        assert!(SceneKitCommandFactory::new().create_command(&args).is_ok());
    }
}
