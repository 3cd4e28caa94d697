use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use scenekit::archive::SceneArchive;
use scenekit::commands::{cli, resolve_config, CommandFactory, SceneKitCommandFactory};
use scenekit::config::RegionSource;
use scenekit::sensor::SensorRegistry;
use scenekit::tiff::builders::basic_tags::SampleLayout;
use scenekit::tiff::constants::{compression, sample_format};
use scenekit::tiff::{RasterReader, TiffBuilder};
use scenekit::{BoundingBox, LocalArchive, RunSettings, SceneKit, TiffReader};

const COLLECTION: &str = "LANDSAT/LC08/C02/T1_L2";
const MAY: &str = "LC08_L2SP_190026_20200517_20200527_02_T1";
const JUNE: &str = "LC08_L2SP_190026_20200618_20200628_02_T1";
const JULY: &str = "LC08_L2SP_190026_20200704_20200714_02_T1";

/// A 4x4 UInt16 band on a 30 m grid anchored at (0, 120)
fn write_band(path: &Path, values: &[u16], nodata: Option<f64>) {
    let mut strip = Vec::with_capacity(values.len() * 2);
    for v in values {
        strip.extend_from_slice(&v.to_le_bytes());
    }

    let mut builder = TiffBuilder::new(false);
    let ifd = builder.add_ifd();
    builder
        .add_raster_tags(
            ifd,
            SampleLayout {
                width: 4,
                height: 4,
                samples_per_pixel: 1,
                bits_per_sample: 16,
                sample_format: sample_format::UNSIGNED,
            },
            compression::NONE,
        )
        .unwrap();
    builder.setup_single_strip(ifd, strip).unwrap();
    builder.add_georeferencing(ifd, &[0.0, 30.0, 0.0, 120.0, 0.0, -30.0], Some(32633)).unwrap();
    if let Some(nodata) = nodata {
        builder.add_nodata_tag(ifd, nodata).unwrap();
    }
    builder.write(path).unwrap();
}

fn write_scene(root: &Path, id: &str, red: u16, nir: u16, bands: &[&str]) -> PathBuf {
    let dir = COLLECTION.split('/').fold(root.to_path_buf(), |p, part| p.join(part)).join(id);
    fs::create_dir_all(&dir).unwrap();
    for band in bands {
        let (values, nodata) = match *band {
            "SR_B4" => {
                let mut values = vec![red; 16];
                values[15] = 0;
                (values, Some(0.0))
            }
            "SR_B5" => (vec![nir; 16], Some(0.0)),
            "ST_B10" => (vec![44000; 16], Some(0.0)),
            _ => (vec![21824; 16], None),
        };
        write_band(&dir.join(format!("{}_{}.TIF", id, band)), &values, nodata);
    }
    dir
}

fn archive_root() -> tempfile::TempDir {
    let root = tempdir().unwrap();
    let all = ["SR_B4", "SR_B5", "ST_B10", "QA_PIXEL"];
    write_scene(root.path(), JUNE, 10000, 40000, &all);
    write_scene(root.path(), MAY, 10000, 30000, &all);
    write_scene(root.path(), JULY, 10000, 45000, &["SR_B4", "SR_B5", "QA_PIXEL"]);
    root
}

fn settings(archive: &Path, output_dir: &Path) -> RunSettings {
    RunSettings {
        start: NaiveDate::from_ymd_opt(2020, 5, 1),
        end: NaiveDate::from_ymd_opt(2020, 8, 1),
        region: Some(RegionSource::Bbox(BoundingBox::new(0.0, 0.0, 90.0, 90.0))),
        epsg: Some(32633),
        archive: Some(archive.to_path_buf()),
        output_dir: Some(output_dir.to_path_buf()),
        progress: Some(false),
        ..RunSettings::default()
    }
}

#[test]
fn lists_scenes_in_acquisition_order() {
    let root = archive_root();
    let scenes = LocalArchive::new(root.path()).list(COLLECTION).unwrap();

    let ids: Vec<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![MAY, JUNE, JULY]);
    let footprint = scenes[0].footprint.as_ref().unwrap();
    assert_eq!((footprint.min_x, footprint.max_y), (0.0, 120.0));
    assert_eq!(footprint.epsg, Some(32633));
}

#[test]
fn run_skips_scenes_without_thermal_band() {
    let root = archive_root();
    let out = tempdir().unwrap();
    let config = settings(root.path(), out.path()).resolve(SensorRegistry::builtin()).unwrap();

    let report = SceneKit::new(config).run_local().unwrap();
    assert_eq!(report.scene_ids, vec![MAY, JUNE]);

    let ndvi_path = out.path().join("landsat8_ndvi_2020-05-01_2020-08-01.tif");
    let mut tiff_reader = TiffReader::new();
    let (tiff, mut file) = tiff_reader.open(&ndvi_path).unwrap();
    let ifd = tiff.main_ifd().unwrap().clone();
    let planes = RasterReader::new(&tiff_reader, &mut file, &ifd).unwrap().read_all(&mut file).unwrap();

    // 3x3 window of the 4x4 scenes; the red no-data pixel lies outside it
    assert_eq!(planes[0].len(), 9);
    assert!(planes[0].iter().all(|v| *v > 700.0 && *v < 900.0));
}

#[test]
fn missing_archive_is_reported_as_retryable() {
    let out = tempdir().unwrap();
    let config = settings(Path::new("/nonexistent/scenekit"), out.path())
        .resolve(SensorRegistry::builtin())
        .unwrap();
    let err = SceneKit::new(config).run_local().unwrap_err();
    assert!(err.is_retryable());
}

#[test]
fn config_file_supplies_run_settings_and_sensors() {
    let root = archive_root();
    let work = tempdir().unwrap();
    let config_path = work.path().join("scenekit.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[run]
start = "2020-05-01"
end = "2020-06-01"
bbox = "0,0,90,90"
epsg = 32633
archive = "{}"
sensor = "olitirs"
scale = 60

[sensors.olitirs]
extends = "landsat8"
"#,
            root.path().display()
        ),
    )
    .unwrap();

    let args = cli()
        .try_get_matches_from([
            "scenekit",
            "--config",
            config_path.to_str().unwrap(),
            "--end",
            "2020-07-01",
            "--no-progress",
        ])
        .unwrap();
    let config = resolve_config(&args).unwrap();

    assert_eq!(config.profile.name, "olitirs");
    assert_eq!(config.collection, COLLECTION);
    assert_eq!(config.scale, 60.0);
    assert_eq!(config.end, NaiveDate::from_ymd_opt(2020, 7, 1).unwrap());
    assert!(!config.progress);
    assert_eq!(config.output_name("ndvi"), "olitirs_ndvi_2020-05-01_2020-07-01");

    let scenes = SceneKit::new(config.clone()).list_scenes(&LocalArchive::new(&config.archive)).unwrap();
    assert_eq!(scenes.len(), 2);

    let list = cli()
        .try_get_matches_from(["scenekit", "--config", config_path.to_str().unwrap(), "--list-scenes"])
        .unwrap();
    let command = SceneKitCommandFactory::new().create_command(&list).unwrap();
    command.execute().unwrap();
}

#[test]
fn inspect_describes_an_exported_product() {
    let root = archive_root();
    let out = tempdir().unwrap();
    let config = settings(root.path(), out.path()).resolve(SensorRegistry::builtin()).unwrap();
    let report = SceneKit::new(config).run_local().unwrap();

    let greenest = report.exports.iter().find(|e| e.path.to_string_lossy().contains("greenest")).unwrap();
    let text = SceneKit::inspect(&greenest.path).unwrap();
    assert!(text.contains("3x3"));
    assert!(text.contains("EPSG:32633"));
    assert!(text.contains("Band 2: time_at_max"));
}
