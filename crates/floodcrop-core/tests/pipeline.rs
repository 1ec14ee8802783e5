use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use floodcrop_core::io::{read_class_raster, write_gray8_tiff};
use floodcrop_core::report::REPORT_FILENAME;
use floodcrop_core::tile::{
    MASK_FILENAME, REASON_NO_FLOOD, REASON_NO_MLU, STATS_FILENAME, VISUALIZATION_FILENAME,
};
use floodcrop_core::{
    run_batch, BatchReport, PipelineConfig, Provenance, Raster, SimulationMode, TileStatus,
};

const MLU: &str = "MK0_MLU_1111008_01_20200816.tif";

// 4×4 tile: 4 flood, 1 permanent water, 1 nodata, 10 land.
fn mlu_rows() -> Vec<Vec<u8>> {
    vec![
        vec![0, 0, 2, 2],
        vec![0, 1, 2, 2],
        vec![0, 0, 0, 3],
        vec![0, 0, 0, 0],
    ]
}

// 8 cropland pixels; only (0,2) is also flooded.
fn strict_rows() -> Vec<Vec<u8>> {
    vec![
        vec![255, 255, 255, 0],
        vec![255, 255, 0, 0],
        vec![255, 255, 0, 0],
        vec![255, 0, 0, 0],
    ]
}

fn write_tile(root: &Path, name: &str, mlu: Option<Vec<Vec<u8>>>, strict: Option<Vec<Vec<u8>>>) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    if let Some(rows) = mlu {
        write_gray8_tiff(&dir.join(MLU), &Raster::from_rows(&rows)).unwrap();
    }
    if let Some(rows) = strict {
        write_gray8_tiff(&dir.join("cropland_strict_mask.tif"), &Raster::from_rows(&rows)).unwrap();
    }
}

fn config(root: &Path) -> PipelineConfig {
    let mut c = PipelineConfig {
        flood_dir: root.join("flood"),
        output_dir: root.join("results"),
        ..PipelineConfig::default()
    };
    c.simulation.mode = SimulationMode::Disabled;
    c
}

fn read_report(root: &Path) -> BatchReport {
    let text = fs::read_to_string(root.join("results").join(REPORT_FILENAME)).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn strict_mask_tile_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let flood = tmp.path().join("flood");
    write_tile(&flood, "T01", Some(mlu_rows()), Some(strict_rows()));
    fs::write(
        flood.join("T01").join("info.json"),
        r#"{"flood_date": "2020-08-16", "geom": "POLYGON ((0 0, 100 0, 100 100, 0 100, 0 0))"}"#,
    )
    .unwrap();

    let report = run_batch(config(tmp.path())).unwrap();
    assert_eq!(report.summary.total_tiles, 1);
    assert_eq!(report.summary.success_tiles, 1);

    let r = &report.per_tile_results[0];
    assert_eq!(r.status, TileStatus::Success);
    assert_eq!(r.flood_date.as_deref(), Some("2020-08-16"));
    assert_eq!(r.data_source, Some(Provenance::Authoritative));
    assert_eq!(r.cropland_strategy.as_deref(), Some("strict_mask"));
    assert!(r.bounds_wgs84.is_some());

    let counts = r.class_counts.unwrap();
    assert_eq!((counts.land, counts.permanent_water, counts.flood, counts.nodata), (10, 1, 4, 1));

    let s = r.intersection.unwrap();
    assert_eq!(s.flood_pixels, 4);
    assert_eq!(s.cropland_pixels, 8);
    assert_eq!(s.flooded_cropland_pixels, 1);
    assert_eq!(s.flood_area_m2, 400.0);
    assert_relative_eq!(s.flood_cropland_ratio, 0.25);

    let out = tmp.path().join("results").join("T01");
    assert!(out.join(VISUALIZATION_FILENAME).is_file());
    assert!(out.join(STATS_FILENAME).is_file());
    let mask = read_class_raster(&out.join(MASK_FILENAME)).unwrap();
    assert_eq!(mask.shape(), (4, 4));
    assert_eq!(mask.count_equal(255), 1);
    assert_eq!(mask.get(0, 2), 255);

    let on_disk = read_report(tmp.path());
    assert_eq!(on_disk.summary, report.summary);
}

#[test]
fn skips_and_errors_leave_no_outputs() {
    let tmp = tempfile::tempdir().unwrap();
    let flood = tmp.path().join("flood");
    let dry = vec![vec![0u8, 0], vec![1, 3]];
    write_tile(&flood, "A_dry", Some(dry), None);
    write_tile(&flood, "B_empty", None, None);
    write_tile(&flood, "C_no_cropland", Some(mlu_rows()), None);
    write_tile(&flood, "D_ok", Some(mlu_rows()), Some(strict_rows()));

    let report = run_batch(config(tmp.path())).unwrap();
    let statuses: Vec<_> = report
        .per_tile_results
        .iter()
        .map(|r| (r.tile_name.as_str(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("A_dry", TileStatus::Skip),
            ("B_empty", TileStatus::Skip),
            ("C_no_cropland", TileStatus::Error),
            ("D_ok", TileStatus::Success),
        ]
    );
    assert_eq!(report.per_tile_results[0].reason.as_deref(), Some(REASON_NO_FLOOD));
    assert_eq!(report.per_tile_results[1].reason.as_deref(), Some(REASON_NO_MLU));
    assert!(report.per_tile_results[2]
        .reason
        .as_deref()
        .unwrap()
        .starts_with("cropland loading failed"));

    let results = tmp.path().join("results");
    for name in ["A_dry", "B_empty", "C_no_cropland"] {
        assert!(!results.join(name).join(MASK_FILENAME).exists(), "{name}");
        assert!(!results.join(name).join(STATS_FILENAME).exists(), "{name}");
    }

    let s = &report.summary;
    assert_eq!((s.total_tiles, s.success_tiles, s.skipped_tiles, s.error_tiles), (4, 1, 2, 1));
    assert_eq!(s.total_flood_pixels, 4);
    assert_eq!(s.total_flooded_cropland_pixels, 1);
    assert_relative_eq!(s.total_flood_area_km2, 0.0004, max_relative = 1e-12);
    assert_relative_eq!(s.flood_cropland_percent, 25.0, max_relative = 1e-12);
}

#[test]
fn simulation_fills_in_for_missing_cropland_reproducibly() {
    let tmp = tempfile::tempdir().unwrap();
    write_tile(&tmp.path().join("flood"), "T01", Some(mlu_rows()), None);

    let mut c = config(tmp.path());
    c.simulation.mode = SimulationMode::Realistic;
    let first = run_batch(c.clone()).unwrap();
    let second = run_batch(c).unwrap();

    let r = &first.per_tile_results[0];
    assert_eq!(r.status, TileStatus::Success);
    assert_eq!(r.data_source, Some(Provenance::Simulated));
    assert_eq!(r.cropland_strategy.as_deref(), Some("simulated_realistic"));
    assert_eq!(first.per_tile_results, second.per_tile_results);
}

#[test]
fn unexpected_mlu_value_is_a_tile_error() {
    let tmp = tempfile::tempdir().unwrap();
    let bad = vec![vec![0u8, 2], vec![9, 0]];
    write_tile(&tmp.path().join("flood"), "T01", Some(bad), Some(vec![vec![255, 255], vec![0, 0]]));

    let report = run_batch(config(tmp.path())).unwrap();
    assert_eq!(report.per_tile_results[0].status, TileStatus::Error);
    assert_eq!(report.summary.error_tiles, 1);
    assert_eq!(report.summary.total_flood_pixels, 0);
}

#[test]
fn empty_flood_dir_writes_zero_report() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("flood")).unwrap();
    let report = run_batch(config(tmp.path())).unwrap();
    assert_eq!(report.summary.total_tiles, 0);
    assert!(report.per_tile_results.is_empty());
    assert_eq!(read_report(tmp.path()).summary.total_tiles, 0);
}

#[test]
fn worker_pool_matches_sequential_run() {
    let tmp = tempfile::tempdir().unwrap();
    let flood = tmp.path().join("flood");
    for i in 0..12 {
        let name = format!("T{i:02}");
        match i % 4 {
            0 => write_tile(&flood, &name, Some(mlu_rows()), Some(strict_rows())),
            1 => write_tile(&flood, &name, Some(mlu_rows()), None),
            2 => write_tile(&flood, &name, Some(vec![vec![0, 0], vec![1, 3]]), None),
            _ => write_tile(&flood, &name, Some(vec![vec![0, 2], vec![9, 0]]), None),
        }
    }

    let mut sequential = config(tmp.path());
    sequential.simulation.mode = SimulationMode::Realistic;
    sequential.output_dir = tmp.path().join("seq");
    let mut pooled = sequential.clone();
    pooled.output_dir = tmp.path().join("pool");
    pooled.workers = 4;

    let a = run_batch(sequential).unwrap();
    let b = run_batch(pooled).unwrap();

    let names: Vec<String> = b.per_tile_results.iter().map(|r| r.tile_name.clone()).collect();
    let expected: Vec<String> = (0..12).map(|i| format!("T{i:02}")).collect();
    assert_eq!(names, expected);
    assert_eq!(a.per_tile_results, b.per_tile_results);
    assert_eq!(a.summary, b.summary);

    let s = &b.summary;
    assert_eq!((s.total_tiles, s.success_tiles, s.skipped_tiles, s.error_tiles), (12, 6, 3, 3));
    assert_eq!(s.total_flood_pixels, 24);
}
