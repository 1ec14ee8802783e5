//! Batch orchestration: discover tiles, process each one independently,
//! aggregate once every tile has a record.
//!
//! The default is a sequential sweep. With the `threading` feature and
//! `workers != 1`, tiles run on a local rayon pool; results still come back in
//! discovery order and aggregation waits for the join.

use std::fs;
use std::path::Path;

use log::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::report::{BatchReport, REPORT_FILENAME};
use crate::tile::{Tile, TileProcessor, TileResult, TileStatus};

/// Every sub-directory of `flood_dir`, sorted by name. Names that are not
/// valid UTF-8 are converted lossily so the tile still gets a record.
pub fn discover_tiles(flood_dir: &Path) -> Result<Vec<Tile>> {
    let mut tiles = Vec::new();
    for entry in fs::read_dir(flood_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        tiles.push(Tile::new(name, path));
    }
    tiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tiles)
}

fn log_progress(done: usize, total: usize, result: &TileResult) {
    match (result.status, &result.intersection) {
        (TileStatus::Success, Some(s)) => info!(
            "[{done}/{total}] {}: flooded_cropland={}px",
            result.tile_name, s.flooded_cropland_pixels
        ),
        (status, _) => info!(
            "[{done}/{total}] {}: {:?} ({})",
            result.tile_name,
            status,
            result.reason.as_deref().unwrap_or("")
        ),
    }
}

pub struct BatchRunner {
    processor: TileProcessor,
    workers: usize,
}

impl BatchRunner {
    pub fn new(processor: TileProcessor) -> Self {
        let workers = processor.config().workers;
        Self { processor, workers }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn processor(&self) -> &TileProcessor {
        &self.processor
    }

    /// One record per tile, in the order of `tiles`. A failing tile only
    /// affects its own record.
    pub fn run(&self, tiles: &[Tile]) -> Result<Vec<TileResult>> {
        if self.workers == 1 || tiles.len() <= 1 {
            return Ok(self.run_sequential(tiles));
        }
        self.run_parallel(tiles)
    }

    fn run_sequential(&self, tiles: &[Tile]) -> Vec<TileResult> {
        let total = tiles.len();
        tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| {
                let result = self.processor.process(tile);
                log_progress(i + 1, total, &result);
                result
            })
            .collect()
    }

    #[cfg(feature = "threading")]
    fn run_parallel(&self, tiles: &[Tile]) -> Result<Vec<TileResult>> {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use rayon::prelude::*;

        use crate::error::FloodCropError;

        let mut builder = rayon::ThreadPoolBuilder::new();
        if self.workers > 0 {
            builder = builder.num_threads(self.workers);
        }
        let pool = builder
            .build()
            .map_err(|e| FloodCropError::Config(format!("cannot build worker pool: {e}")))?;
        info!("Processing {} tiles on {} workers", tiles.len(), pool.current_num_threads());

        let total = tiles.len();
        let done = AtomicUsize::new(0);
        let results = pool.install(|| {
            tiles
                .par_iter()
                .map(|tile| {
                    let result = self.processor.process(tile);
                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    log_progress(n, total, &result);
                    result
                })
                .collect()
        });
        Ok(results)
    }

    #[cfg(not(feature = "threading"))]
    fn run_parallel(&self, tiles: &[Tile]) -> Result<Vec<TileResult>> {
        log::warn!(
            "{} workers requested but built without the `threading` feature; running sequentially",
            self.workers
        );
        Ok(self.run_sequential(tiles))
    }
}

/// Validate the configuration, sweep every tile under `flood_dir`, and write
/// `summary_report.json` into `output_dir`.
pub fn run_batch(config: PipelineConfig) -> Result<BatchReport> {
    config.validate()?;
    fs::create_dir_all(&config.output_dir)?;

    let tiles = discover_tiles(&config.flood_dir)?;
    info!("Found {} tiles in {}", tiles.len(), config.flood_dir.display());
    info!("Output directory: {}", config.output_dir.display());

    let pixel_size_m = config.pixel_size_m;
    let report_path = config.output_dir.join(REPORT_FILENAME);

    let runner = BatchRunner::new(TileProcessor::from_config(config)?);
    info!(
        "Cropland sources: {}",
        runner.processor().resolver().source_names().join(" → ")
    );
    let results = runner.run(&tiles)?;

    let report = BatchReport::new(results, pixel_size_m);
    report.write(&report_path)?;
    info!("Report written to {}", report_path.display());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_lists_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "not a tile").unwrap();

        let names: Vec<String> = discover_tiles(dir.path())
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_directory_is_still_discovered() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(OsStr::from_bytes(b"tile_\xff"))).unwrap();
        fs::create_dir(dir.path().join("ok")).unwrap();

        let tiles = discover_tiles(dir.path()).unwrap();
        assert_eq!(tiles.len(), 2);
        assert!(tiles.iter().any(|t| t.name == "tile_\u{fffd}"));
    }

    #[test]
    fn empty_tiles_dir_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            flood_dir: dir.path().to_path_buf(),
            output_dir: dir.path().join("out"),
            ..PipelineConfig::default()
        };
        let runner = BatchRunner::new(TileProcessor::from_config(config).unwrap());
        assert!(runner.run(&[]).unwrap().is_empty());
    }

    #[test]
    fn missing_flood_dir_aborts_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            flood_dir: dir.path().join("absent"),
            output_dir: dir.path().join("out"),
            ..PipelineConfig::default()
        };
        assert!(run_batch(config).is_err());
        assert!(!dir.path().join("out").exists());
    }
}
