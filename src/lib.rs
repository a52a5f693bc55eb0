use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod converter;
pub mod error;
pub mod table;
pub mod writer;

pub use converter::{to_feature_collection, CoordinateColumns};
pub use error::ConvertError;
pub use table::{read_table, Cell, Row, Table};
pub use writer::write_geojson;

/// Catalogs converted when no input is named.
pub const DEFAULT_INPUTS: [&str; 2] = ["tsunamis.tsv", "earthquakes.tsv"];

pub const OUTPUT_EXTENSION: &str = "geojson";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub columns: CoordinateColumns,
    pub delimiter: u8,
    pub pretty: bool,
    pub bbox: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            columns: CoordinateColumns::default(),
            delimiter: b'\t',
            pretty: false,
            bbox: false,
        }
    }
}

/// One input table and the GeoJSON file it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Job {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// `data/tsunamis.tsv` becomes `data/tsunamis.geojson`, or `<output_dir>/tsunamis.geojson`.
    pub fn for_input(input: &Path, output_dir: Option<&Path>) -> Self {
        let mut output = input.with_extension(OUTPUT_EXTENSION);
        if let Some(dir) = output_dir {
            if let Some(name) = output.file_name() {
                output = dir.join(name);
            }
        }
        Self::new(input, output)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_read: usize,
    pub features_written: usize,
}

impl ConversionReport {
    pub fn rows_skipped(&self) -> usize {
        self.rows_read - self.features_written
    }
}

/// Load, convert and write a single table.
pub fn convert_file(job: &Job, options: &ConvertOptions) -> Result<ConversionReport, ConvertError> {
    debug!(input = %job.input.display(), output = %job.output.display(), "Converting");

    let table = read_table(&job.input, options.delimiter)?;
    let mut collection = to_feature_collection(&table, &options.columns);
    if options.bbox {
        collection.bbox = converter::feature_collection_bbox(&collection);
    }
    write_geojson(&job.output, &collection, options.pretty)?;

    let report = ConversionReport {
        input: job.input.clone(),
        output: job.output.clone(),
        rows_read: table.rows.len(),
        features_written: collection.features.len(),
    };
    info!(
        input = %report.input.display(),
        output = %report.output.display(),
        rows = report.rows_read,
        features = report.features_written,
        skipped = report.rows_skipped(),
        "Wrote GeoJSON"
    );
    Ok(report)
}

/// Convert each job in order. Stops at the first file-level error.
pub fn run(jobs: &[Job], options: &ConvertOptions) -> Result<Vec<ConversionReport>, ConvertError> {
    jobs.iter().map(|job| convert_file(job, options)).collect()
}
