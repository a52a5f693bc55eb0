use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};
use tsv_to_geojson::converter::{DEFAULT_LATITUDE_COLUMN, DEFAULT_LONGITUDE_COLUMN};
use tsv_to_geojson::{run, ConvertOptions, CoordinateColumns, Job, DEFAULT_INPUTS};

fn main() -> Result<()> {
    let matches = Command::new("TSV to GeoJSON")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Jesper Fjellin")
        .about("Converts tab-separated point records into GeoJSON FeatureCollections")
        .arg(
            Arg::new("files")
                .short('f')
                .long("files")
                .num_args(1..)
                .help("Input tables (defaults to tsunamis.tsv and earthquakes.tsv)"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .num_args(1)
                .help("Directory for the .geojson files (defaults to beside each input)"),
        )
        .arg(
            Arg::new("lat-column")
                .long("lat-column")
                .num_args(1)
                .default_value(DEFAULT_LATITUDE_COLUMN)
                .help("Name of the latitude column"),
        )
        .arg(
            Arg::new("lon-column")
                .long("lon-column")
                .num_args(1)
                .default_value(DEFAULT_LONGITUDE_COLUMN)
                .help("Name of the longitude column"),
        )
        .arg(
            Arg::new("delimiter")
                .short('d')
                .long("delimiter")
                .num_args(1)
                .default_value("\t")
                .help("Single-byte field delimiter"),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .action(ArgAction::SetTrue)
                .help("Pretty-print the output JSON"),
        )
        .arg(
            Arg::new("bbox")
                .long("bbox")
                .action(ArgAction::SetTrue)
                .help("Add a bbox member to each FeatureCollection"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase verbosity (-v, -vv)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Only log warnings and errors"),
        )
        .get_matches();

    init_logging(matches.get_count("verbose"), matches.get_flag("quiet"));

    let files: Option<Vec<PathBuf>> = matches
        .get_many::<String>("files")
        .map(|files| files.map(PathBuf::from).collect());
    let output_dir = matches.get_one::<String>("output-dir").map(Path::new);

    let options = ConvertOptions {
        columns: CoordinateColumns::new(
            required(&matches, "lat-column")?,
            required(&matches, "lon-column")?,
        ),
        delimiter: parse_delimiter(required(&matches, "delimiter")?)?,
        pretty: matches.get_flag("pretty"),
        bbox: matches.get_flag("bbox"),
    };

    let jobs = input_jobs(files, output_dir);

    let reports = run(&jobs, &options).context("Error processing files")?;
    for report in &reports {
        println!(
            "{} -> {}: {} features ({} rows skipped)",
            report.input.display(),
            report.output.display(),
            report.features_written,
            report.rows_skipped()
        );
    }

    Ok(())
}

/// Jobs for the named files, or for the default catalogs when none are given.
fn input_jobs(files: Option<Vec<PathBuf>>, output_dir: Option<&Path>) -> Vec<Job> {
    let files =
        files.unwrap_or_else(|| DEFAULT_INPUTS.into_iter().map(PathBuf::from).collect());
    files
        .iter()
        .map(|file| Job::for_input(file, output_dir))
        .collect()
}

fn required<'a>(matches: &'a clap::ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing value for --{id}"))
}

fn parse_delimiter(value: &str) -> Result<u8> {
    // Accept a literal "\t" typed on the command line too.
    let value = if value == "\\t" { "\t" } else { value };
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => bail!("Delimiter must be a single byte, got {value:?}"),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
