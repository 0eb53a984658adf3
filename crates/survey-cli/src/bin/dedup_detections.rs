//! Collapse repeated sightings in a geolocated detection log.
//!
//! Input is one `{"lat", "lon", "class_label", "source_image_id"}` record per
//! line, in capture order. Output is the unique list as a JSON array.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use survey_cli::init_tracing;
use survey_core::{Deduplicator, GeolocatedDetection};

/// Remove duplicate detections closer than a distance threshold
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON-lines input; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Distance in meters under which two detections are the same object
    #[arg(long, default_value_t = 0.5)]
    threshold: f64,
}

fn main() -> Result<()> {
    init_tracing("dedup_detections=info")?;
    let args = Args::parse();

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut dedup = Deduplicator::new(args.threshold);
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<GeolocatedDetection>(&line) {
            Ok(detection) => {
                dedup.push(detection);
            }
            Err(err) => tracing::warn!("Line {}: skipping bad record: {}", line_no + 1, err),
        }
    }

    tracing::info!(
        "{} detections, {} unique, {} duplicates",
        dedup.seen(),
        dedup.unique().len(),
        dedup.duplicates()
    );
    println!("{}", serde_json::to_string_pretty(&dedup.into_unique())?);
    Ok(())
}
