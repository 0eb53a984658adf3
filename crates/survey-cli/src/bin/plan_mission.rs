//! Plan a survey mission from a KML area file.
//!
//! Usage:
//!   cargo run -p survey-cli --bin plan_mission -- --area mission.kml
//!   cargo run -p survey-cli --bin plan_mission -- --area mission.kml --return-from 51.4238,-2.6672

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use survey_cli::{init_tracing, load_area, load_config, parse_latlon};
use survey_core::mission::random_survey_target;
use survey_core::{plan_mission, plan_return, MissionPlan, PlannedPath, PlannerConfig};

/// Plan approach, coverage and return legs for a survey area
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// KML file with take-off, sensitive, survey and flight regions
    #[arg(long)]
    area: PathBuf,

    /// JSON planner config; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also plan a return leg from this point ("lat,lon")
    #[arg(long, conflicts_with = "random_return")]
    return_from: Option<String>,

    /// Also plan a return leg from a random point inside the survey area
    #[arg(long, default_value_t = false)]
    random_return: bool,

    /// Seed for --random-return
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct Output {
    mission: MissionPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_leg: Option<PlannedPath>,
}

fn main() -> Result<()> {
    init_tracing("plan_mission=info")?;
    let args = Args::parse();

    let config: PlannerConfig = load_config(args.config.as_deref())?;
    let area = load_area(&args.area)?;

    let mission = plan_mission(&area, &config)?;
    tracing::info!(
        "Mission: {} approach waypoints ({} nodes expanded), {} coverage waypoints, {} processing spots",
        mission.approach.len(),
        mission.nodes_expanded,
        mission.coverage.len(),
        mission.processing_spots.len()
    );

    let return_from = match (&args.return_from, args.random_return) {
        (Some(text), _) => Some(parse_latlon(text)?),
        (None, true) => {
            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            Some(random_survey_target(&area, &config, &mut rng)?)
        }
        (None, false) => None,
    };

    let return_leg = match return_from {
        Some(from) => {
            let leg = plan_return(&area, from, &config)?;
            tracing::info!(
                "Return leg from ({:.6}, {:.6}): {} waypoints from {} raw cells",
                from.lat,
                from.lon,
                leg.waypoints.len(),
                leg.raw_points
            );
            Some(leg)
        }
        None => None,
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&Output {
            mission,
            return_leg
        })?
    );
    Ok(())
}
