use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process;

use tracking_prep::config::{Config, FORECAST_FILE, TRACKING_FILE};
use tracking_prep::data_io::{open_dataset, AttrValue};
use tracking_prep::pipeline::{
    derive_sea_level_pressure, reconstruct_time_axis, run_pipeline, RunArtifact,
};

fn main() {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("fix-time", sub_matches)) => {
            if let Err(e) = run_fix_time(sub_matches) {
                eprintln!("✗ Time axis reconstruction failed: {}", e);
                process::exit(1);
            }
        }
        Some(("slp", sub_matches)) => {
            if let Err(e) = run_slp(sub_matches) {
                eprintln!("✗ Sea level pressure derivation failed: {}", e);
                process::exit(1);
            }
        }
        Some(("run", sub_matches)) => {
            if let Err(e) = run_full(sub_matches) {
                eprintln!("✗ Pipeline failed: {}", e);
                process::exit(1);
            }
        }
        Some(("inspect", sub_matches)) => {
            if let Err(e) = run_inspect(sub_matches) {
                eprintln!("✗ Inspection failed: {}", e);
                process::exit(1);
            }
        }
        _ => {
            eprintln!("Please specify a subcommand. Use --help for more information.");
            process::exit(1);
        }
    }
}

fn run_fix_time(matches: &ArgMatches) -> Result<(), String> {
    let directory = matches.get_one::<String>("directory").unwrap();
    let mut config = Config::for_run(directory.as_str());
    config.keep_input = matches.get_flag("keep-input");
    config.validate()?;

    let artifact = RunArtifact::new(config.run_dir.join(FORECAST_FILE));
    reconstruct_time_axis(&config, artifact).map_err(|e| e.to_string())?;
    println!("Time axis reconstruction completed");
    Ok(())
}

fn run_slp(matches: &ArgMatches) -> Result<(), String> {
    let directory = matches.get_one::<String>("directory").unwrap();
    let mut config = Config::for_run(directory.as_str());
    if let Some(path) = matches.get_one::<String>("orography") {
        config.orography_path = PathBuf::from(path);
    }
    config.validate()?;

    let artifact = RunArtifact::new(config.run_dir.join(TRACKING_FILE));
    derive_sea_level_pressure(&config, &artifact).map_err(|e| e.to_string())?;
    println!("Sea level pressure derivation completed");
    Ok(())
}

fn run_full(matches: &ArgMatches) -> Result<(), String> {
    let directory = matches.get_one::<String>("directory").unwrap();
    let mut config = Config::for_run(directory.as_str());
    if let Some(path) = matches.get_one::<String>("orography") {
        config.orography_path = PathBuf::from(path);
    }
    config.keep_input = matches.get_flag("keep-input");
    config.validate()?;

    let artifact = run_pipeline(&config).map_err(|e| e.to_string())?;
    println!("Pipeline completed: {}", artifact.path().display());
    Ok(())
}

fn run_inspect(matches: &ArgMatches) -> Result<(), String> {
    let file = matches.get_one::<String>("file").unwrap();
    let path = Path::new(file);
    let ds = open_dataset(path).map_err(|e| e.to_string())?;

    println!("File: {}", path.display());
    println!("Dimensions:");
    for (name, len) in &ds.dims {
        println!("  {} = {}", name, len);
    }
    println!("Coordinates:");
    for coord in &ds.coords {
        match coord.attrs.get("units") {
            Some(AttrValue::Text(units)) => println!(
                "  {} ({} values, units: {})",
                coord.name,
                coord.values.len(),
                units
            ),
            _ => println!("  {} ({} values)", coord.name, coord.values.len()),
        }
    }
    println!("Variables:");
    for var in &ds.vars {
        let dims = var.dims.join(", ");
        match var.attrs.get("units") {
            Some(AttrValue::Text(units)) => {
                println!("  {} [{}] (units: {})", var.name, dims, units)
            }
            _ => println!("  {} [{}]", var.name, dims),
        }
    }
    println!("Global attributes: {}", ds.attrs.len());
    Ok(())
}

fn build_cli() -> Command {
    let directory_arg = Arg::new("directory")
        .value_name("DIRECTORY")
        .help("Forecast run directory")
        .required(true);
    let orography_arg = Arg::new("orography")
        .long("orography")
        .value_name("FILE")
        .help("Reference file holding the HGTsfc surface height");
    let keep_input_arg = Arg::new("keep-input")
        .long("keep-input")
        .help("Keep the raw input file instead of deleting it")
        .action(ArgAction::SetTrue);

    Command::new("tracking_prep")
        .version("0.1.0")
        .about("Post-processing for autoregressive forecast output: rebuild the time axis and derive sea level pressure for tracking")
        .subcommand_required(true)
        .subcommand(
            Command::new("fix-time")
                .about("Rebuild the forecast time axis and replace the raw output file")
                .arg(directory_arg.clone())
                .arg(keep_input_arg.clone()),
        )
        .subcommand(
            Command::new("slp")
                .about("Derive sea level pressure from the time-fixed file")
                .arg(directory_arg.clone())
                .arg(orography_arg.clone()),
        )
        .subcommand(
            Command::new("run")
                .about("Run both stages over a forecast run directory")
                .arg(directory_arg)
                .arg(orography_arg)
                .arg(keep_input_arg),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the structure of a NetCDF file")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("NetCDF file to inspect")
                        .required(true),
                ),
        )
}
