use std::{error::Error, path::Path};

use clap::Parser;
use log::info;
use myenergi_report::{config::Config, myenergi::client::resolve_api_endpoint};

#[derive(Parser, Debug)]
#[command(version, about = "Get the myenergi API server of the hub", long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// More debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    dotenvy::from_path(Path::new(format!(".env/{}.env", args.env).as_str()))?;
    let config = Config::from_env()?;
    info!("Serial number: {}", config.credentials.user_name);
    info!("Director: {}", config.director_url);

    let server = resolve_api_endpoint(&config.director_url, &config.credentials)?;
    println!("API server: {}", server);
    Ok(())
}
