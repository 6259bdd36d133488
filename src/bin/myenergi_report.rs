use std::{error::Error, path::Path, path::PathBuf};

use clap::Parser;
use jiff::Zoned;
use log::{error, info};
use myenergi_report::{
    config::Config, interval::month::Month, myenergi::client::MyenergiClient,
    report::HourlyReport,
};

#[derive(Parser, Debug)]
#[command(version, about = "Retrieve hourly Zappi/Eddi data from the myenergi servers", long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Month to retrieve, e.g. 2024-03.  Can be repeated.
    #[arg(short, long)]
    month: Vec<Month>,

    /// First month of a range, e.g. 2023-11
    #[arg(long, requires = "to")]
    from: Option<Month>,

    /// Last month of a range, inclusive
    #[arg(long, requires = "from")]
    to: Option<Month>,

    /// Output CSV file
    #[arg(short, long, default_value = "MyEnergi_Data.csv")]
    output: PathBuf,

    /// More debug messages
    #[arg(short, long)]
    verbose: bool,
}

/// Months asked for on the command line, in chronological order.  Defaults to
/// the current month in the reporting timezone.
fn selected_months(args: &Args, config: &Config) -> Result<Vec<Month>, Box<dyn Error>> {
    let mut months = args.month.clone();
    if let (Some(from), Some(to)) = (args.from, args.to) {
        if from > to {
            return Err(format!("--from {} is after --to {}", from, to).into());
        }
        months.extend(from.up_to(to));
    }
    if months.is_empty() {
        let today = Zoned::now().with_time_zone(config.timezone.clone()).date();
        months.push(Month::containing(today));
    }
    months.sort();
    months.dedup();
    Ok(months)
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
    info!("API key: {} chars", config.credentials.password.len());
    info!("Device id: {} ({})", config.device, config.device.class());
    info!("Timezone: {}", config.timezone_name());

    let months = selected_months(&args, &config)?;
    info!(
        "Months: {}",
        months.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ")
    );

    let client = MyenergiClient::connect(&config)?;
    let mut report = HourlyReport::new(config.device.clone());
    report.collect(&client, &months, &config.timezone)?;

    report.write_csv(&args.output, config.decimal_separator)?;
    println!("{}", report.summary_table());
    if !report.failed().is_empty() {
        error!("Failed to retrieve months: {}", report.failed_months());
    }

    Ok(())
}
