mod args;
mod dashboard;

use clap::Parser;
use log::{debug, warn};
use snafu::ErrorCompat;

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    debug!("args: {:?}", args);

    if let Err(e) = dashboard::run_dashboard(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&*e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
