use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use coco_index::{create_index, IndexArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = IndexArgs::parse();

    if !args.path.is_file() {
        error!(
            "The specified annotations file does not exist: {}",
            args.path.display()
        );
        return ExitCode::FAILURE;
    }

    info!("Starting index creation...");

    match create_index(&args.path, &args.output_path, args.sep) {
        Ok(stats) => {
            stats.print_summary();
            info!("Index creation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to create index: {}", e);
            ExitCode::FAILURE
        }
    }
}
