use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use coco_index::{split_annotations, SplitArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = SplitArgs::parse();

    if !args.path.is_file() {
        error!(
            "The specified annotations file does not exist: {}",
            args.path.display()
        );
        return ExitCode::FAILURE;
    }

    info!("Starting the split process...");

    match split_annotations(&args.path, &args.output_dir) {
        Ok(stats) => {
            stats.print_summary();
            info!("Split process completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to split annotations: {}", e);
            ExitCode::FAILURE
        }
    }
}
