use clap::Parser;
use log::{error, info};
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use coco_index::{CocoIndex, QueryArgs};

fn main() -> ExitCode {
    // Logs go to stderr, matching image ids go to stdout
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = QueryArgs::parse();

    let mut index = match CocoIndex::open_with_delimiter(&args.index_path, args.sep) {
        Ok(index) => index,
        Err(e) => {
            error!("Failed to load index: {}", e);
            return ExitCode::FAILURE;
        }
    };

    index.remove(args.exclude.iter().copied());

    let image_ids = if args.classes.is_empty() {
        index.get_images()
    } else if args.lower.is_some() || args.upper.is_some() {
        index.get_images_with_bounded_num_instances(&args.classes, args.lower, args.upper)
    } else {
        index.get_images_with_classes(&args.classes)
    };
    info!("{} matching images", image_ids.len());

    let mut out = BufWriter::new(io::stdout().lock());
    let written = image_ids
        .iter()
        .try_for_each(|image_id| writeln!(out, "{}", image_id))
        .and_then(|_| out.flush());
    if let Err(e) = written {
        error!("Failed to write results: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
