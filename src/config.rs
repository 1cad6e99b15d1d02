use clap::Parser;
use std::path::PathBuf;

use crate::types::{CategoryId, ImageId};

/// Split a single COCO annotations file into one annotations file per image.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct SplitArgs {
    /// The path to the single JSON file containing COCO style annotations
    pub path: PathBuf,

    /// The directory to write the per-image annotation files to
    pub output_dir: PathBuf,
}

/// Build an index of the instance statistics of each image of a COCO annotations file.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct IndexArgs {
    /// The path to the single JSON file containing COCO style annotations
    pub path: PathBuf,

    /// The path to write the index to
    pub output_path: PathBuf,

    /// Column separator of the index file
    #[arg(long = "sep", default_value = ",", value_parser = validate_separator)]
    pub sep: u8,
}

/// Query an index built by create_index and print the matching image ids.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct QueryArgs {
    /// The path to the index file
    pub index_path: PathBuf,

    /// Column separator of the index file
    #[arg(long = "sep", default_value = ",", value_parser = validate_separator)]
    pub sep: u8,

    /// Only images containing at least one of these classes
    #[arg(long = "classes", value_delimiter = ',', allow_negative_numbers = true)]
    pub classes: Vec<CategoryId>,

    /// Minimum number of instances of every given class (inclusive)
    #[arg(long = "lower", requires = "classes")]
    pub lower: Option<usize>,

    /// Maximum number of instances of every given class (exclusive)
    #[arg(long = "upper", requires = "classes")]
    pub upper: Option<usize>,

    /// Image ids to remove before querying
    #[arg(long = "exclude", value_delimiter = ',', allow_negative_numbers = true)]
    pub exclude: Vec<ImageId>,
}

// Validate that the separator is one ASCII character usable as a CSV delimiter
pub(crate) fn validate_separator(s: &str) -> Result<u8, String> {
    if s == "\\t" {
        return Ok(b'\t');
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && !matches!(c, '"' | '\r' | '\n') => Ok(c as u8),
        _ => Err(
            "SEP must be a single ASCII character other than '\"' or a line break".to_string(),
        ),
    }
}
