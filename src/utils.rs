use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Read and parse a JSON document from a file stream.
/// The file is parsed directly from a buffered reader instead of loading the
/// whole file into memory first.
pub fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        if source.is_io() {
            Error::io(path, source.into())
        } else {
            Error::Json {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Serialize `value` as compact JSON into `path`, replacing any existing file
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, value).map_err(|source| {
        if source.is_io() {
            Error::io(path, source.into())
        } else {
            Error::Json {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    writer.flush().map_err(|e| Error::io(path, e))
}

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(&format!(
        "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
        label
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Make sure the output directory exists and return its path.
/// Existing contents are left in place; files written later overwrite their
/// previous versions.
pub fn create_output_directory(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        log::debug!("Writing into existing directory {}", path.display());
    } else {
        fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    }
    Ok(path.to_path_buf())
}
