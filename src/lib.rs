//! COCO annotation dataset tools
//!
//! This library splits COCO annotation files into one file per image, builds an
//! index of the instance counts and area and position statistics of every
//! image, and queries that index.

pub mod coco;
pub mod config;
pub mod error;
pub mod index;
pub mod index_builder;
pub mod index_file;
pub mod split;
pub mod stats;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use coco::{AnnotationDocument, AnnotationRecord, ImageAnnotations, ImageRecord, Instance};
pub use config::{IndexArgs, QueryArgs, SplitArgs};
pub use error::{Error, Result};
pub use index::CocoIndex;
pub use index_builder::{build_table, create_index};
pub use index_file::{read_index, write_index, IndexRow, IndexTable, DEFAULT_DELIMITER};
pub use split::{split_annotations, split_document, split_file_path};
pub use stats::{AreaStats, InstanceStats, PositionStats};
pub use types::{CategoryId, ImageId, ProcessingStats};
