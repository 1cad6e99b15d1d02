//! Split one COCO annotation document into one document per image

use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::coco::{AnnotationDocument, AnnotationRecord, Fields, ImageRecord};
use crate::error::Result;
use crate::types::{ImageId, ProcessingStats};
use crate::utils::{create_output_directory, create_progress_bar, write_json};

/// Per-image view of a document, serialized with the same top-level shape as
/// its source: `images`, `annotations`, then every other top-level field.
#[derive(Debug, Serialize)]
struct SplitDocument<'a> {
    images: [&'a ImageRecord; 1],
    annotations: &'a [&'a AnnotationRecord],
    #[serde(flatten)]
    extra: &'a Fields,
}

/// Path of the per-image document for `image_id` inside `output_dir`
pub fn split_file_path(output_dir: &Path, image_id: ImageId) -> PathBuf {
    output_dir.join(format!("{}.json", image_id))
}

/// Write one document per image of `document` into `output_dir`.
///
/// Existing files are overwritten, so running twice on the same input gives
/// identical output. A failed write aborts the run and may leave the files of
/// earlier images in place.
pub fn split_document(
    document: &AnnotationDocument,
    output_dir: &Path,
) -> Result<ProcessingStats> {
    let output_dir = create_output_directory(output_dir)?;
    let grouped = document.group_by_image();

    let mut stats = ProcessingStats::new();
    stats.orphaned_annotations = grouped.orphaned;

    let pb = create_progress_bar(grouped.groups.len() as u64, "Split");
    for group in &grouped.groups {
        let path = split_file_path(&output_dir, group.image.id());
        let split = SplitDocument {
            images: [group.image],
            annotations: &group.annotations,
            extra: document.extra_fields(),
        };
        write_json(&path, &split)?;
        debug!(
            "Wrote {} ({} annotations)",
            path.display(),
            group.annotations.len()
        );

        stats.increment_images();
        stats.add_annotations(group.annotations.len());
        pb.inc(1);
    }
    pb.finish_with_message("Split complete");

    Ok(stats)
}

/// Read the document at `path` and split it into `output_dir`
pub fn split_annotations(path: &Path, output_dir: &Path) -> Result<ProcessingStats> {
    info!("Reading annotations from {}", path.display());
    let document = AnnotationDocument::open(path)?;
    info!(
        "Loaded {} images and {} annotations",
        document.images().len(),
        document.annotations().len()
    );

    split_document(&document, output_dir)
}
