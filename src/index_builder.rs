//! Build the index of a COCO annotation document

use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::coco::AnnotationDocument;
use crate::error::{Error, Result};
use crate::index_file::{IndexRow, IndexTable, IndexWriter};
use crate::types::ProcessingStats;
use crate::utils::create_progress_bar;

/// Compute one index row per image, in `images` order.
///
/// The table has columns for every category the document defines and every
/// category an annotation uses. Images without annotations get a row with no
/// categories. Annotations that reference unknown images are skipped; their
/// count is returned alongside.
pub fn build_table(document: &AnnotationDocument) -> (IndexTable, usize) {
    let grouped = document.group_by_image();
    let rows = grouped
        .groups
        .iter()
        .map(|group| {
            IndexRow::from_annotations(group.image.id(), group.annotations.iter().copied())
        })
        .collect();
    let table = IndexTable::new(document.defined_categories().iter().copied(), rows);
    (table, grouped.orphaned)
}

/// Build the index of the document at `path` and write it to `output_path`
pub fn create_index(path: &Path, output_path: &Path, delimiter: u8) -> Result<ProcessingStats> {
    info!("Reading annotations from {}", path.display());
    let document = AnnotationDocument::open(path)?;
    info!(
        "Loaded {} images and {} annotations",
        document.images().len(),
        document.annotations().len()
    );

    let (table, orphaned) = build_table(&document);
    info!("Indexing {} categories", table.categories().len());
    let mut stats = ProcessingStats::new();
    stats.orphaned_annotations = orphaned;

    let file = File::create(output_path).map_err(|e| Error::io(output_path, e))?;
    let write_error = |source: Error| Error::IndexWrite {
        path: output_path.to_path_buf(),
        source: Box::new(source),
    };
    let mut writer = IndexWriter::new(BufWriter::new(file), delimiter, table.categories())
        .map_err(write_error)?;

    let pb = create_progress_bar(table.rows().len() as u64, "Index");
    for row in table.rows() {
        writer.write_row(row).map_err(write_error)?;
        stats.increment_images();
        stats.add_annotations(row.num_instances());
        pb.inc(1);
    }
    writer.flush().map_err(write_error)?;
    pb.finish_with_message("Index complete");

    info!("Wrote {}", output_path.display());
    Ok(stats)
}
