/// Integer identifier of an image, unique within one annotation document.
pub type ImageId = i64;

/// Integer identifier of an object class.
pub type CategoryId = i64;

// Struct to hold processing statistics for the batch tools
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub images_written: usize,
    pub annotations_written: usize,
    pub orphaned_annotations: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_images(&mut self) {
        self.images_written += 1;
    }

    pub fn add_annotations(&mut self, count: usize) {
        self.annotations_written += count;
    }

    pub fn print_summary(&self) {
        log::info!("=== Processing Summary ===");
        log::info!("Images written: {}", self.images_written);
        log::info!("Annotations written: {}", self.annotations_written);
        if self.orphaned_annotations > 0 {
            log::warn!(
                "Skipped annotations referencing unknown images: {}",
                self.orphaned_annotations
            );
        }
    }
}
