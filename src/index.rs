//! In-memory class-membership index
//!
//! Example usage:
//!
//! ```no_run
//! use coco_index::CocoIndex;
//!
//! let mut index = CocoIndex::open("index.csv")?;
//!
//! // images that contain at least one of classes 1, 3 or 5
//! let with_classes = index.get_images_with_classes(&[1, 3, 5]);
//!
//! // images with 1 <= (instances of class 1) < 4
//! let bounded = index.get_images_with_bounded_num_instances(&[1], Some(1), Some(4));
//!
//! index.remove(with_classes);
//! index.keep(bounded);
//! let remaining = index.get_images();
//! # Ok::<(), coco_index::Error>(())
//! ```

use log::info;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::index_file::{read_index, IndexRow, IndexTable, DEFAULT_DELIMITER};
use crate::types::{CategoryId, ImageId};

/// Loaded index plus the set of images still active in this session.
///
/// [`remove`](Self::remove) and [`keep`](Self::keep) only narrow the active
/// set; the loaded rows never change. A removed image cannot be restored, load
/// a new index instead. Queries return image ids in index-file order.
#[derive(Debug, Clone)]
pub struct CocoIndex {
    classes: BTreeSet<CategoryId>,
    rows: Vec<IndexRow>,
    positions: HashMap<ImageId, usize>,
    active: HashSet<ImageId>,
}

impl CocoIndex {
    /// Load a comma-delimited index file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_delimiter(path, DEFAULT_DELIMITER)
    }

    pub fn open_with_delimiter(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let index = Self::from_reader(BufReader::new(file), delimiter)?;
        info!("Loaded {} images from {}", index.rows.len(), path.display());
        Ok(index)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        Self::from_table(read_index(reader, delimiter)?)
    }

    /// Build an index from rows, every image active. Its classes are the
    /// categories present in the rows. Image ids must be unique.
    pub fn from_rows(rows: Vec<IndexRow>) -> Result<Self> {
        Self::from_table(IndexTable::new(std::iter::empty(), rows))
    }

    /// Build an index from a table, every image active. Image ids must be
    /// unique.
    pub fn from_table(table: IndexTable) -> Result<Self> {
        let (classes, rows) = table.into_parts();

        let mut positions = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if positions.insert(row.image_id(), i).is_some() {
                return Err(Error::MalformedIndex {
                    row: i + 1,
                    reason: format!("image id {} appears more than once", row.image_id()),
                });
            }
        }
        let active = positions.keys().copied().collect();

        Ok(Self {
            classes,
            rows,
            positions,
            active,
        })
    }

    fn active_rows(&self) -> impl Iterator<Item = &IndexRow> + '_ {
        self.rows
            .iter()
            .filter(move |row| self.active.contains(&row.image_id()))
    }

    /// Image ids still active
    pub fn get_images(&self) -> Vec<ImageId> {
        self.active_rows().map(IndexRow::image_id).collect()
    }

    /// Every category the index has columns for. This includes categories
    /// no image contains and does not shrink when images are removed.
    pub fn get_classes(&self) -> BTreeSet<CategoryId> {
        self.classes.clone()
    }

    /// Active images that contain at least one of `classes`
    pub fn get_images_with_classes(&self, classes: &[CategoryId]) -> Vec<ImageId> {
        self.active_rows()
            .filter(|row| row.has_any_of(classes))
            .map(IndexRow::image_id)
            .collect()
    }

    /// Active images where, for every class in `classes`,
    /// `lower <= instances < upper`. Missing classes count as zero instances
    /// and a missing bound is unconstrained.
    pub fn get_images_with_bounded_num_instances(
        &self,
        classes: &[CategoryId],
        lower: Option<usize>,
        upper: Option<usize>,
    ) -> Vec<ImageId> {
        self.active_rows()
            .filter(|row| {
                classes.iter().all(|&class_id| {
                    let count = row.instances_of(class_id);
                    lower.map_or(true, |lower| count >= lower)
                        && upper.map_or(true, |upper| count < upper)
                })
            })
            .map(IndexRow::image_id)
            .collect()
    }

    /// Drop `image_ids` from the active set. Unknown or already removed ids are
    /// ignored.
    pub fn remove(&mut self, image_ids: impl IntoIterator<Item = ImageId>) {
        for image_id in image_ids {
            self.active.remove(&image_id);
        }
    }

    /// Keep only the active images listed in `image_ids`
    pub fn keep(&mut self, image_ids: impl IntoIterator<Item = ImageId>) {
        let keep: HashSet<ImageId> = image_ids.into_iter().collect();
        self.active.retain(|image_id| keep.contains(image_id));
    }

    /// Number of active images
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Whether `image_id` is still active
    pub fn contains(&self, image_id: ImageId) -> bool {
        self.active.contains(&image_id)
    }

    /// Loaded row of `image_id`, whether or not it is still active
    pub fn row(&self, image_id: ImageId) -> Option<&IndexRow> {
        self.positions.get(&image_id).map(|&i| &self.rows[i])
    }
}
