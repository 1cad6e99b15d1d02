//! CSV encoding of the index
//!
//! One row per image. The image columns come first:
//!
//! ```text
//! ImageID,NumInstances,NumCategories,TotalArea,MinArea,MeanArea,MaxArea,StdevArea,MeanX,MeanY,StdevX,StdevY
//! ```
//!
//! followed by one block per category, in ascending category order, holding
//! the same statistics for that category alone: `NumInstances_<id>`,
//! `TotalArea_<id>`, and so on up to `StdevY_<id>`. Every category of the
//! source document gets a block, including categories no image contains.
//!
//! Columns are looked up by name when reading, so their order does not matter
//! and unknown columns are ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::str::FromStr;

use crate::coco::{AnnotationRecord, Instance};
use crate::error::{Error, Result};
use crate::stats::{AreaStats, InstanceStats, PositionStats};
use crate::types::{CategoryId, ImageId};

/// Column delimiter used when none is configured
pub const DEFAULT_DELIMITER: u8 = b',';

const IMAGE_ID: &str = "ImageID";
const NUM_CATEGORIES: &str = "NumCategories";

// Image columns as named, category columns with a `_<id>` suffix
const STAT_COLUMNS: [&str; 10] = [
    "NumInstances",
    "TotalArea",
    "MinArea",
    "MeanArea",
    "MaxArea",
    "StdevArea",
    "MeanX",
    "MeanY",
    "StdevX",
    "StdevY",
];

/// Instance statistics of one image, overall and per category
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    image_id: ImageId,
    stats: InstanceStats,
    // Only categories with at least one instance
    categories: BTreeMap<CategoryId, InstanceStats>,
}

impl IndexRow {
    /// Row of an image without instances
    pub fn new(image_id: ImageId) -> Self {
        Self {
            image_id,
            stats: InstanceStats::default(),
            categories: BTreeMap::new(),
        }
    }

    pub fn from_instances<'a, I>(image_id: ImageId, instances: I) -> Self
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        let instances: Vec<&Instance> = instances.into_iter().collect();

        let mut by_category: BTreeMap<CategoryId, Vec<&Instance>> = BTreeMap::new();
        for &instance in &instances {
            by_category
                .entry(instance.category_id)
                .or_default()
                .push(instance);
        }

        Self {
            image_id,
            stats: InstanceStats::from_instances(instances.iter().copied()),
            categories: by_category
                .into_iter()
                .map(|(category_id, instances)| {
                    (category_id, InstanceStats::from_instances(instances))
                })
                .collect(),
        }
    }

    /// Build the row of `image_id` from the annotations that reference it
    pub fn from_annotations<'a, I>(image_id: ImageId, annotations: I) -> Self
    where
        I: IntoIterator<Item = &'a AnnotationRecord>,
    {
        Self::from_instances(
            image_id,
            annotations
                .into_iter()
                .flat_map(|annotation| annotation.instances().iter()),
        )
    }

    pub fn image_id(&self) -> ImageId {
        self.image_id
    }

    /// Statistics over every instance of the image
    pub fn stats(&self) -> &InstanceStats {
        &self.stats
    }

    /// Statistics over the instances of `category_id`, `None` when absent
    pub fn category_stats(&self, category_id: CategoryId) -> Option<&InstanceStats> {
        self.categories.get(&category_id)
    }

    /// Distinct categories present, ascending
    pub fn categories(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.categories.keys().copied()
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn num_instances(&self) -> usize {
        self.stats.num_instances
    }

    /// Number of instances of `category_id`, zero when absent
    pub fn instances_of(&self, category_id: CategoryId) -> usize {
        self.categories
            .get(&category_id)
            .map_or(0, |stats| stats.num_instances)
    }

    /// Whether at least one of `category_ids` is present
    pub fn has_any_of(&self, category_ids: &[CategoryId]) -> bool {
        category_ids
            .iter()
            .any(|category_id| self.categories.contains_key(category_id))
    }
}

/// Index rows together with the categories the index has columns for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexTable {
    categories: BTreeSet<CategoryId>,
    rows: Vec<IndexRow>,
}

impl IndexTable {
    /// Table over `rows` with columns for every category in `categories` and
    /// every category present in a row
    pub fn new(categories: impl IntoIterator<Item = CategoryId>, rows: Vec<IndexRow>) -> Self {
        let mut categories: BTreeSet<CategoryId> = categories.into_iter().collect();
        for row in &rows {
            categories.extend(row.categories());
        }
        Self { categories, rows }
    }

    pub fn categories(&self) -> &BTreeSet<CategoryId> {
        &self.categories
    }

    pub fn rows(&self) -> &[IndexRow] {
        &self.rows
    }

    pub fn into_parts(self) -> (BTreeSet<CategoryId>, Vec<IndexRow>) {
        (self.categories, self.rows)
    }
}

fn header(categories: &BTreeSet<CategoryId>) -> Vec<String> {
    let mut columns = vec![
        IMAGE_ID.to_string(),
        STAT_COLUMNS[0].to_string(),
        NUM_CATEGORIES.to_string(),
    ];
    columns.extend(STAT_COLUMNS[1..].iter().map(|name| name.to_string()));
    for category_id in categories {
        columns.extend(
            STAT_COLUMNS
                .iter()
                .map(|name| format!("{}_{}", name, category_id)),
        );
    }
    columns
}

fn stat_fields(stats: &InstanceStats) -> [String; 10] {
    let InstanceStats {
        num_instances,
        area,
        position,
    } = stats;
    [
        num_instances.to_string(),
        area.total.to_string(),
        area.min.to_string(),
        area.mean.to_string(),
        area.max.to_string(),
        area.stdev.to_string(),
        position.mean_x.to_string(),
        position.mean_y.to_string(),
        position.stdev_x.to_string(),
        position.stdev_y.to_string(),
    ]
}

/// Writes index rows, header first
pub struct IndexWriter<W: Write> {
    writer: csv::Writer<W>,
    categories: BTreeSet<CategoryId>,
    rows_written: usize,
}

impl<W: Write> IndexWriter<W> {
    /// Start an index with a column block for each of `categories`
    pub fn new(writer: W, delimiter: u8, categories: &BTreeSet<CategoryId>) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(writer);
        writer.write_record(header(categories))?;
        Ok(Self {
            writer,
            categories: categories.clone(),
            rows_written: 0,
        })
    }

    /// Fails when the row holds a category the header has no columns for
    pub fn write_row(&mut self, row: &IndexRow) -> Result<()> {
        if let Some(category_id) = row.categories().find(|c| !self.categories.contains(c)) {
            return Err(Error::MalformedIndex {
                row: self.rows_written + 1,
                reason: format!(
                    "image {} holds category {}, which has no columns",
                    row.image_id, category_id
                ),
            });
        }

        let [num_instances, image_stats @ ..] = stat_fields(&row.stats);
        let mut record = vec![
            row.image_id.to_string(),
            num_instances,
            row.num_categories().to_string(),
        ];
        record.extend(image_stats);
        for category_id in &self.categories {
            let stats = row.categories.get(category_id).copied().unwrap_or_default();
            record.extend(stat_fields(&stats));
        }

        self.writer.write_record(&record)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Write `table` as a complete index
pub fn write_index<W: Write>(table: &IndexTable, writer: W, delimiter: u8) -> Result<()> {
    let mut writer = IndexWriter::new(writer, delimiter, &table.categories)?;
    for row in &table.rows {
        writer.write_row(row)?;
    }
    writer.flush()
}

// Positions of the columns of one block of statistics
type StatColumns = [usize; STAT_COLUMNS.len()];

/// Column positions resolved from an index header
struct Layout {
    image_id: usize,
    num_categories: usize,
    image: StatColumns,
    categories: Vec<(CategoryId, StatColumns)>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| Error::MalformedIndexHeader(format!("missing column `{}`", name)))
        };
        let stat_columns = |suffix: &str| -> Result<StatColumns> {
            let mut columns = [0; STAT_COLUMNS.len()];
            for (column, name) in columns.iter_mut().zip(STAT_COLUMNS) {
                *column = find(&format!("{}{}", name, suffix))?;
            }
            Ok(columns)
        };

        let mut category_ids = BTreeSet::new();
        let prefix = format!("{}_", STAT_COLUMNS[0]);
        for header in headers.iter() {
            if let Some(category) = header.strip_prefix(&prefix) {
                let category_id = category.parse::<CategoryId>().map_err(|_| {
                    Error::MalformedIndexHeader(format!("invalid category column `{}`", header))
                })?;
                if !category_ids.insert(category_id) {
                    return Err(Error::MalformedIndexHeader(format!(
                        "column `{}` appears more than once",
                        header
                    )));
                }
            }
        }

        let mut categories = Vec::with_capacity(category_ids.len());
        for category_id in category_ids {
            categories.push((category_id, stat_columns(&format!("_{}", category_id))?));
        }

        Ok(Self {
            image_id: find(IMAGE_ID)?,
            num_categories: find(NUM_CATEGORIES)?,
            image: stat_columns("")?,
            categories,
        })
    }

    fn category_ids(&self) -> BTreeSet<CategoryId> {
        self.categories.iter().map(|&(id, _)| id).collect()
    }

    /// Decode the record found at 1-based data row `row`
    fn decode(&self, record: &csv::StringRecord, row: usize) -> Result<IndexRow> {
        let malformed = |reason: String| Error::MalformedIndex { row, reason };

        let image_id: ImageId = parse_field(record, self.image_id, IMAGE_ID, row)?;
        let num_categories: usize =
            parse_field(record, self.num_categories, NUM_CATEGORIES, row)?;
        let stats = parse_stats(record, &self.image, "", row)?;

        let mut categories = BTreeMap::new();
        let mut total: usize = 0;
        for &(category_id, ref columns) in &self.categories {
            let category = parse_stats(record, columns, &format!("_{}", category_id), row)?;
            total = total
                .checked_add(category.num_instances)
                .ok_or_else(|| malformed("instance count overflows".to_string()))?;
            if category.num_instances > 0 {
                categories.insert(category_id, category);
            }
        }

        if total != stats.num_instances {
            return Err(malformed(format!(
                "NumInstances is {} but the categories add up to {}",
                stats.num_instances, total
            )));
        }
        if categories.len() != num_categories {
            return Err(malformed(format!(
                "NumCategories is {} but {} categories have instances",
                num_categories,
                categories.len()
            )));
        }

        Ok(IndexRow {
            image_id,
            stats,
            categories,
        })
    }
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    column: usize,
    name: &str,
    row: usize,
) -> Result<T> {
    let value = record.get(column).unwrap_or("").trim();
    value.parse().map_err(|_| Error::MalformedIndex {
        row,
        reason: format!("invalid {} `{}`", name, value),
    })
}

fn parse_stats(
    record: &csv::StringRecord,
    columns: &StatColumns,
    suffix: &str,
    row: usize,
) -> Result<InstanceStats> {
    let name = format!("{}{}", STAT_COLUMNS[0], suffix);
    let num_instances = parse_field(record, columns[0], &name, row)?;

    let mut values = [0.0; STAT_COLUMNS.len() - 1];
    for (i, value) in values.iter_mut().enumerate() {
        let name = format!("{}{}", STAT_COLUMNS[i + 1], suffix);
        *value = parse_field(record, columns[i + 1], &name, row)?;
    }
    let [total, min, mean, max, stdev, mean_x, mean_y, stdev_x, stdev_y] = values;

    Ok(InstanceStats {
        num_instances,
        area: AreaStats {
            total,
            min,
            mean,
            max,
            stdev,
        },
        position: PositionStats {
            mean_x,
            mean_y,
            stdev_x,
            stdev_y,
        },
    })
}

/// Read a whole index, rows in file order
pub fn read_index<R: Read>(reader: R, delimiter: u8) -> Result<IndexTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);
    let layout = Layout::from_headers(reader.headers()?)?;

    let rows = reader
        .records()
        .enumerate()
        .map(|(i, record)| layout.decode(&record?, i + 1))
        .collect::<Result<Vec<_>>>()?;

    Ok(IndexTable {
        categories: layout.category_ids(),
        rows,
    })
}
