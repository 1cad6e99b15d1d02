//! COCO annotation document model
//!
//! Image and annotation records keep every field of the source document, in
//! source order, so that split output reproduces them verbatim. Only the
//! identifiers the tools work with are extracted, and they are checked for the
//! whole document before anything is written.

use log::{debug, warn};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::error::{Error, Result};
use crate::stats::InstanceStats;
use crate::types::{CategoryId, ImageId};
use crate::utils::read_json;

/// Raw JSON fields of a record or of the document's top level
pub type Fields = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct RawDocument {
    images: Vec<Fields>,
    annotations: Vec<Fields>,
    #[serde(flatten)]
    extra: Fields,
}

fn malformed(message: String) -> Error {
    Error::MalformedDocument(message)
}

fn integer_field(fields: &Fields, key: &str) -> Option<i64> {
    fields.get(key).and_then(Value::as_i64)
}

/// An entry of the `images` sequence
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    id: ImageId,
    fields: Fields,
}

impl ImageRecord {
    fn from_fields(position: usize, fields: Fields) -> Result<Self> {
        let id = integer_field(&fields, "id")
            .ok_or_else(|| malformed(format!("images[{}] has no integer `id`", position)))?;
        Ok(Self { id, fields })
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl Serialize for ImageRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// One object instance: a plain annotation, or one segment of a panoptic
/// annotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub category_id: CategoryId,
    pub area: Option<f64>,
    /// `[x, y, width, height]`
    pub bbox: Option<[f64; 4]>,
    pub is_crowd: bool,
}

impl Instance {
    pub fn new(category_id: CategoryId) -> Self {
        Self {
            category_id,
            area: None,
            bbox: None,
            is_crowd: false,
        }
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    // `context` names the record in error messages, e.g. `annotations[3]`.
    // Missing or null `area`, `bbox` and `iscrowd` are allowed.
    fn from_fields(context: &str, fields: &Fields) -> Result<Self> {
        let category_id = integer_field(fields, "category_id")
            .ok_or_else(|| malformed(format!("{} has no integer `category_id`", context)))?;

        let area = match fields.get("area") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_f64()
                    .ok_or_else(|| malformed(format!("{}.area is not a number", context)))?,
            ),
        };

        let bbox = match fields.get("bbox") {
            None | Some(Value::Null) => None,
            Some(value) => Some(bbox_values(value).ok_or_else(|| {
                malformed(format!("{}.bbox is not an array of 4 numbers", context))
            })?),
        };

        let is_crowd = match fields.get("iscrowd") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(value) => match value.as_i64() {
                Some(0) => false,
                Some(1) => true,
                _ => return Err(malformed(format!("{}.iscrowd is not 0 or 1", context))),
            },
        };

        Ok(Self {
            category_id,
            area,
            bbox,
            is_crowd,
        })
    }
}

fn bbox_values(value: &Value) -> Option<[f64; 4]> {
    match value.as_array()?.as_slice() {
        [x, y, w, h] => Some([x.as_f64()?, y.as_f64()?, w.as_f64()?, h.as_f64()?]),
        _ => None,
    }
}

/// An entry of the `annotations` sequence.
///
/// Plain instance annotations describe a single [`Instance`]. Panoptic
/// annotations (Mapillary Vistas style) carry a `segments_info` array instead,
/// and every segment is one instance with its own `category_id`, `area`,
/// `bbox` and `iscrowd`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    image_id: ImageId,
    instances: Vec<Instance>,
    fields: Fields,
}

impl AnnotationRecord {
    fn from_fields(position: usize, fields: Fields) -> Result<Self> {
        let context = format!("annotations[{}]", position);
        let image_id = integer_field(&fields, "image_id")
            .ok_or_else(|| malformed(format!("{} has no integer `image_id`", context)))?;

        let instances = match fields.get("segments_info") {
            Some(segments) => segment_instances(&context, segments)?,
            None => vec![Instance::from_fields(&context, &fields)?],
        };

        Ok(Self {
            image_id,
            instances,
            fields,
        })
    }

    pub fn image_id(&self) -> ImageId {
        self.image_id
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Category of every instance this record describes, duplicates included
    pub fn category_ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.instances.iter().map(|instance| instance.category_id)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl Serialize for AnnotationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

fn segment_instances(context: &str, segments: &Value) -> Result<Vec<Instance>> {
    let segments = segments
        .as_array()
        .ok_or_else(|| malformed(format!("{}.segments_info is not an array", context)))?;

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let context = format!("{}.segments_info[{}]", context, i);
            let fields = segment
                .as_object()
                .ok_or_else(|| malformed(format!("{} is not an object", context)))?;
            Instance::from_fields(&context, fields)
        })
        .collect()
}

/// Ids of the `categories` entries. A document without `categories` defines
/// none.
fn parse_categories(extra: &Fields) -> Result<BTreeSet<CategoryId>> {
    let categories = match extra.get("categories") {
        None | Some(Value::Null) => return Ok(BTreeSet::new()),
        Some(categories) => categories
            .as_array()
            .ok_or_else(|| malformed("`categories` is not an array".to_string()))?,
    };

    categories
        .iter()
        .enumerate()
        .map(|(i, category)| {
            category
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| malformed(format!("categories[{}] has no integer `id`", i)))
        })
        .collect()
}

/// Annotations of one image, in document order
#[derive(Debug)]
pub struct ImageGroup<'a> {
    pub image: &'a ImageRecord,
    pub annotations: Vec<&'a AnnotationRecord>,
}

/// Result of grouping a document's annotations by image
#[derive(Debug)]
pub struct GroupedAnnotations<'a> {
    /// One group per image, in `images` order
    pub groups: Vec<ImageGroup<'a>>,
    /// Annotations whose `image_id` is not in `images`; they belong to no group
    pub orphaned: usize,
}

/// A validated COCO annotation document
#[derive(Debug, Clone)]
pub struct AnnotationDocument {
    images: Vec<ImageRecord>,
    annotations: Vec<AnnotationRecord>,
    categories: BTreeSet<CategoryId>,
    extra: Fields,
}

impl AnnotationDocument {
    /// Read and validate the document stored at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_value(read_json(path)?)
    }

    /// Validate an already parsed document.
    ///
    /// Fails when `images` or `annotations` is missing, when a record lacks its
    /// integer identifiers or carries an unreadable `area`, `bbox` or
    /// `iscrowd`, or when two images share an `id`.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw = RawDocument::deserialize(value).map_err(|e| malformed(e.to_string()))?;

        let images = raw
            .images
            .into_iter()
            .enumerate()
            .map(|(i, fields)| ImageRecord::from_fields(i, fields))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::with_capacity(images.len());
        for image in &images {
            if !seen.insert(image.id) {
                return Err(Error::DuplicateImage(image.id));
            }
        }

        let annotations = raw
            .annotations
            .into_iter()
            .enumerate()
            .map(|(i, fields)| AnnotationRecord::from_fields(i, fields))
            .collect::<Result<Vec<_>>>()?;

        let categories = parse_categories(&raw.extra)?;

        Ok(Self {
            images,
            annotations,
            categories,
            extra: raw.extra,
        })
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }

    /// Ids of the categories the document defines, whether used or not
    pub fn defined_categories(&self) -> &BTreeSet<CategoryId> {
        &self.categories
    }

    /// Top-level fields other than `images` and `annotations`
    pub fn extra_fields(&self) -> &Fields {
        &self.extra
    }

    /// Group annotations by image.
    ///
    /// Annotations that reference an image missing from `images` are skipped,
    /// counted in [`GroupedAnnotations::orphaned`] and reported with a warning.
    pub fn group_by_image(&self) -> GroupedAnnotations<'_> {
        let positions: HashMap<ImageId, usize> = self
            .images
            .iter()
            .enumerate()
            .map(|(i, image)| (image.id, i))
            .collect();

        let mut groups: Vec<ImageGroup<'_>> = self
            .images
            .iter()
            .map(|image| ImageGroup {
                image,
                annotations: Vec::new(),
            })
            .collect();

        let mut orphaned = 0;
        let mut unknown_ids = BTreeSet::new();
        for annotation in &self.annotations {
            match positions.get(&annotation.image_id) {
                Some(&position) => groups[position].annotations.push(annotation),
                None => {
                    orphaned += 1;
                    unknown_ids.insert(annotation.image_id);
                }
            }
        }

        if orphaned > 0 {
            warn!(
                "Skipping {} annotation(s) referencing {} image id(s) missing from `images`",
                orphaned,
                unknown_ids.len()
            );
            debug!("Unknown image ids: {:?}", unknown_ids);
        }

        GroupedAnnotations { groups, orphaned }
    }
}

/// The annotations of a single image, as written by the splitter
#[derive(Debug, Clone)]
pub struct ImageAnnotations {
    pub image: ImageRecord,
    pub annotations: Vec<AnnotationRecord>,
}

impl ImageAnnotations {
    /// Load a per-image document. It must hold exactly one image.
    pub fn open(path: &Path) -> Result<Self> {
        let AnnotationDocument {
            mut images,
            annotations,
            ..
        } = AnnotationDocument::open(path)?;

        if images.len() != 1 {
            return Err(malformed(format!(
                "{} holds {} images, expected exactly one",
                path.display(),
                images.len()
            )));
        }
        let image = images.remove(0);

        Ok(Self { image, annotations })
    }

    /// Every instance of the image, in annotation order
    pub fn instances(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.annotations.iter().flat_map(|a| a.instances().iter())
    }

    /// Distinct categories present in the image
    pub fn category_ids(&self) -> BTreeSet<CategoryId> {
        self.instances().map(|instance| instance.category_id).collect()
    }

    pub fn num_instances(&self) -> usize {
        self.instances().count()
    }

    /// Area of every instance, `None` where the record has no `area`
    pub fn areas(&self) -> Vec<Option<f64>> {
        self.instances().map(|instance| instance.area).collect()
    }

    /// `[x, y, width, height]` of every instance, `None` where the record has
    /// no `bbox`
    pub fn bboxes(&self) -> Vec<Option<[f64; 4]>> {
        self.instances().map(|instance| instance.bbox).collect()
    }

    /// Crowd flag of every instance. A missing `iscrowd` reads as `false`.
    pub fn is_crowds(&self) -> Vec<bool> {
        self.instances().map(|instance| instance.is_crowd).collect()
    }

    pub fn stats(&self) -> InstanceStats {
        InstanceStats::from_instances(self.instances())
    }
}
