use coco_index::{
    create_index, split_annotations, split_file_path, AreaStats, CocoIndex, Error,
    ImageAnnotations, InstanceStats, PositionStats,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

fn write_document(dir: &Path, document: &Value) -> PathBuf {
    let path = dir.join("instances.json");
    fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
    path
}

fn sample_document() -> Value {
    json!({
        "info": {"description": "test set", "version": "1.0"},
        "licenses": [{"id": 1, "name": "Unknown", "url": ""}],
        "images": [
            {"id": 1, "file_name": "P0001.png", "width": 800, "height": 600},
            {"id": 2, "file_name": "P0002.png", "width": 800, "height": 600},
            {"id": 3, "file_name": "P0003.png", "width": 800, "height": 600},
        ],
        "annotations": [
            {"id": 1, "image_id": 1, "category_id": 1, "area": 10.0, "bbox": [1, 2, 3, 4], "iscrowd": 0},
            {"id": 2, "image_id": 1, "category_id": 1, "area": 12.0, "bbox": [5, 6, 3, 4], "iscrowd": 0},
            {"id": 3, "image_id": 2, "category_id": 3, "area": 30.0, "bbox": [0, 0, 6, 5], "iscrowd": 0},
            {"id": 4, "image_id": 1, "category_id": 3, "area": 8.0, "bbox": [9, 9, 2, 4], "iscrowd": 1},
            {"id": 5, "image_id": 1, "category_id": 5, "area": 4.0, "bbox": [7, 7, 2, 2], "iscrowd": 0},
        ],
        "categories": [
            {"id": 1, "name": "plane", "supercategory": "vehicle"},
            {"id": 3, "name": "ship", "supercategory": "vehicle"},
            {"id": 5, "name": "harbor", "supercategory": "place"},
        ],
    })
}

fn categories(index: &CocoIndex, image_id: i64) -> BTreeSet<i64> {
    index.row(image_id).unwrap().categories().collect()
}

#[test]
fn test_split_annotation_counts_add_up() {
    let temp_dir = tempfile::tempdir().unwrap();
    let document = sample_document();
    let input = write_document(temp_dir.path(), &document);
    let output_dir = temp_dir.path().join("split");

    let stats = split_annotations(&input, &output_dir).unwrap();

    let total: usize = [1, 2, 3]
        .iter()
        .map(|&id| {
            ImageAnnotations::open(&split_file_path(&output_dir, id))
                .unwrap()
                .annotations
                .len()
        })
        .sum();
    assert_eq!(total, document["annotations"].as_array().unwrap().len());
    assert_eq!(stats.annotations_written, total);
    assert_eq!(stats.images_written, 3);
}

#[test]
fn test_split_output_keeps_top_level_shape() {
    let temp_dir = tempfile::tempdir().unwrap();
    let document = sample_document();
    let input = write_document(temp_dir.path(), &document);
    let output_dir = temp_dir.path().join("split");

    split_annotations(&input, &output_dir).unwrap();

    let text = fs::read_to_string(output_dir.join("2.json")).unwrap();
    let split: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(split["images"], json!([document["images"][1]]));
    assert_eq!(split["annotations"], json!([document["annotations"][2]]));
    assert_eq!(split["info"], document["info"]);
    assert_eq!(split["licenses"], document["licenses"]);
    assert_eq!(split["categories"], document["categories"]);

    let empty = ImageAnnotations::open(&output_dir.join("3.json")).unwrap();
    assert_eq!(empty.image.id(), 3);
    assert!(empty.annotations.is_empty());
}

#[test]
fn test_split_is_idempotent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(temp_dir.path(), &sample_document());
    let output_dir = temp_dir.path().join("split");

    split_annotations(&input, &output_dir).unwrap();
    let first: Vec<Vec<u8>> = (1..=3)
        .map(|id| fs::read(split_file_path(&output_dir, id)).unwrap())
        .collect();

    split_annotations(&input, &output_dir).unwrap();
    let second: Vec<Vec<u8>> = (1..=3)
        .map(|id| fs::read(split_file_path(&output_dir, id)).unwrap())
        .collect();

    assert_eq!(first, second);
    assert_eq!(fs::read_dir(&output_dir).unwrap().count(), 3);
}

#[test]
fn test_split_keeps_record_key_order() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("instances.json");
    fs::write(
        &input,
        r#"{"categories": [], "images": [{"width": 4, "id": 9}], "annotations": [{"category_id": 2, "image_id": 9}]}"#,
    )
    .unwrap();
    let output_dir = temp_dir.path().join("split");

    split_annotations(&input, &output_dir).unwrap();

    assert_eq!(
        fs::read_to_string(output_dir.join("9.json")).unwrap(),
        r#"{"images":[{"width":4,"id":9}],"annotations":[{"category_id":2,"image_id":9}],"categories":[]}"#
    );
}

#[test]
fn test_index_has_one_row_per_image() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(temp_dir.path(), &sample_document());
    let index_path = temp_dir.path().join("index.csv");

    create_index(&input, &index_path, b',').unwrap();
    let index = CocoIndex::open(&index_path).unwrap();

    assert_eq!(index.get_images(), vec![1, 2, 3]);
    assert_eq!(categories(&index, 1), BTreeSet::from([1, 3, 5]));
    assert_eq!(categories(&index, 2), BTreeSet::from([3]));
    assert!(categories(&index, 3).is_empty());
    assert_eq!(index.row(1).unwrap().instances_of(1), 2);
}

#[test]
fn test_index_statistics_survive_the_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(temp_dir.path(), &sample_document());
    let index_path = temp_dir.path().join("index.csv");

    create_index(&input, &index_path, b',').unwrap();
    let index = CocoIndex::open(&index_path).unwrap();

    let first = index.row(1).unwrap();
    assert_eq!(first.num_instances(), 4);
    assert_eq!(first.num_categories(), 3);
    assert_eq!(
        first.stats().area,
        AreaStats {
            total: 34.0,
            min: 4.0,
            mean: 8.5,
            max: 12.0,
            stdev: 8.75f64.sqrt(),
        }
    );

    let planes = first.category_stats(1).unwrap();
    assert_eq!(planes.num_instances, 2);
    assert_eq!(planes.area.total, 22.0);
    assert_eq!(planes.area.stdev, 1.0);
    assert_eq!(
        planes.position,
        PositionStats {
            mean_x: 3.0,
            mean_y: 4.0,
            stdev_x: 2.0,
            stdev_y: 2.0,
        }
    );

    assert_eq!(index.row(2).unwrap().stats().area.total, 30.0);
    assert_eq!(index.row(3).unwrap().stats(), &InstanceStats::default());
}

#[test]
fn test_index_keeps_categories_without_instances() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(
        temp_dir.path(),
        &json!({
            "images": [{"id": 1}],
            "annotations": [{"image_id": 1, "category_id": 1, "area": 3.5}],
            "categories": [{"id": 1}, {"id": 2}, {"id": 9}],
        }),
    );
    let index_path = temp_dir.path().join("index.csv");

    create_index(&input, &index_path, b',').unwrap();
    let index = CocoIndex::open(&index_path).unwrap();

    assert_eq!(index.get_classes(), BTreeSet::from([1, 2, 9]));
    assert!(index.get_images_with_classes(&[2, 9]).is_empty());
    assert_eq!(
        index.get_images_with_bounded_num_instances(&[9], None, Some(1)),
        vec![1]
    );
}

#[test]
fn test_split_image_exposes_instance_values() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(temp_dir.path(), &sample_document());
    let output_dir = temp_dir.path().join("split");

    split_annotations(&input, &output_dir).unwrap();
    let image = ImageAnnotations::open(&split_file_path(&output_dir, 1)).unwrap();

    assert_eq!(
        image.areas(),
        vec![Some(10.0), Some(12.0), Some(8.0), Some(4.0)]
    );
    assert_eq!(image.bboxes()[3], Some([7.0, 7.0, 2.0, 2.0]));
    assert_eq!(image.is_crowds(), vec![false, false, true, false]);
    assert_eq!(image.stats().area.total, 34.0);
}

#[test]
fn test_query_and_remove_on_built_index() {
    let temp_dir = tempfile::tempdir().unwrap();
    let document = json!({
        "images": [{"id": 10}, {"id": 20}, {"id": 30}],
        "annotations": [
            {"image_id": 10, "category_id": 1},
            {"image_id": 10, "category_id": 2},
            {"image_id": 20, "category_id": 3},
        ],
    });
    let input = write_document(temp_dir.path(), &document);
    let index_path = temp_dir.path().join("index.tsv");

    create_index(&input, &index_path, b'\t').unwrap();
    let mut index = CocoIndex::open_with_delimiter(&index_path, b'\t').unwrap();

    assert_eq!(index.get_images_with_classes(&[1, 3]), vec![10, 20]);

    index.remove([999]);
    assert_eq!(index.get_images(), vec![10, 20, 30]);

    index.remove([10]);
    assert_eq!(index.get_images(), vec![20, 30]);
    assert_eq!(index.get_images_with_classes(&[1, 3]), vec![20]);

    index.remove([10]);
    assert_eq!(index.get_images(), vec![20, 30]);
}

#[test]
fn test_empty_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(
        temp_dir.path(),
        &json!({"images": [], "annotations": [], "categories": []}),
    );
    let output_dir = temp_dir.path().join("split");
    let index_path = temp_dir.path().join("index.csv");

    let split_stats = split_annotations(&input, &output_dir).unwrap();
    let index_stats = create_index(&input, &index_path, b',').unwrap();

    assert_eq!(split_stats.images_written, 0);
    assert_eq!(fs::read_dir(&output_dir).unwrap().count(), 0);
    assert_eq!(index_stats.images_written, 0);
    assert!(CocoIndex::open(&index_path).unwrap().is_empty());
}

#[test]
fn test_unknown_image_references_are_skipped_and_counted() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(
        temp_dir.path(),
        &json!({
            "images": [{"id": 1}],
            "annotations": [
                {"image_id": 1, "category_id": 4},
                {"image_id": 2, "category_id": 4},
            ],
        }),
    );

    let split_stats = split_annotations(&input, &temp_dir.path().join("split")).unwrap();
    let index_stats = create_index(&input, &temp_dir.path().join("index.csv"), b',').unwrap();

    assert_eq!(split_stats.orphaned_annotations, 1);
    assert_eq!(split_stats.annotations_written, 1);
    assert_eq!(index_stats.orphaned_annotations, 1);
    assert_eq!(index_stats.annotations_written, 1);
}

#[test]
fn test_panoptic_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(
        temp_dir.path(),
        &json!({
            "images": [{"id": 1, "file_name": "a.jpg"}, {"id": 2, "file_name": "b.jpg"}],
            "annotations": [
                {"image_id": 1, "file_name": "a.png", "segments_info": [
                    {"id": 1, "category_id": 19, "area": 100},
                    {"id": 2, "category_id": 55, "area": 40},
                    {"id": 3, "category_id": 19, "area": 20},
                ]},
                {"image_id": 2, "file_name": "b.png", "segments_info": []},
            ],
        }),
    );
    let output_dir = temp_dir.path().join("split");
    let index_path = temp_dir.path().join("index.csv");

    split_annotations(&input, &output_dir).unwrap();
    create_index(&input, &index_path, b',').unwrap();

    let first = ImageAnnotations::open(&split_file_path(&output_dir, 1)).unwrap();
    assert_eq!(first.category_ids(), BTreeSet::from([19, 55]));
    assert_eq!(first.num_instances(), 3);

    let index = CocoIndex::open(&index_path).unwrap();
    assert_eq!(index.row(1).unwrap().instances_of(19), 2);
    assert_eq!(index.get_images_with_classes(&[55]), vec![1]);
    assert!(categories(&index, 2).is_empty());
}

#[test]
fn test_malformed_input_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_document(temp_dir.path(), &json!({"images": [{"id": 1}]}));

    let split_err = split_annotations(&input, &temp_dir.path().join("split")).unwrap_err();
    let index_err = create_index(&input, &temp_dir.path().join("index.csv"), b',').unwrap_err();

    assert!(matches!(split_err, Error::MalformedDocument(_)));
    assert!(matches!(index_err, Error::MalformedDocument(_)));
    assert!(!temp_dir.path().join("index.csv").exists());
}

#[test]
fn test_missing_input_names_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("nowhere.json");

    let err = create_index(&input, &temp_dir.path().join("index.csv"), b',').unwrap_err();

    assert!(matches!(err, Error::Io { .. }));
    assert!(err.to_string().contains("nowhere.json"));
}
