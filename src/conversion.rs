use log::info;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::labeled_image::LabeledImage;
use crate::normalize::normalize;
use crate::tags::TagRegistry;

/// Tag list file written next to the label files by [`write_dataset`]
pub const CLASSES_FILE: &str = "classes.txt";

/// Collect tags across images: input order, then first-seen order within each image
pub fn collect_tags(images: &[LabeledImage]) -> TagRegistry {
    images.iter().flat_map(|img| img.tags()).collect()
}

/// Label file path for an image: its file stem with a `.txt` extension
pub fn label_path(output_dir: &Path, image: &LabeledImage) -> PathBuf {
    let stem = Path::new(image.name())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.name().to_string());
    output_dir.join(format!("{}.txt", stem))
}

/// Render the YOLO label file for one image.
///
/// Each box becomes `<index> <cx> <cy> <w> <h> ` with six decimals; the
/// trailing space before the newline is part of the format.
pub fn yolo_label_lines(image: &LabeledImage, tags: &TagRegistry) -> Result<String> {
    let mut yolo_data = String::with_capacity(image.box_count() * 48);

    for (tag, boxes) in image.labels() {
        let class_id = tags.index_of(tag).ok_or_else(|| Error::UnknownTag {
            tag: tag.clone(),
            image: image.name().to_string(),
        })?;

        for raw in boxes {
            let (cx, cy, w, h) = normalize(raw, image.shape()).to_center();
            yolo_data.push_str(&format!(
                "{} {:.6} {:.6} {:.6} {:.6} \n",
                class_id, cx, cy, w, h
            ));
        }
    }

    Ok(yolo_data)
}

/// Label paths for all images, checked for collisions with each other and
/// with `reserved` files before anything is written
fn planned_label_paths(
    images: &[LabeledImage],
    output_dir: &Path,
    reserved: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let mut owners: HashMap<PathBuf, String> = reserved
        .iter()
        .map(|path| (path.clone(), path.display().to_string()))
        .collect();

    let mut paths = Vec::with_capacity(images.len());
    for image in images {
        let path = label_path(output_dir, image);
        if let Some(other) = owners.get(&path) {
            return Err(Error::LabelPathConflict {
                path,
                image: image.name().to_string(),
                other: other.clone(),
            });
        }
        owners.insert(path.clone(), image.name().to_string());
        paths.push(path);
    }
    Ok(paths)
}

fn write_labels(
    images: &[LabeledImage],
    output_dir: &Path,
    tags: &TagRegistry,
    reserved: &[PathBuf],
) -> Result<()> {
    let paths = planned_label_paths(images, output_dir, reserved)?;

    for (image, label_output_path) in images.iter().zip(paths) {
        let yolo_data = yolo_label_lines(image, tags)?;

        let file = File::create(&label_output_path).map_err(|e| Error::io(&label_output_path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(yolo_data.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| Error::io(&label_output_path, e))?;

        info!("Generated labels for image {}", image.name());
    }

    Ok(())
}

/// Write one YOLO label file per image into `output_dir` (default: current directory).
///
/// When `tags` is `None` the tag list is derived with [`collect_tags`]. Pass the
/// returned registry back in on later runs to keep class indices stable.
/// Images whose label files would share a path are rejected before any file
/// is written.
pub fn convert_to_yolo_format(
    images: &[LabeledImage],
    output_dir: Option<&Path>,
    tags: Option<TagRegistry>,
) -> Result<TagRegistry> {
    let tags = tags.unwrap_or_else(|| collect_tags(images));
    let output_dir = output_dir.unwrap_or_else(|| Path::new("."));
    write_labels(images, output_dir, &tags, &[])?;
    Ok(tags)
}

/// Like [`convert_to_yolo_format`], then persist the tag list as
/// [`CLASSES_FILE`] in the same directory. An image whose label file would be
/// `classes.txt` is rejected.
pub fn write_dataset(
    images: &[LabeledImage],
    output_dir: &Path,
    tags: Option<TagRegistry>,
) -> Result<TagRegistry> {
    let tags = tags.unwrap_or_else(|| collect_tags(images));
    let classes_path = output_dir.join(CLASSES_FILE);
    write_labels(images, output_dir, &tags, std::slice::from_ref(&classes_path))?;
    tags.write_to(&classes_path)?;
    info!("Wrote {} tags to {:?}", tags.len(), classes_path);
    Ok(tags)
}
