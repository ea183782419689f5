//! Normalized-region upload for a cloud object-detection training service.
//!
//! The service itself (authentication, transport, project management) sits
//! behind [`RegionUploader`]. This module owns the part that is independent
//! of any vendor: tag registration, turning boxes into normalized regions and
//! cutting the image list into bounded batches.

use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::labeled_image::LabeledImage;
use crate::normalize::normalize;

/// Largest batch the training service accepts
pub const MAX_BATCH_SIZE: usize = 64;

/// Opaque tag identifier issued by the remote service
pub type TagId = String;

/// One normalized box attached to an uploaded image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub tag_id: TagId,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// One image ready for upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub name: String,
    #[serde(skip)]
    pub contents: Vec<u8>,
    pub regions: Vec<Region>,
}

/// Per-image result reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStatus {
    pub name: String,
    pub status: String,
}

impl ImageStatus {
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "OK".to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// Result of one batch submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub images: Vec<ImageStatus>,
}

impl BatchOutcome {
    pub fn is_batch_successful(&self) -> bool {
        self.images.iter().all(ImageStatus::is_ok)
    }
}

/// Capability exposed by the remote training service
pub trait RegionUploader {
    /// Existing tags of the project as `(name, id)` pairs
    fn list_tags(&mut self, project_id: &str) -> Result<Vec<(String, TagId)>>;

    fn create_tag(&mut self, project_id: &str, name: &str) -> Result<TagId>;

    /// Whether [`ImageEntry::contents`] must be filled. Uploaders that only
    /// record regions return `false` and the image files are never read.
    fn wants_contents(&self) -> bool {
        true
    }

    /// Submit at most [`MAX_BATCH_SIZE`] images
    fn upload_batch(&mut self, project_id: &str, images: &[ImageEntry]) -> Result<BatchOutcome>;
}

/// Aggregate of all batches: counts plus every rejected image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub batches: usize,
    pub uploaded: usize,
    pub failed: Vec<ImageStatus>,
}

/// Build the upload entry for one image, registering unknown tags on the way.
///
/// Image bytes are read from disk here, not kept on the [`LabeledImage`], and
/// only when the uploader asks for them.
pub fn build_entry<U: RegionUploader>(
    uploader: &mut U,
    project_id: &str,
    tag_ids: &mut IndexMap<String, TagId>,
    image: &LabeledImage,
) -> Result<ImageEntry> {
    let mut regions = Vec::with_capacity(image.box_count());

    for (tag, boxes) in image.labels() {
        let tag_id = match tag_ids.get(tag) {
            Some(id) => id.clone(),
            None => {
                let id = uploader.create_tag(project_id, tag)?;
                info!("Created tag {} ({})", tag, id);
                tag_ids.insert(tag.clone(), id.clone());
                id
            }
        };

        for raw in boxes {
            let n = normalize(raw, image.shape());
            regions.push(Region {
                tag_id: tag_id.clone(),
                left: n.x,
                top: n.y,
                width: n.width,
                height: n.height,
            });
        }
    }

    let contents = if uploader.wants_contents() {
        fs::read(image.path()).map_err(|e| Error::io(image.path(), e))?
    } else {
        Vec::new()
    };

    Ok(ImageEntry {
        name: image.name().to_string(),
        contents,
        regions,
    })
}

/// Upload all images in batches of at most `batch_size` (capped at [`MAX_BATCH_SIZE`]).
///
/// A batch the service partially rejects is logged per image and recorded in
/// the report; the remaining batches are still submitted.
pub fn upload_training_images<U: RegionUploader>(
    uploader: &mut U,
    project_id: &str,
    images: &[LabeledImage],
    batch_size: usize,
) -> Result<UploadReport> {
    let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let mut tag_ids: IndexMap<String, TagId> =
        uploader.list_tags(project_id)?.into_iter().collect();
    let mut report = UploadReport::default();

    info!("Adding images...");
    for chunk in images.chunks(batch_size) {
        let entries = chunk
            .iter()
            .map(|image| build_entry(uploader, project_id, &mut tag_ids, image))
            .collect::<Result<Vec<_>>>()?;

        report.batches += 1;
        info!("Adding images: batch {}", report.batches);
        let outcome = uploader.upload_batch(project_id, &entries)?;

        if !outcome.is_batch_successful() {
            warn!("Image batch {} upload failed.", report.batches);
        }
        for status in outcome.images {
            if status.is_ok() {
                report.uploaded += 1;
            } else {
                warn!("Image {} status: {}", status.name, status.status);
                report.failed.push(status);
            }
        }
    }

    Ok(report)
}

#[derive(Debug, Serialize)]
struct ManifestBatch<'a> {
    project_id: &'a str,
    images: &'a [ImageEntry],
}

/// Offline uploader that records every batch in a JSON manifest instead of
/// contacting a service. Tag ids are the tag's position as a string.
pub struct ManifestUploader {
    path: PathBuf,
    tags: IndexMap<String, TagId>,
    batches: Vec<serde_json::Value>,
}

impl ManifestUploader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tags: IndexMap::new(),
            batches: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let writer =
            BufWriter::new(File::create(&self.path).map_err(|e| Error::io(&self.path, e))?);
        let manifest = serde_json::json!({
            "tags": &self.tags,
            "batches": &self.batches,
        });
        serde_json::to_writer_pretty(writer, &manifest)
            .map_err(|e| Error::io(&self.path, e.into()))
    }
}

impl RegionUploader for ManifestUploader {
    fn list_tags(&mut self, _project_id: &str) -> Result<Vec<(String, TagId)>> {
        Ok(self
            .tags
            .iter()
            .map(|(name, id)| (name.clone(), id.clone()))
            .collect())
    }

    fn create_tag(&mut self, _project_id: &str, name: &str) -> Result<TagId> {
        let id = self.tags.len().to_string();
        self.tags.insert(name.to_string(), id.clone());
        Ok(id)
    }

    fn wants_contents(&self) -> bool {
        false
    }

    fn upload_batch(&mut self, project_id: &str, images: &[ImageEntry]) -> Result<BatchOutcome> {
        let batch = serde_json::to_value(ManifestBatch { project_id, images })
            .map_err(|e| Error::Upload(e.to_string()))?;
        self.batches.push(batch);
        self.flush()?;
        Ok(BatchOutcome {
            images: images.iter().map(|e| ImageStatus::ok(&e.name)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageShape, RawBox};
    use approx::assert_relative_eq;

    /// Records calls and rejects images whose name starts with "bad"
    #[derive(Default)]
    struct MockUploader {
        existing: Vec<(String, TagId)>,
        created: Vec<String>,
        batch_sizes: Vec<usize>,
    }

    impl RegionUploader for MockUploader {
        fn list_tags(&mut self, _project_id: &str) -> Result<Vec<(String, TagId)>> {
            Ok(self.existing.clone())
        }

        fn create_tag(&mut self, _project_id: &str, name: &str) -> Result<TagId> {
            self.created.push(name.to_string());
            Ok(format!("id-{}", name))
        }

        fn upload_batch(&mut self, _project_id: &str, images: &[ImageEntry]) -> Result<BatchOutcome> {
            self.batch_sizes.push(images.len());
            Ok(BatchOutcome {
                images: images
                    .iter()
                    .map(|e| ImageStatus {
                        name: e.name.clone(),
                        status: if e.name.starts_with("bad") {
                            "ErrorRegionLimitExceed".to_string()
                        } else {
                            "OK".to_string()
                        },
                    })
                    .collect(),
            })
        }
    }

    fn images(dir: &Path, names: &[&str]) -> Vec<LabeledImage> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, b"bytes").unwrap();
                let mut img = LabeledImage::with_shape(path, ImageShape::with_channels(100, 200, 3));
                img.add_labels("cell", vec![RawBox::new(20, 10, 40, 20)]);
                img
            })
            .collect()
    }

    #[test]
    fn test_batches_are_capped_at_64() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..130).map(|i| format!("img{}.png", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let imgs = images(dir.path(), &refs);

        let mut uploader = MockUploader::default();
        let report = upload_training_images(&mut uploader, "p", &imgs, 100).unwrap();
        assert_eq!(uploader.batch_sizes, vec![64, 64, 2]);
        assert_eq!(report.batches, 3);
        assert_eq!(report.uploaded, 130);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_partial_failure_does_not_stop_later_batches() {
        let dir = tempfile::tempdir().unwrap();
        let imgs = images(dir.path(), &["a.png", "bad.png", "c.png"]);

        let mut uploader = MockUploader::default();
        let report = upload_training_images(&mut uploader, "p", &imgs, 2).unwrap();
        assert_eq!(uploader.batch_sizes, vec![2, 1]);
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "bad.png");
    }

    #[test]
    fn test_existing_tags_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut imgs = images(dir.path(), &["a.png"]);
        imgs[0].add_labels("nucleus", vec![RawBox::new(0, 0, 10, 10)]);

        let mut uploader = MockUploader {
            existing: vec![("cell".to_string(), "remote-cell".to_string())],
            ..Default::default()
        };
        let mut tag_ids = uploader.list_tags("p").unwrap().into_iter().collect();
        let entry = build_entry(&mut uploader, "p", &mut tag_ids, &imgs[0]).unwrap();

        assert_eq!(uploader.created, vec!["nucleus"]);
        assert_eq!(entry.contents, b"bytes");
        assert_eq!(entry.regions.len(), 2);
        assert_eq!(entry.regions[0].tag_id, "remote-cell");
        assert_eq!(entry.regions[1].tag_id, "id-nucleus");
        assert_relative_eq!(entry.regions[0].left, 0.1);
        assert_relative_eq!(entry.regions[0].top, 0.1);
        assert_relative_eq!(entry.regions[0].width, 0.2);
        assert_relative_eq!(entry.regions[0].height, 0.2);
    }

    #[test]
    fn test_missing_image_bytes() {
        let mut img = LabeledImage::with_shape("/nonexistent/a.png", ImageShape::new(1, 1));
        img.add_labels("cell", vec![RawBox::new(0, 0, 1, 1)]);
        let mut uploader = MockUploader::default();
        assert!(matches!(
            upload_training_images(&mut uploader, "p", &[img], 64),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_manifest_uploader_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let imgs = images(dir.path(), &["a.png", "b.png"]);
        let manifest = dir.path().join("regions.json");

        let mut uploader = ManifestUploader::new(&manifest);
        let report = upload_training_images(&mut uploader, "local", &imgs, 1).unwrap();
        assert_eq!(report.batches, 2);

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&manifest).unwrap()).unwrap();
        assert_eq!(value["tags"]["cell"], "0");
        assert_eq!(value["batches"].as_array().unwrap().len(), 2);
        assert_eq!(value["batches"][1]["images"][0]["name"], "b.png");
        assert_eq!(value["batches"][0]["images"][0]["regions"][0]["tag_id"], "0");
    }

    #[test]
    fn test_manifest_uploader_skips_image_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut img = LabeledImage::with_shape(
            dir.path().join("gone.png"),
            ImageShape::with_channels(100, 200, 3),
        );
        img.add_labels("cell", vec![RawBox::new(20, 10, 40, 20)]);

        let mut uploader = ManifestUploader::new(dir.path().join("regions.json"));
        let mut tag_ids = IndexMap::new();
        let entry = build_entry(&mut uploader, "local", &mut tag_ids, &img).unwrap();
        assert!(entry.contents.is_empty());
        assert_eq!(entry.regions.len(), 1);
    }
}
