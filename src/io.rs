use glob::{glob, Pattern};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::labeled_image::LabeledImage;
use crate::types::get_image_extensions_set;

fn glob_paths(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), suffix);
    let entries = glob(&pattern).map_err(|e| {
        Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        )
    })?;
    Ok(entries.filter_map(|entry| entry.ok()).collect())
}

/// Images directly inside `dir` with a supported extension, sorted by path
pub fn find_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let extensions = get_image_extensions_set();
    let mut images: Vec<PathBuf> = glob_paths(dir, "*")?
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.contains(&ext.to_lowercase()))
        })
        .collect();
    images.sort();
    Ok(images)
}

/// Tag directories under `measure_dir` as `(tag, dir)`, sorted by tag name.
///
/// Each sub-directory name is a tag; `<dir>/<image_stem>.txt` holds the
/// boxes of that tag for one image.
pub fn find_tag_dirs(measure_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut tags: Vec<(String, PathBuf)> = glob_paths(measure_dir, "*")?
        .into_iter()
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let tag = path.file_name()?.to_str()?.to_string();
            Some((tag, path))
        })
        .collect();
    tags.sort();
    Ok(tags)
}

/// Load one image and attach the measurement file of every tag that has one.
///
/// Returns `Ok(None)` when no tag directory holds measurements for the image.
pub fn load_labeled_image(
    image_path: &Path,
    tag_dirs: &[(String, PathBuf)],
) -> Result<Option<LabeledImage>> {
    let stem = match image_path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem,
        None => return Ok(None),
    };

    let mut image = LabeledImage::new(image_path)?;
    let mut found = false;

    for (tag, dir) in tag_dirs {
        let measure_path = dir.join(format!("{}.txt", stem));
        if measure_path.is_file() {
            image.add_labels_from_file(tag, &measure_path)?;
            found = true;
        }
    }

    if !found {
        warn!("No measurements found for image: {:?}", image_path);
        return Ok(None);
    }

    debug!("{}", image);
    Ok(Some(image))
}
