use image::{ImageDecoder, ImageReader};
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::measurement::read_measurements;
use crate::types::{ImageShape, RawBox};

/// One image together with the boxes annotated on it, grouped by tag.
///
/// Tags keep the order in which they were first added. Path, name and shape
/// are fixed at construction; only the labels grow afterwards.
#[derive(Debug, Clone)]
pub struct LabeledImage {
    path: PathBuf,
    name: String,
    shape: ImageShape,
    labels: IndexMap<String, Vec<RawBox>>,
}

impl LabeledImage {
    /// Probe the image header for its dimensions. Pixel data is not decoded.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let shape = read_image_shape(&path)?;
        Ok(Self::with_shape(path, shape))
    }

    /// Build from an already known shape without touching the filesystem
    pub fn with_shape(path: impl Into<PathBuf>, shape: ImageShape) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path,
            name,
            shape,
            labels: IndexMap::new(),
        }
    }

    /// Append `boxes` under `tag`, creating the entry if needed. Never replaces.
    pub fn add_labels(&mut self, tag: &str, boxes: impl IntoIterator<Item = RawBox>) {
        self.labels.entry(tag.to_string()).or_default().extend(boxes);
    }

    pub fn add_labels_from_file(&mut self, tag: &str, path: &Path) -> Result<()> {
        let boxes = read_measurements(path)?;
        self.add_labels(tag, boxes);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path segment of the image path
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &ImageShape {
        &self.shape
    }

    pub fn labels(&self) -> &IndexMap<String, Vec<RawBox>> {
        &self.labels
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    pub fn box_count(&self) -> usize {
        self.labels.values().map(Vec::len).sum()
    }
}

impl fmt::Display for LabeledImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Labeled image {}", self.name)?;
        writeln!(f, "    location: {}", self.path.display())?;
        writeln!(f, "    shape: {}", self.shape)?;
        writeln!(f, "    labels:")?;
        for (tag, boxes) in &self.labels {
            writeln!(f, "    - {}:", tag)?;
            for b in boxes {
                writeln!(f, "      {}", b)?;
            }
        }
        Ok(())
    }
}

/// Read `(height, width[, channels])` from the image header
pub fn read_image_shape(path: &Path) -> Result<ImageShape> {
    let decode_err = |message: String| Error::ImageDecode {
        path: path.to_path_buf(),
        message,
    };

    let decoder = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_err(e.to_string()))?
        .into_decoder()
        .map_err(|e| decode_err(e.to_string()))?;

    let (width, height) = decoder.dimensions();
    let shape = match decoder.color_type().channel_count() {
        1 => ImageShape::new(height, width),
        c => ImageShape::with_channels(height, width, c),
    };
    Ok(shape)
}
