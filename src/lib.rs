//! ImageJ measurements to YOLO / normalized-region converter
//!
//! This library reads rectangle measurements exported by ImageJ, groups them
//! per image and tag, and converts them either to YOLO training label files or
//! to normalized regions for a cloud object-detection training service.

pub mod config;
pub mod conversion;
pub mod error;
pub mod io;
pub mod labeled_image;
pub mod measurement;
pub mod normalize;
pub mod tags;
pub mod types;
pub mod upload;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{Args, Format};
pub use conversion::{collect_tags, convert_to_yolo_format, write_dataset, yolo_label_lines};
pub use error::{Error, Result};
pub use io::{find_images, find_tag_dirs, load_labeled_image};
pub use labeled_image::LabeledImage;
pub use measurement::read_measurements;
pub use normalize::normalize;
pub use tags::TagRegistry;
pub use types::{ImageShape, NormalizedBox, RawBox};
pub use upload::{upload_training_images, ManifestUploader, RegionUploader, UploadReport};
