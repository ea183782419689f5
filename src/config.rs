use clap::{Parser, ValueEnum};
use std::str::FromStr;

use crate::upload::MAX_BATCH_SIZE;

/// Command-line arguments for converting ImageJ measurements to YOLO labels or upload regions.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Directory containing the annotated images
    #[arg(short = 'd', long = "image_dir")]
    pub image_dir: String,

    /// Directory with one sub-directory per tag holding `<image_stem>.txt` measurement files
    /// (defaults to image_dir)
    #[arg(long = "measure_dir")]
    pub measure_dir: Option<String>,

    /// Directory the label files or region manifest are written to
    #[arg(short = 'o', long = "output_dir", default_value = ".")]
    pub output_dir: String,

    /// Output format: 'yolo' label files or a normalized 'regions' manifest
    #[arg(
        long = "output_format",
        visible_alias = "format",
        value_enum,
        default_value = "yolo"
    )]
    pub output_format: Format,

    /// File with a pre-assigned tag list, one tag per line
    #[arg(long = "classes")]
    pub classes: Option<String>,

    /// Project identifier recorded in the region manifest
    #[arg(long = "project_id", default_value = "local")]
    pub project_id: String,

    /// Number of images per upload batch
    #[arg(long = "batch_size", default_value_t = MAX_BATCH_SIZE, value_parser = validate_batch_size)]
    pub batch_size: usize,

    /// Pre-assigned tag list, in class index order
    #[arg(use_value_delimiter = true)]
    pub label_list: Vec<String>,
}

// Enumeration for the output format
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum Format {
    Yolo,
    Regions,
}

// Validate that the batch size is between 1 and the service limit
fn validate_batch_size(s: &str) -> Result<usize, String> {
    match usize::from_str(s) {
        Ok(val) if (1..=MAX_BATCH_SIZE).contains(&val) => Ok(val),
        _ => Err(format!("BATCH_SIZE must be between 1 and {}", MAX_BATCH_SIZE)),
    }
}
