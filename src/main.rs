use clap::Parser;

use log::{error, info, warn};
use std::path::{Path, PathBuf};

use imagej2yolo::utils::{create_output_directory, create_progress_bar};
use imagej2yolo::{
    find_images, find_tag_dirs, load_labeled_image, upload_training_images, write_dataset, Args,
    Format, LabeledImage, ManifestUploader, TagRegistry,
};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let image_dir = PathBuf::from(&args.image_dir);
    if !image_dir.exists() {
        error!("The specified image_dir does not exist: {}", args.image_dir);
        return;
    }
    let measure_dir = args
        .measure_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| image_dir.clone());

    info!("Starting the conversion process...");

    if let Err(e) = run(&args, &image_dir, &measure_dir) {
        error!("Conversion failed: {}", e);
    }
}

fn run(args: &Args, image_dir: &Path, measure_dir: &Path) -> imagej2yolo::Result<()> {
    let tags = preassigned_tags(args)?;
    let output_dir = create_output_directory(Path::new(&args.output_dir))?;

    let tag_dirs = find_tag_dirs(measure_dir)?;
    if tag_dirs.is_empty() {
        warn!("No tag directories found in {:?}", measure_dir);
    }
    let images = load_images(&find_images(image_dir)?, &tag_dirs);
    info!("Loaded {} labeled images.", images.len());

    match args.output_format {
        Format::Yolo => {
            write_dataset(&images, &output_dir, tags)?;
        }
        Format::Regions => {
            let mut uploader = ManifestUploader::new(output_dir.join("regions.json"));
            let report =
                upload_training_images(&mut uploader, &args.project_id, &images, args.batch_size)?;
            info!(
                "Recorded {} images in {} batches to {:?}",
                report.uploaded,
                report.batches,
                uploader.path()
            );
        }
    }

    info!("Conversion process completed successfully.");
    Ok(())
}

fn preassigned_tags(args: &Args) -> imagej2yolo::Result<Option<TagRegistry>> {
    if let Some(classes) = &args.classes {
        return TagRegistry::read_from(Path::new(classes)).map(Some);
    }
    if !args.label_list.is_empty() {
        return Ok(Some(args.label_list.iter().collect()));
    }
    Ok(None)
}

// Failed images are logged and skipped so independent images still convert
fn load_images(paths: &[PathBuf], tag_dirs: &[(String, PathBuf)]) -> Vec<LabeledImage> {
    let pb = create_progress_bar(paths.len() as u64, "Images");
    let mut images = Vec::with_capacity(paths.len());

    for path in paths {
        match load_labeled_image(path, tag_dirs) {
            Ok(Some(image)) => images.push(image),
            Ok(None) => {}
            Err(e) => error!("Failed to load {}: {}", path.display(), e),
        }
        pb.inc(1);
    }

    pb.finish_with_message("Loading complete");
    images
}
