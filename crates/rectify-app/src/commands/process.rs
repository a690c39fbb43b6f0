// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `rectify process`: batch rectification.
//
// Every queued file is loaded, its corners detected (or taken from the
// command line), warped, enhanced and saved next to the other outputs. A
// failing file is marked and the batch carries on.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;
use rectify_core::human_errors::humanize_error;
use rectify_core::{AppConfig, CornerSet, DetectionConfig, EnhancementOptions, QueueStatus, Result};
use rectify_document::{
    FsImageStore, ImageSink, ImageSource, detect_corners, full_pipeline, output_path,
};
use tracing::{error, info, instrument, warn};

use super::{EnhanceArgs, parse_corners};
use crate::queue::BatchQueue;

/// Queue message for a photo whose page outline could not be found.
pub const NEEDS_MANUAL_CORNERS: &str =
    "no page outline found; needs manual corners (use --corners or --accept-fallback)";

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Image files or directories of images.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Where rectified images are written.
    #[arg(long, short = 'o')]
    pub output_dir: PathBuf,

    /// Appended to each input's file stem.
    #[arg(long)]
    pub suffix: Option<String>,

    /// JPEG quality (1-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Corners to use instead of detection, as "x,y x,y x,y x,y".
    #[arg(long, value_parser = parse_corners)]
    pub corners: Option<CornerSet>,

    /// Warp the whole frame when no page outline is found instead of
    /// marking the file as failed.
    #[arg(long)]
    pub accept_fallback: bool,

    #[command(flatten)]
    pub enhance: EnhanceArgs,
}

/// Everything needed to process one file, resolved once per batch.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub output_dir: PathBuf,
    pub suffix: String,
    pub quality: u8,
    pub corners: Option<CornerSet>,
    pub accept_fallback: bool,
    pub options: EnhancementOptions,
    pub detection: DetectionConfig,
}

impl BatchPlan {
    pub fn from_args(args: &ProcessArgs, config: &AppConfig) -> Result<Self> {
        Ok(Self {
            output_dir: args.output_dir.clone(),
            suffix: args.suffix.clone().unwrap_or_else(|| config.output_suffix.clone()),
            quality: args.quality.unwrap_or(config.jpeg_quality),
            corners: args.corners,
            accept_fallback: args.accept_fallback,
            options: args.enhance.resolve(config.enhancement)?,
            detection: config.detection,
        })
    }
}

pub fn run(args: &ProcessArgs, config: &AppConfig) -> Result<ExitCode> {
    let plan = BatchPlan::from_args(args, config)?;
    let mut queue = BatchQueue::from_inputs(&args.inputs)?;
    if queue.is_empty() {
        warn!("No supported images in the given inputs");
        println!("Nothing to process.");
        return Ok(ExitCode::FAILURE);
    }

    process_queue(&mut queue, &plan);

    for item in queue.items() {
        println!("{item}");
    }
    let done = queue.count(QueueStatus::Done);
    let failed = queue.count(QueueStatus::Error);
    println!("{done} done, {failed} failed");

    Ok(if queue.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Run every pending item. Never stops early.
pub fn process_queue(queue: &mut BatchQueue, plan: &BatchPlan) {
    for item in queue.items_mut() {
        if item.status != QueueStatus::Pending {
            continue;
        }
        match process_one(&item.path, plan) {
            Ok(Some(out)) => {
                info!(input = %item.path.display(), output = %out.display(), "Rectified");
                item.mark_done();
            }
            Ok(None) => {
                warn!(input = %item.path.display(), "No page outline found");
                item.mark_error(NEEDS_MANUAL_CORNERS);
            }
            Err(err) => {
                error!(input = %item.path.display(), %err, "Processing failed");
                item.mark_error(humanize_error(&err).to_string());
            }
        }
    }
    info!(
        done = queue.count(QueueStatus::Done),
        failed = queue.count(QueueStatus::Error),
        "Batch finished"
    );
}

/// Process one file. `Ok(None)` means detection missed and the fallback
/// was not accepted.
#[instrument(skip(plan), fields(path = %path.display()))]
fn process_one(path: &Path, plan: &BatchPlan) -> Result<Option<PathBuf>> {
    let (image, meta) = FsImageStore.load(path)?;

    let corners = match plan.corners {
        Some(corners) => corners,
        None => {
            let detected = detect_corners(&image, &plan.detection);
            if !detected.success && !plan.accept_fallback {
                return Ok(None);
            }
            detected.corners
        }
    };

    let rectified = full_pipeline(&image, &corners, plan.options)?;
    let out = output_path(path, &plan.output_dir, &plan.suffix);
    FsImageStore.save(&rectified, &meta, &out, plan.quality)?;
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rectify_core::ImageMeta;

    /// Light page at (40,30)-(280,210) on a dark 320x240 desk.
    fn page_photo() -> RgbImage {
        RgbImage::from_fn(320, 240, |x, y| {
            if (40..=280).contains(&x) && (30..=210).contains(&y) {
                Rgb([235, 233, 228])
            } else {
                Rgb([30, 34, 40])
            }
        })
    }

    fn plan(output_dir: &Path) -> BatchPlan {
        BatchPlan {
            output_dir: output_dir.to_path_buf(),
            suffix: "_rectified".into(),
            quality: 90,
            corners: None,
            accept_fallback: false,
            options: EnhancementOptions::disabled(),
            detection: DetectionConfig::default(),
        }
    }

    fn write(path: &Path, image: &RgbImage) {
        FsImageStore
            .save(image, &ImageMeta::default(), path, 95)
            .expect("write fixture");
    }

    #[test]
    fn batch_continues_past_failures() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        write(&input.path().join("a_page.png"), &page_photo());
        write(
            &input.path().join("b_blank.png"),
            &RgbImage::from_pixel(200, 150, Rgb([120, 120, 120])),
        );
        std::fs::write(input.path().join("c_broken.jpg"), b"not a jpeg").expect("write");

        let mut queue = BatchQueue::from_inputs(&[input.path().to_path_buf()]).expect("queue");
        process_queue(&mut queue, &plan(output.path()));

        let statuses: Vec<QueueStatus> = queue.items().iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            [QueueStatus::Done, QueueStatus::Error, QueueStatus::Error]
        );
        assert_eq!(
            queue.items()[1].error_message.as_deref(),
            Some(NEEDS_MANUAL_CORNERS)
        );
        assert!(queue.items()[2].error_message.is_some());
        assert!(output.path().join("a_page_rectified.png").is_file());
        assert!(!output.path().join("b_blank_rectified.png").exists());
    }

    #[test]
    fn detected_page_is_cropped() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        let src = input.path().join("page.png");
        write(&src, &page_photo());

        let mut queue = BatchQueue::from_inputs(&[src]).expect("queue");
        process_queue(&mut queue, &plan(output.path()));
        assert!(!queue.has_failures());

        let (out, _) = FsImageStore
            .load(&output.path().join("page_rectified.png"))
            .expect("load output");
        let (w, h) = out.dimensions();
        assert!((220..=260).contains(&w), "width {w}");
        assert!((160..=200).contains(&h), "height {h}");
    }

    #[test]
    fn fallback_accepted_warps_whole_frame() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        let src = input.path().join("blank.png");
        write(&src, &RgbImage::from_pixel(200, 150, Rgb([120, 120, 120])));

        let mut queue = BatchQueue::from_inputs(&[src]).expect("queue");
        let plan = BatchPlan {
            accept_fallback: true,
            ..plan(output.path())
        };
        process_queue(&mut queue, &plan);
        assert!(!queue.has_failures());

        let (out, _) = FsImageStore
            .load(&output.path().join("blank_rectified.png"))
            .expect("load output");
        assert_eq!(out.dimensions(), (199, 149));
    }

    #[test]
    fn manual_corners_skip_detection() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        let src = input.path().join("blank.jpg");
        write(&src, &RgbImage::from_pixel(200, 150, Rgb([120, 120, 120])));

        let mut queue = BatchQueue::from_inputs(&[src]).expect("queue");
        let plan = BatchPlan {
            corners: Some(parse_corners("10,10 110,10 110,60 10,60").expect("corners")),
            ..plan(output.path())
        };
        process_queue(&mut queue, &plan);
        assert!(!queue.has_failures());

        let (out, _) = FsImageStore
            .load(&output.path().join("blank_rectified.jpg"))
            .expect("load output");
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn corners_far_outside_the_image_fail_that_file_only() {
        let input = tempfile::tempdir().expect("tempdir");
        let output = tempfile::tempdir().expect("tempdir");
        write(
            &input.path().join("a_small.png"),
            &RgbImage::from_pixel(100, 100, Rgb([120, 120, 120])),
        );
        write(&input.path().join("b_large.png"), &RgbImage::new(400, 400));

        let mut queue = BatchQueue::from_inputs(&[input.path().to_path_buf()]).expect("queue");
        let plan = BatchPlan {
            corners: Some(parse_corners("0,0 300,0 300,300 0,300").expect("corners")),
            ..plan(output.path())
        };
        process_queue(&mut queue, &plan);

        let statuses: Vec<QueueStatus> = queue.items().iter().map(|i| i.status).collect();
        assert_eq!(statuses, [QueueStatus::Error, QueueStatus::Done]);
        assert!(!output.path().join("a_small_rectified.png").exists());
        assert!(output.path().join("b_large_rectified.png").is_file());
    }
}
