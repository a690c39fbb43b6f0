// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `rectify edit`: interactive correction of a single photo.
//
// Commands are read line by line from stdin. Each change to the corners or
// the enhancement settings schedules a preview render, written as a
// display-sized image to the preview file once input has gone quiet.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use image::RgbImage;
use rectify_core::human_errors::humanize_error;
use rectify_core::{
    AppConfig, CornerSet, DetectionConfig, EnhancementOptions, ImageMeta, RectifyError, Result,
    SupportedFormat,
};
use rectify_document::{
    FsImageStore, ImageSink, ImageSource, detect_corners, display_image, full_pipeline,
    output_path,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::{EnhanceArgs, parse_corners};
use crate::services::preview::PreviewScheduler;

/// Encoder quality for preview JPEGs.
const PREVIEW_QUALITY: u8 = 85;

const HELP: &str = "\
commands:
  corners x,y x,y x,y x,y     place the four page corners (any order)
  detect                      find the page corners automatically
  denoise on|off [strength]   non-local-means denoising (5-25)
  contrast on|off [clip]      local contrast equalisation (1-6)
  sharpen on|off [amount]     unsharp mask (0-3)
  clamp on|off [factor]       keep output near source size (1-2)
  show                        print the current corners and settings
  save                        write the rectified image
  quit                        leave (also on end of input)";

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Photo to correct.
    pub image: PathBuf,

    /// Where the rectified image is written on `save`.
    #[arg(long, short = 'o')]
    pub output_dir: PathBuf,

    /// Preview file, rewritten after every change (.png, .jpg or .tif).
    #[arg(long)]
    pub preview: PathBuf,

    #[command(flatten)]
    pub enhance: EnhanceArgs,
}

// -- Commands -----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Denoise,
    Contrast,
    Sharpen,
    Clamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    Corners(CornerSet),
    Stage {
        stage: Stage,
        enabled: bool,
        value: Option<f32>,
    },
    Detect,
    Show,
    Save,
    Help,
    Quit,
}

impl EditCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let stage = match word {
            "corners" => return parse_corners(rest).map(Self::Corners),
            "detect" => return Ok(Self::Detect),
            "show" => return Ok(Self::Show),
            "save" => return Ok(Self::Save),
            "help" | "?" => return Ok(Self::Help),
            "quit" | "exit" => return Ok(Self::Quit),
            "denoise" => Stage::Denoise,
            "contrast" => Stage::Contrast,
            "sharpen" => Stage::Sharpen,
            "clamp" => Stage::Clamp,
            other => {
                return Err(RectifyError::InvalidInput(format!(
                    "unknown command {other:?}; type `help`"
                )));
            }
        };

        let mut args = rest.split_whitespace();
        let enabled = match args.next() {
            Some("on") => true,
            Some("off") => false,
            _ => {
                return Err(RectifyError::InvalidInput(format!(
                    "expected `{word} on|off [value]`"
                )));
            }
        };
        let value = match args.next() {
            Some(v) => Some(v.parse::<f32>().map_err(|_| {
                RectifyError::InvalidInput(format!("{v:?} is not a number"))
            })?),
            None => None,
        };
        if args.next().is_some() {
            return Err(RectifyError::InvalidInput(format!(
                "too many arguments for `{word}`"
            )));
        }
        Ok(Self::Stage {
            stage,
            enabled,
            value,
        })
    }
}

// -- Session ------------------------------------------------------------------

/// Snapshot handed to the renderer.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub image: Arc<RgbImage>,
    pub corners: CornerSet,
    pub options: EnhancementOptions,
}

impl RenderJob {
    fn rectify(&self) -> Result<RgbImage> {
        full_pipeline(&self.image, &self.corners, self.options)
    }
}

/// State of one editing session.
#[derive(Debug)]
pub struct EditSession {
    image: Arc<RgbImage>,
    corners: CornerSet,
    options: EnhancementOptions,
    detection: DetectionConfig,
}

impl EditSession {
    /// Start a session with automatically detected corners. Returns whether
    /// detection found the page.
    pub fn new(
        image: RgbImage,
        options: EnhancementOptions,
        detection: DetectionConfig,
    ) -> (Self, bool) {
        let mut session = Self {
            corners: CornerSet::full_frame(image.width(), image.height()),
            image: Arc::new(image),
            options,
            detection,
        };
        let found = session.detect();
        (session, found)
    }

    pub fn corners(&self) -> CornerSet {
        self.corners
    }

    pub fn options(&self) -> EnhancementOptions {
        self.options
    }

    pub fn set_corners(&mut self, corners: CornerSet) {
        self.corners = corners;
    }

    /// Replace the corners with a fresh detection (the full frame on a miss).
    pub fn detect(&mut self) -> bool {
        let result = detect_corners(&self.image, &self.detection);
        self.corners = result.corners;
        result.success
    }

    /// Toggle a stage and optionally set its parameter. Invalid values leave
    /// the session untouched.
    pub fn set_stage(&mut self, stage: Stage, enabled: bool, value: Option<f32>) -> Result<()> {
        let mut next = self.options;
        match stage {
            Stage::Denoise => {
                next.denoise = enabled;
                next.denoise_strength = value.unwrap_or(next.denoise_strength);
            }
            Stage::Contrast => {
                next.local_contrast = enabled;
                next.clip_limit = value.unwrap_or(next.clip_limit);
            }
            Stage::Sharpen => {
                next.sharpen = enabled;
                next.sharpen_amount = value.unwrap_or(next.sharpen_amount);
            }
            Stage::Clamp => {
                next.size_clamp = enabled;
                next.max_scale_factor = value.unwrap_or(next.max_scale_factor);
            }
        }
        next.validate()?;
        self.options = next;
        Ok(())
    }

    pub fn job(&self) -> RenderJob {
        RenderJob {
            image: Arc::clone(&self.image),
            corners: self.corners,
            options: self.options,
        }
    }

    fn describe(&self) -> String {
        let c = self.corners();
        let o = self.options();
        let on = |b: bool| if b { "on" } else { "off" };
        format!(
            "corners tl=({:.0},{:.0}) tr=({:.0},{:.0}) br=({:.0},{:.0}) bl=({:.0},{:.0})\n\
             denoise {} {}, contrast {} {}, sharpen {} {}, clamp {} {}",
            c.top_left().x,
            c.top_left().y,
            c.top_right().x,
            c.top_right().y,
            c.bottom_right().x,
            c.bottom_right().y,
            c.bottom_left().x,
            c.bottom_left().y,
            on(o.denoise),
            o.denoise_strength,
            on(o.local_contrast),
            o.clip_limit,
            on(o.sharpen),
            o.sharpen_amount,
            on(o.size_clamp),
            o.max_scale_factor,
        )
    }
}

// -- Rendering ----------------------------------------------------------------

/// Rectify the job and write a display-sized copy to `target`.
pub fn render_preview(job: &RenderJob, target: &Path, max_dim: u32) -> Result<(u32, u32)> {
    let rectified = job.rectify()?;
    let shown = display_image(&rectified, max_dim);
    FsImageStore.save(&shown, &ImageMeta::default(), target, PREVIEW_QUALITY)?;
    Ok(shown.dimensions())
}

fn save_output(job: &RenderJob, meta: &ImageMeta, out: &Path, quality: u8) -> Result<()> {
    let rectified = job.rectify()?;
    FsImageStore.save(&rectified, meta, out, quality)
}

// -- Loop ---------------------------------------------------------------------

pub async fn run(args: EditArgs, config: AppConfig) -> Result<ExitCode> {
    SupportedFormat::from_path(&args.preview)?;
    let options = args.enhance.resolve(config.enhancement)?;

    let source = args.image.clone();
    let (image, meta) = tokio::task::spawn_blocking(move || FsImageStore.load(&source))
        .await
        .map_err(join_error)??;
    let (mut session, found) = EditSession::new(image, options, config.detection);
    if found {
        println!("Page outline found.");
    } else {
        println!("No page outline found; place the corners with `corners x,y x,y x,y x,y`.");
    }

    let preview_path = args.preview.clone();
    let max_dim = config.display_max_dim;
    let (scheduler, mut rendered) = PreviewScheduler::spawn(
        Duration::from_millis(config.preview_debounce_ms),
        move |job: RenderJob| render_preview(&job, &preview_path, max_dim),
    );

    let preview_name = args.preview.display().to_string();
    let reporter = tokio::spawn(async move {
        while let Some(done) = rendered.recv().await {
            match done.output {
                Ok((w, h)) => println!("preview {preview_name} updated ({w}x{h})"),
                Err(err) => {
                    warn!(generation = done.generation, %err, "Preview render failed");
                    println!("preview failed: {}", humanize_error(&err));
                }
            }
        }
    });

    scheduler.request(session.job());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match EditCommand::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                println!("{}", humanize_error(&err));
                continue;
            }
        };

        match command {
            EditCommand::Quit => break,
            EditCommand::Help => println!("{HELP}"),
            EditCommand::Show => println!(
                "{}\npreview requests so far: {}",
                session.describe(),
                scheduler.generation()
            ),
            EditCommand::Corners(corners) => {
                session.set_corners(corners);
                scheduler.request(session.job());
            }
            EditCommand::Detect => {
                if session.detect() {
                    println!("Page outline found.");
                } else {
                    println!("No page outline found; using the whole frame.");
                }
                scheduler.request(session.job());
            }
            EditCommand::Stage {
                stage,
                enabled,
                value,
            } => match session.set_stage(stage, enabled, value) {
                Ok(()) => {
                    scheduler.request(session.job());
                }
                Err(err) => println!("{}", humanize_error(&err)),
            },
            EditCommand::Save => {
                let job = session.job();
                let meta = meta.clone();
                let out = output_path(&args.image, &args.output_dir, &config.output_suffix);
                let quality = config.jpeg_quality;
                let target = out.clone();
                let saved =
                    tokio::task::spawn_blocking(move || save_output(&job, &meta, &target, quality))
                        .await
                        .map_err(join_error)?;
                match saved {
                    Ok(()) => {
                        info!(output = %out.display(), "Saved");
                        println!("saved {}", out.display());
                    }
                    Err(err) => println!("save failed: {}", humanize_error(&err)),
                }
            }
        }
    }

    scheduler.shutdown().await;
    if let Err(err) = reporter.await {
        warn!(%err, "Preview reporter ended abnormally");
    }
    Ok(ExitCode::SUCCESS)
}

fn join_error(err: tokio::task::JoinError) -> RectifyError {
    RectifyError::Io(std::io::Error::other(err))
}
