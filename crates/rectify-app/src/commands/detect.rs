// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `rectify detect`: report the page corners found in each image.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use rectify_core::human_errors::humanize_error;
use rectify_core::{AppConfig, DetectionConfig, DetectionResult, Result};
use rectify_document::{FsImageStore, ImageSource, detect_corners};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Images to inspect.
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Minimum fraction of the image the page must cover.
    #[arg(long)]
    pub min_area_ratio: Option<f32>,

    /// Longest side of the working copy used for detection.
    #[arg(long)]
    pub downscale_limit: Option<u32>,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One line of the report.
#[derive(Debug, Serialize)]
struct DetectReport {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detection: Option<DetectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DetectArgs {
    fn detection_config(&self, base: DetectionConfig) -> Result<DetectionConfig> {
        let config = DetectionConfig {
            min_area_ratio: self.min_area_ratio.unwrap_or(base.min_area_ratio),
            downscale_limit: self.downscale_limit.unwrap_or(base.downscale_limit),
            ..base
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn run(args: &DetectArgs, config: &AppConfig) -> Result<ExitCode> {
    let detection = args.detection_config(config.detection)?;

    let mut reports = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let report = match FsImageStore.load(path) {
            Ok((image, _meta)) => {
                let result = detect_corners(&image, &detection);
                DetectReport {
                    path: path.clone(),
                    width: Some(image.width()),
                    height: Some(image.height()),
                    detection: Some(result),
                    error: None,
                }
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "Could not load image");
                DetectReport {
                    path: path.clone(),
                    width: None,
                    height: None,
                    detection: None,
                    error: Some(humanize_error(&err).to_string()),
                }
            }
        };
        reports.push(report);
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    let found = reports
        .iter()
        .filter(|r| r.detection.is_some_and(|d| d.success))
        .count();
    info!(images = reports.len(), found, failed, "Detection finished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", format_report(report));
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn format_report(report: &DetectReport) -> String {
    let name = report.path.display();
    match (&report.detection, &report.error) {
        (Some(d), _) if d.success => {
            let c = d.corners;
            format!(
                "{name}: page found  tl=({:.0},{:.0}) tr=({:.0},{:.0}) br=({:.0},{:.0}) bl=({:.0},{:.0})",
                c.top_left().x,
                c.top_left().y,
                c.top_right().x,
                c.top_right().y,
                c.bottom_right().x,
                c.bottom_right().y,
                c.bottom_left().x,
                c.bottom_left().y,
            )
        }
        (Some(_), _) => format!("{name}: no page outline found; corners must be placed by hand"),
        (None, Some(err)) => format!("{name}: {err}"),
        (None, None) => format!("{name}: not processed"),
    }
}
