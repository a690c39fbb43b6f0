// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectify: perspective correction for photographed documents.
//
// Entry point. Initialises logging, loads settings, and dispatches to the
// `detect`, `process` and `edit` subcommands.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod commands;
mod queue;
mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rectify_core::human_errors::humanize_error;
use rectify_core::{AppConfig, Result};

use commands::detect::DetectArgs;
use commands::edit::EditArgs;
use commands::process::ProcessArgs;

/// Straighten and clean up photos of documents.
#[derive(Parser)]
#[command(name = "rectify", version)]
struct Cli {
    /// JSON settings file (enhancement defaults, output suffix, quality).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the page corners in each image and print them.
    Detect(DetectArgs),
    /// Rectify a batch of images (files or directories).
    Process(ProcessArgs),
    /// Correct one image interactively, with commands read from stdin.
    Edit(EditArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "rectify failed");
            eprintln!("{}", humanize_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config: AppConfig = services::settings::load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "Settings resolved");

    match cli.command {
        Command::Detect(args) => commands::detect::run(&args, &config),
        Command::Process(args) => commands::process::run(&args, &config),
        Command::Edit(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::edit::run(args, config))
        }
    }
}
