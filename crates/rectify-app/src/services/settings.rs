// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loading the JSON settings file.

use std::path::Path;

use rectify_core::{AppConfig, Result};
use tracing::{debug, info};

/// Read an `AppConfig` from `path`, or the defaults when no path is given.
///
/// Missing fields fall back to their defaults. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let data = std::fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&data)?;
            info!(path = %path.display(), "Settings loaded");
            config
        }
        None => {
            debug!("No settings file; using defaults");
            AppConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}
