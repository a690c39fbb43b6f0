// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer shared by the subcommands: configuration loading and the
// debounced preview renderer.

pub mod preview;
pub mod settings;
