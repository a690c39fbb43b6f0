// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: corner detection, enhancement, and the end-to-end run.

pub mod detect;
pub mod enhance;
pub mod pipeline;
