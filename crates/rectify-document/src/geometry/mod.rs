// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corner geometry: labelling, line fitting, outline simplification, and the
// perspective warp.

pub mod lines;
pub mod order;
pub mod simplify;
pub mod warp;
