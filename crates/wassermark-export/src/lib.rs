// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wassermark-export — Batch export coordination for Wassermark.
//
// Drives one export run over a queue of source files: documents go through
// the isolated PDF rendering worker, images are stamped locally, and every
// file yields exactly one result in queue order.

pub mod bundle;
pub mod coordinator;
pub mod protocol;
pub mod worker;

pub use bundle::write_bundle;
pub use coordinator::run_batch;
pub use protocol::{StampRequest, StampResponse};
pub use worker::PdfWorker;
