// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worker protocol — the one-shot request/response contract between the batch
// coordinator and the PDF rendering worker.
//
// The coordinator sends one request at a time and awaits the reply before
// the next send; a single worker instance never has concurrent in-flight
// requests, which bounds worker-side resource usage.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use wassermark_core::config::WatermarkConfig;

/// Request to stamp one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampRequest {
    pub document_bytes: Vec<u8>,
    /// The batch run's frozen config snapshot.
    pub config: WatermarkConfig,
}

/// Worker reply: the rebuilt document's bytes, or a failure signal. A
/// failure is scoped to the one request; the worker stays alive for the
/// next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StampResponse {
    Document(Vec<u8>),
    Failed(String),
}

/// Channel envelope pairing a request with its reply slot.
#[derive(Debug)]
pub struct WorkerMessage {
    pub request: StampRequest,
    pub reply: oneshot::Sender<StampResponse>,
}
