// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF rendering worker — an isolated blocking task that stamps documents on
// behalf of the batch coordinator. Message passing is the only communication
// channel; the worker owns no shared state.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use wassermark_core::config::WatermarkConfig;
use wassermark_document::pdf::stamp_pdf;

use crate::protocol::{StampRequest, StampResponse, WorkerMessage};

/// Handle to one rendering worker, exclusively owned by a single batch run.
///
/// Requests are strictly serialized: [`PdfWorker::stamp`] takes `&mut self`
/// and awaits the reply before returning, so one worker instance never sees
/// concurrent in-flight requests. The worker is released via
/// [`PdfWorker::shutdown`] at run end; dropping the handle also closes the
/// channel as a backstop on panic paths, without double-terminating.
pub struct PdfWorker {
    tx: Option<mpsc::Sender<WorkerMessage>>,
    handle: Option<JoinHandle<()>>,
}

impl PdfWorker {
    /// Spawn the worker loop on the blocking pool.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<WorkerMessage>(1);

        let handle = tokio::task::spawn_blocking(move || {
            debug!("rendering worker started");
            while let Some(message) = rx.blocking_recv() {
                let response = match stamp_pdf(
                    &message.request.document_bytes,
                    &message.request.config,
                ) {
                    Ok(bytes) => StampResponse::Document(bytes),
                    Err(err) => {
                        warn!(%err, "document stamping failed");
                        StampResponse::Failed(err.to_string())
                    }
                };
                // The coordinator may have given up on this request; a
                // dropped receiver is not the worker's problem.
                let _ = message.reply.send(response);
            }
            debug!("rendering worker stopped");
        });

        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Stamp one document and await the result.
    ///
    /// Never returns an error: worker trouble of any kind (unreachable
    /// channel, dropped reply) is reported as [`StampResponse::Failed`] so
    /// the batch can record it and continue.
    #[instrument(skip_all, fields(bytes_len = document_bytes.len()))]
    pub async fn stamp(
        &mut self,
        document_bytes: Vec<u8>,
        config: WatermarkConfig,
    ) -> StampResponse {
        let Some(tx) = self.tx.as_ref() else {
            return StampResponse::Failed("worker already shut down".to_string());
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let message = WorkerMessage {
            request: StampRequest {
                document_bytes,
                config,
            },
            reply: reply_tx,
        };

        if tx.send(message).await.is_err() {
            return StampResponse::Failed("worker unreachable".to_string());
        }

        match reply_rx.await {
            Ok(response) => response,
            Err(_) => StampResponse::Failed("worker dropped the reply".to_string()),
        }
    }

    /// Terminate the worker: close the request channel and wait for the
    /// loop to drain. Idempotent against the Drop backstop.
    pub async fn shutdown(mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("rendering worker terminated");
    }
}

impl Drop for PdfWorker {
    fn drop(&mut self) {
        // Closing the sender ends the worker loop even if shutdown() was
        // never reached (early return or panic in the batch run).
        self.tx.take();
    }
}
