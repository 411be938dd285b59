//! Incremental delivery of discovery results.
//!
//! The producer pushes [`StreamLine`]s into a bounded channel as soon as they
//! exist; the consumer (HTTP body or stdout) drains the receiving end. When the
//! receiver is dropped the emitter reports [`StreamError::Disconnected`] and
//! [`Emitter::closed`] resolves, which is how the producer learns to stop.

use {
    tokio::sync::mpsc,
    tokio_stream::wrappers::ReceiverStream,
    tracing::{debug, info},
};

use crate::{
    error::StreamError,
    record::{DiscoveryRecord, StreamLine},
};

/// Sent before the completion line when a run found nothing.
pub const NO_RESULTS_MESSAGE: &str =
    "No hospitals/doctors found. The browser endpoint may be unreachable or the results page may have changed.";

/// Write side of a discovery stream.
#[derive(Debug)]
pub struct Emitter {
    tx: mpsc::Sender<StreamLine>,
    count: u64,
}

impl Emitter {
    /// Create an emitter and the stream that reads from it.
    pub fn channel(capacity: usize) -> (Self, ReceiverStream<StreamLine>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), ReceiverStream::new(rx))
    }

    pub fn new(tx: mpsc::Sender<StreamLine>) -> Self {
        Self { tx, count: 0 }
    }

    /// Records emitted so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Deliver one record.
    pub async fn emit(&mut self, record: DiscoveryRecord) -> Result<(), StreamError> {
        info!(name = %record.name, query = %record.search_query, "record emitted");
        self.send(StreamLine::Record(record)).await?;
        self.count += 1;
        Ok(())
    }

    /// End a completed run.
    pub async fn finish(self) -> Result<u64, StreamError> {
        if self.count == 0 {
            self.send(StreamLine::failure(NO_RESULTS_MESSAGE)).await?;
        }
        self.send(StreamLine::done(self.count)).await?;
        debug!(count = self.count, "stream finished");
        Ok(self.count)
    }

    /// End a run that could not proceed. No completion line follows.
    pub async fn fail(self, message: impl Into<String>) -> Result<(), StreamError> {
        self.send(StreamLine::failure(message)).await
    }

    /// Resolves once the consumer has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, line: StreamLine) -> Result<(), StreamError> {
        self.tx
            .send(line)
            .await
            .map_err(|_| StreamError::Disconnected)
    }
}
