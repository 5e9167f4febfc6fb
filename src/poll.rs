//! Fetch → serialize → publish → sleep, until shut down.

use std::time::Duration;

use async_trait::async_trait;
use bon::Builder;
use thiserror::Error;
use tokio::{pin, select, time::sleep};

use crate::{
    api::{emi::FetchError, heartbeat, mqtt::PublishError},
    core::snapshot::PriceSnapshot,
    prelude::*,
};

#[async_trait]
pub trait PriceSource: Sync {
    async fn fetch_snapshot(&self) -> Result<PriceSnapshot, FetchError>;
}

#[async_trait]
pub trait SnapshotSink: Sync {
    async fn publish_payload(&self, payload: String) -> Result<(), PublishError>;
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Builder)]
pub struct PollLoop {
    #[builder(into)]
    interval: Duration,

    /// Log every payload at `info` instead of `debug`.
    #[builder(default)]
    verbose: bool,

    heartbeat: heartbeat::Client,
}

impl PollLoop {
    /// Run the cycles until `shutdown` resolves.
    ///
    /// A failed cycle is logged and skipped, the next one starts after the usual interval.
    /// Returns the number of successfully published cycles.
    pub async fn run<S, P>(&self, source: &S, sink: &P, shutdown: impl Future<Output = ()>) -> usize
    where
        S: PriceSource,
        P: SnapshotSink,
    {
        pin!(shutdown);
        let mut n_published = 0;
        loop {
            select! {
                biased;
                () = &mut shutdown => break,
                result = self.cycle(source, sink) => match result {
                    Ok(()) => {
                        n_published += 1;
                        self.heartbeat.send().await;
                    }
                    Err(error) => {
                        error!("cycle skipped: {error:#}");
                    }
                },
            }
            select! {
                biased;
                () = &mut shutdown => break,
                () = sleep(self.interval) => {}
            }
        }
        info!(n_published, "stopped");
        n_published
    }

    #[instrument(skip_all)]
    async fn cycle<S, P>(&self, source: &S, sink: &P) -> Result<(), CycleError>
    where
        S: PriceSource,
        P: SnapshotSink,
    {
        let snapshot = source.fetch_snapshot().await?;
        if snapshot.is_empty() {
            warn!("the response has no prices");
        }
        let payload = snapshot.to_json().map_err(PublishError::Serialize)?;
        if self.verbose {
            info!(%payload, "publishing…");
        } else {
            debug!(%payload, "publishing…");
        }
        sink.publish_payload(payload).await?;
        Ok(())
    }
}
