//! Projection worker pool
//!
//! One consumer task per bus partition, so per-aggregate order survives the
//! hop from the log into the read model. A batch counts as consumed only
//! after every event in it has been applied or rebuilt; storage faults are
//! retried with backoff before the batch is abandoned to the next rebuild.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::BankAccount;
use crate::es::{topic_name, AggregateState, BusMessage, Event, InMemoryEventBus};

use super::bank_account::BankAccountProjection;

/// Attempts per event before abandoning the batch.
const MAX_APPLY_ATTEMPTS: u32 = 3;

pub struct ProjectionWorkerPool {
    bus: Arc<InMemoryEventBus>,
    projection: Arc<BankAccountProjection>,
    topic: String,
}

impl ProjectionWorkerPool {
    pub fn new(bus: Arc<InMemoryEventBus>, projection: Arc<BankAccountProjection>) -> Self {
        let topic = topic_name(bus.topic_prefix(), BankAccount::aggregate_type());
        Self {
            bus,
            projection,
            topic,
        }
    }

    /// Spawn one worker per partition. Workers stop when the shutdown signal
    /// fires or the bus closes.
    pub fn start(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.bus.partition_count())
            .map(|partition| {
                let receiver = self.bus.subscribe(partition);
                let projection = Arc::clone(&self.projection);
                let topic = self.topic.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(worker_loop(
                    partition, receiver, projection, topic, shutdown,
                ))
            })
            .collect()
    }
}

async fn worker_loop(
    partition: usize,
    mut receiver: tokio::sync::broadcast::Receiver<BusMessage>,
    projection: Arc<BankAccountProjection>,
    topic: String,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(partition, topic = %topic, "projection worker started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!(partition, "projection worker shutting down");
                break;
            }
            message = receiver.recv() => match message {
                Ok(message) if message.topic == topic => {
                    process_message(&projection, &message).await;
                }
                Ok(_) => {} // another aggregate type sharing the partition
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(partition, skipped, "worker lagged behind the bus; rebuilds will self-heal");
                }
                Err(RecvError::Closed) => {
                    tracing::info!(partition, "bus closed, projection worker stopping");
                    break;
                }
            }
        }
    }
}

/// Apply one bus message, a batch of events from a single commit.
async fn process_message(projection: &BankAccountProjection, message: &BusMessage) {
    let events: Vec<Event> = match serde_json::from_slice(&message.payload) {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(key = %message.key, error = %e, "undecodable bus message dropped");
            return;
        }
    };

    for event in &events {
        let mut attempt = 0;
        loop {
            match projection.handle(event).await {
                Ok(()) => break,
                Err(e) if attempt + 1 < MAX_APPLY_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(
                        aggregate_id = %event.aggregate_id,
                        version = event.version,
                        attempt,
                        error = %e,
                        "projection apply failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(50 * attempt as u64)).await;
                }
                Err(e) => {
                    tracing::error!(
                        aggregate_id = %event.aggregate_id,
                        version = event.version,
                        error = %e,
                        "projection apply failed, abandoning batch"
                    );
                    return;
                }
            }
        }
    }
}
