//! Incremental event router: turns storage-change notifications into
//! coordinator loads.
//!
//! Notifications arrive either bare or wrapped one level inside a queue
//! message body, and delivery is at-least-once. Malformed records are logged
//! and skipped (one bad record never aborts its siblings) and repeated
//! triggers for the same object are safe because the coordinator's load is
//! idempotent at the content level. No dedup of repeated (bucket, key) pairs
//! happens here; the index's content addressing absorbs them.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::coordinator::IngestionCoordinator;
use crate::types::AssetLocation;

/// One storage-change event extracted from a notification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub bucket: String,
    pub object_key: String,
}

impl StorageEvent {
    /// Asset location addressed by this event.
    pub fn asset_location(&self) -> AssetLocation {
        AssetLocation::bucket(self.bucket.clone(), self.object_key.clone())
    }
}

/// Outcome of handling one envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterOutcome {
    /// Records that triggered a successful load.
    pub processed: usize,
    /// Records skipped because they failed to parse or lacked an object key.
    pub skipped: usize,
    /// Records whose load failed downstream.
    pub failed: usize,
}

impl RouterOutcome {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Records", default)]
    records: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QueueRecord {
    body: String,
}

#[derive(Debug, Deserialize)]
struct StorageRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketRef,
    object: ObjectRef,
}

#[derive(Debug, Deserialize)]
struct BucketRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectRef {
    #[serde(default)]
    key: Option<String>,
}

/// Routes storage notifications to the ingestion coordinator.
#[derive(Clone)]
pub struct EventRouter {
    coordinator: IngestionCoordinator,
}

impl EventRouter {
    pub fn new(coordinator: IngestionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Handle one notification envelope.
    ///
    /// Each valid record yields exactly one asset location and one
    /// coordinator load. Parse failures and missing keys are per-record
    /// diagnostics, never fatal for the envelope.
    pub async fn handle(&self, envelope: &serde_json::Value) -> RouterOutcome {
        let mut outcome = RouterOutcome::default();
        for event in extract_events(envelope, &mut outcome) {
            let location = event.asset_location();
            info!(bucket = %event.bucket, key = %event.object_key, "processing storage event");
            match self.coordinator.load(Some(location)).await {
                Ok(response) => {
                    info!(
                        doc_id = %response.doc_id,
                        indexed = response.indexed_units,
                        "storage event ingested"
                    );
                    outcome.processed += 1;
                }
                Err(err) => {
                    error!(bucket = %event.bucket, key = %event.object_key, %err, "load failed");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }
}

/// Defensively unwrap up to two nesting layers and collect the storage events.
fn extract_events(envelope: &serde_json::Value, outcome: &mut RouterOutcome) -> Vec<StorageEvent> {
    let Ok(outer) = serde_json::from_value::<Envelope>(envelope.clone()) else {
        warn!("notification envelope has no Records array");
        outcome.skipped += 1;
        return Vec::new();
    };

    let mut events = Vec::new();
    for record in outer.records {
        // Queue-wrapped: the storage notification is JSON-encoded in `body`.
        if let Ok(queued) = serde_json::from_value::<QueueRecord>(record.clone()) {
            match serde_json::from_str::<Envelope>(&queued.body) {
                Ok(inner) => {
                    for inner_record in inner.records {
                        collect_storage_record(&inner_record, &mut events, outcome);
                    }
                }
                Err(err) => {
                    warn!(%err, "failed to decode storage event from queue message body");
                    outcome.skipped += 1;
                }
            }
            continue;
        }
        collect_storage_record(&record, &mut events, outcome);
    }
    events
}

fn collect_storage_record(
    record: &serde_json::Value,
    events: &mut Vec<StorageEvent>,
    outcome: &mut RouterOutcome,
) {
    match serde_json::from_value::<StorageRecord>(record.clone()) {
        Ok(parsed) => match parsed.s3.object.key {
            Some(key) if !key.is_empty() => events.push(StorageEvent {
                bucket: parsed.s3.bucket.name,
                object_key: key,
            }),
            _ => {
                warn!(bucket = %parsed.s3.bucket.name, "object key not found in storage event");
                outcome.skipped += 1;
            }
        },
        Err(err) => {
            warn!(%err, "malformed storage record skipped");
            outcome.skipped += 1;
        }
    }
}
