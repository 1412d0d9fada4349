//! # ragline: retrieval-augmented chat assistant core
//!
//! ```text
//! Object store ──► loader::BucketLoader ──► LoadOutcome (doc_id + units)
//!                        │                        │
//!                        └── scan::DocumentScanner┘
//!                                                 │
//! Storage notifications ──► router::EventRouter ──► coordinator::IngestionCoordinator
//!                                                 │
//!                                                 ▼
//!                                     index::KnowledgeIndex (boundary)
//!                                                 ▲
//! Chat triggers ──► dispatch::Dispatcher ──► query::QueryService
//!        │                │
//!        ack (≤ deadline) └── deferred worker ──► chat::ChatPlatform
//! ```
//!
//! Two pipelines share one boundary index: bulk ingestion (bucket listing,
//! staging, extraction, content-addressed fingerprinting) and chat dispatch
//! (immediate acknowledgment, deferred query/format/post). Everything external
//! (the object store, the retrieval engine, the secret manager, the chat
//! platform) sits behind a trait in its own module.

pub mod chat;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod index;
pub mod loader;
pub mod query;
pub mod router;
pub mod scan;
pub mod store;
pub mod telemetry;
pub mod types;

pub use chat::{ChatPlatform, Command, Trigger};
pub use config::{Config, ConfigError, SecretStore};
pub use coordinator::IngestionCoordinator;
pub use dispatch::{DispatchRequest, Dispatcher};
pub use index::{IndexResponse, KnowledgeIndex, MemoryIndex};
pub use loader::BucketLoader;
pub use query::{QueryOptions, QueryReply, QueryService};
pub use router::EventRouter;
pub use scan::{DocumentScanner, FsScanner};
pub use store::ObjectStore;
pub use types::{AssetLocation, ContentUnit, LoadOutcome};
