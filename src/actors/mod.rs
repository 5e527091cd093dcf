//! Actor runtime around the pipeline
//!
//! Each actor runs as an independent async task communicating via Tokio
//! channels.
//!
//! ```text
//!   metrics source ──mpsc──▶ NarratorActor ──broadcast──▶ subscribers
//!                                 │                         ▲
//!                                 │ unbounded mpsc          │ PersistFailed
//!                                 ▼                         │
//!                          PersistenceActor ────────────────┘
//!                                 │
//!                                 ▼
//!                           StateBackend
//! ```
//!
//! ## Actor Types
//!
//! - **NarratorActor**: owns the [`Narrator`](crate::pipeline::Narrator), one tick per update
//! - **PersistenceActor**: performs durable writes, fire-and-forget for the narrator
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel
//! 2. **Events**: The narrator publishes [`NarratorEvent`]s on a broadcast channel
//! 3. **Request/Response**: oneshot channels for queries

pub mod messages;
pub mod narrator;
pub mod persistence;

pub use messages::NarratorEvent;
pub use narrator::NarratorHandle;
pub use persistence::PersistenceHandle;
