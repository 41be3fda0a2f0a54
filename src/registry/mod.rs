//! Subscriber registry and fan-out
//!
//! The registry holds the set of connected subscribers and the broadcaster
//! routes decoded messages to all of them.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<ClientRegistry>
//!                     ┌─────────────────────────┐
//!                     │ clients: BTreeMap<id,   │
//!                     │   ClientHandle {        │
//!                     │     tx: mpsc::Sender,   │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │ snapshot()
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [UDP ingest]            [writer task]           [writer task]
//!   decode()                 rx.recv()               rx.recv()
//!         │                       │                       │
//!         └──► Broadcaster::publish() ──► try_send() ──► WebSocket
//! ```
//!
//! # Isolation
//!
//! Each subscriber has its own bounded queue. `try_send` never waits, so a
//! subscriber that stops reading only fills its own queue and is then removed.
//! The envelope is serialized once into an `Arc<str>` that every queue
//! shares. The writer copies it into the WebSocket text frame, so each
//! subscriber costs one copy at write time and none at publish time.

pub mod broadcast;
pub mod entry;
pub mod envelope;
pub mod error;
pub mod store;

pub use broadcast::{Broadcaster, PublishReport};
pub use entry::ClientHandle;
pub use envelope::{iso_timestamp, message_frame, welcome_frame, OutboundFrame};
pub use error::SendError;
pub use store::ClientRegistry;
