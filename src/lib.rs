//! Ripple - Presence and Real-Time Message Delivery Core
//!
//! Ripple is the real-time core of a two-party chat application:
//! a WebSocket + REST server that persists messages with delivered/seen
//! acknowledgment, tracks which users are reachable across multiple
//! concurrent connections, and a transport-agnostic client library that
//! reconciles optimistic local sends against server-confirmed state.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and client
//!   - The canonical message model and wire event contract
//!   - Conversation/room identity helpers
//!   - The error taxonomy
//!
//! - **`backend`** - Server-side code
//!   - Axum HTTP server with the WebSocket delivery protocol
//!   - In-memory presence registry with staleness sweeping
//!   - SQLite message store via sqlx
//!   - JWT session verification and auth middleware
//!
//! - **`client`** - Client-side reconciliation core
//!   - Optimistic message list with temp-id replacement and dedup
//!   - Send orchestration (realtime-first, HTTP fallback, bounded retry)
//!
//! # Thread Safety
//!
//! Server state is shared via `Arc`; the presence registry and fan-out
//! hub guard their maps with a single std `Mutex` each and never hold a
//! lock across an await point.

pub mod backend;
pub mod client;
pub mod shared;
