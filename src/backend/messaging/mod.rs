//! Message persistence and the REST surface over it.

pub mod handlers;
pub mod store;

pub use store::MessageStore;
