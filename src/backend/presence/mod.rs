pub mod registry;

pub use registry::{DeregisterOutcome, PresenceRegistry, RegisterOutcome};
