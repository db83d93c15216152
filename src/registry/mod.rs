//! Fingerprint & Map Registry (C6).

mod fingerprint;
mod model;
#[cfg(feature = "postgres")]
mod pg;
mod store;

pub use fingerprint::{AreaType, Fingerprint};
pub use model::{PrecomputedMap, PrecomputedMapBuilder, Status};
#[cfg(feature = "postgres")]
pub use pg::PgMapRegistry;
pub use store::{InMemoryMapRegistry, MapRegistry};
