#![deny(missing_docs)]
#![doc = "Core data types, fixed packing constants and errors shared by the scalar-coupling pipeline crates."]

pub mod errors;
pub mod provenance;
pub mod record;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, SccError};
pub use provenance::{RunProvenance, SchemaVersion};
pub use record::{
    Contributions, CouplingRecord, CouplingSlot, PathDescriptor, COUPLING_FIELDS,
    COUPLING_FIELD_NAMES, COUPLING_MAX, COUPLING_WIDTH, FIELD_GAUSSRANK, FIELD_ID, FIELD_TARGET,
    FIELD_TYPE, PATH_ABSENT,
};
pub use rng::{derive_substream_seed, RngHandle};
pub use types::{CouplingType, PairId};
