//! Relational store for the OMOP ETL.
//!
//! Wraps a single SQLite connection. All reads and writes used by the ETL
//! steps are free functions over `&Connection` so that they run inside
//! whatever transaction scope the caller holds.

pub mod error;
pub mod events;
pub mod lookup;
pub mod observation;
pub mod store;

pub use error::{Result, StoreError};
pub use events::{read_eras, read_raw_events, replace_eras};
pub use lookup::load_concept_lookup;
pub use observation::{
    REGISTRY_PERIOD_TYPE_CONCEPT_ID, SENTINEL_DATE, rebuild_observation_periods,
};
pub use store::Store;
