pub mod cache;
pub mod memory;
pub mod notifications;
pub mod requests;
pub mod service;
pub mod store;

pub use crate::memory::{MemoryStore, StoreSnapshot};
pub use crate::service::{CheckInOutcome, GardenService, GardenServiceBuilder, GardenSnapshot, GardenZone};
pub use crate::store::{DateRange, GardenStore};
