pub mod geocoding;
pub mod photos;
pub mod record_store;
pub mod submission;
