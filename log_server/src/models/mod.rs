//! Log ingestion data models.

pub mod entry;
pub mod event;
pub mod lease;
pub mod run;
pub mod tag;
