//! Core data model types for part records and addresses.

pub mod address;
pub mod part;
