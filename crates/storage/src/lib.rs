//! Storage adapters for the vocabulary trainer.
//!
//! The scheduler core never touches storage directly; it sees the catalog
//! and progress records only through the repository traits defined here.

pub mod repository;
pub mod sqlite;
