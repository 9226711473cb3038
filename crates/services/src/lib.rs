#![forbid(unsafe_code)]

//! Application services for the vocabulary trainer.
//!
//! The scheduling core is pure; these services bind it to a storage
//! backend and a clock, and drive the study loop one snapshot at a time.

pub mod app_services;
pub mod error;
pub mod rating_service;
pub mod session_service;

pub use vocab_core::time::Clock;

pub use app_services::AppServices;
pub use error::{BootstrapError, RatingServiceError, SessionServiceError};
pub use rating_service::{RatedCard, RatingService};
pub use session_service::{SessionService, StudySnapshot};
