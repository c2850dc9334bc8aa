// src/engine/mod.rs

//! The timed assessment session engine: admission, timing, integrity
//! monitoring, scoring and submission, orchestrated by `SessionController`.

pub mod admission;
pub mod controller;
pub mod integrity;
pub mod scoring;
pub mod submission;
pub mod timer;

pub use controller::{AttemptStarted, SessionController, SubmitOutcome};
