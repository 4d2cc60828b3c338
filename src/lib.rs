//! Studyhall: an exam-preparation content service.
//!
//! Knowledge points and questions live in Postgres behind repository
//! traits. Reads flow through a read-through cache with per-namespace
//! TTLs; every successful detail read feeds a popularity tracker that
//! ranks entities by access count and degrades to creation recency when
//! ranking data is unavailable.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
