pub mod error;
pub mod knowledge_points;
pub mod questions;
pub mod repos;
