//! Application services: request orchestration and the scorer seam.

pub mod computer;
pub mod error;
pub mod score;
