//! Read-through score cache with JSON, text and SVG badge output.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
