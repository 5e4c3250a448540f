//! Response rendering: JSON, plain text and SVG badges.

pub mod badge;
pub mod render;

pub use badge::{BadgeRenderer, BadgeTemplateError};
pub use render::{Rendered, ResponseRenderer, etag_for};
