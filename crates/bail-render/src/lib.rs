//! Bail Template Renderer
//!
//! Turns a partial or complete document state into the printable contract.
//!
//! # Core Concepts
//!
//! - [`Outline`]: declarative clause tree, compiled against the schema
//! - [`render`]: pure state → [`RenderResult`] with blank markers for
//!   unresolved required fields
//! - [`ProgressReport`]: per-section completion figures
//! - [`RenderCache`]: moka cache keyed by session, state version and schema

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod error;
mod format;
mod outline;
mod renderer;
mod report;

pub use cache::{RenderCache, RenderKey};
pub use error::RenderStructuralError;
pub use format::{escape_html, format_bool, format_money, format_number, format_value};
pub use outline::{Node, Outline, FURNISHED_LEASE_OUTLINE};
pub use renderer::{render, RenderResult};
pub use report::{
    progress, section_details, section_progress, unresolved, FieldDetail, ProgressReport,
    SectionDetails, SectionProgress,
};
