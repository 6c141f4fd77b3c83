//! Decoded model data.
//!
//! - `model` contains the model, material, bone, and mesh types produced by the reader
//! - `attributes` holds the ordered key/value maps attached to most records
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod attributes;
pub mod model;
pub mod texture;
