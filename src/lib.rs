//! tkmodel
//!
//! Reader for the chunked TKMD binary model format. A decoded model carries
//! its materials, bone hierarchy, and meshes with GPU-ready vertex and index
//! buffers. Buffers and textures are produced by caller-supplied collaborators,
//! so the same decoder serves a wgpu device or plain host memory.
//!
//! The crate also ships a tiny render-to-raster flow that draws a rounded
//! rectangle on the CPU and writes it out as a JPEG.
//!
//! High-level modules
//! - `context`: headless wgpu device and queue
//! - `data_structures`: decoded model types, attribute maps, and GPU textures
//! - `reader`: the TKMD decoder, its error type, and construction hooks
//! - `render`: the vector-to-JPEG raster flow
//! - `resources`: buffer allocators, texture loaders, and asset loading helpers
//!

pub mod context;
pub mod data_structures;
pub mod reader;
pub mod render;
pub mod resources;

pub use reader::{ModelError, ModelReader, read_model};
