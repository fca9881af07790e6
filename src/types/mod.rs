// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Phantom-typed daemon IDs and parsed image references.

mod id;
mod image_ref;

pub use id::{ContainerId, Id, ImageId};
pub use image_ref::{ImageRef, ParseImageRefError};
