//! Image intake stages that run before classification.
//!
//! - **fetch**: Retrieve client-supplied image URLs under time and size bounds
//! - **decode**: Validate the payload is an image and normalize it to RGB PNG

pub mod decode;
pub mod fetch;

// Re-exports for convenient access
pub use decode::{ImageDecoder, PreparedImage};
pub use fetch::{HttpImageFetcher, ImageSource};
