//! The metadata backend boundary: expand input paths, read a file's
//! metadata, and strip it. The rest of the client only talks to
//! [`MetadataBackend`].

mod error;
mod exiftool;
mod expand;
mod traits;
mod types;

pub use error::BackendError;
pub use exiftool::ExifToolBackend;
pub use expand::{expand_paths, is_supported_file};
pub use traits::MetadataBackend;
pub use types::{CleanOptions, CleanResult, MetadataInfo};
