//! MetadataZero client: settings, logging, the self-update cycle and the file
//! session, driven by the `mzero` binary.

pub mod app;
pub mod error;
pub mod logging;
pub mod settings;
pub mod state;
