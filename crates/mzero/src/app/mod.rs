//! Client session: the self-update cycle and the file pipeline.

mod auto_update;
mod files;

pub use auto_update::Updater;
pub use files::{CleanSummary, FileSession};
