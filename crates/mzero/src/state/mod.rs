mod files;
mod update;

pub use files::FileRecord;
pub use update::{UpdateEvent, UpdateSessionState};
