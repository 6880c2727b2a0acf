pub mod files;
pub mod slug;

pub use files::{Storage, StorageError};
pub use slug::safe_filename;
