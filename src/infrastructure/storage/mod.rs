//! Storage infrastructure - Storage implementations

mod file;
mod in_memory;

pub use file::FileStorage;
pub use in_memory::InMemoryStorage;
