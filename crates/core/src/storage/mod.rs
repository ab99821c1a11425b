pub mod encryption;
pub mod file;
pub mod format;
pub mod memory;
pub mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::{CredentialStorage, Slot};
