//! Object-store seam of the Burrow gateway: a repository of files that can be
//! read by path and written through atomic multi-file commits.

pub mod commit;
pub mod error;
pub mod gitlab;
pub mod memory;
pub mod store;

pub use commit::{Commit, CommitAction, Encoding};
pub use error::{Result, StorageError};
pub use gitlab::GitLabStore;
pub use memory::InMemoryObjectStore;
pub use store::{ObjectStore, StoreTarget};
