pub mod artifacts;
pub mod backend;
pub mod error;

pub use artifacts::{ArtifactStore, ObjectArtifactStore};
pub use backend::build_bucket;
pub use error::StorageError;
