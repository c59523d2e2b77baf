pub mod commit;
pub mod repository;

pub use commit::{CommitRecord, ParsedCommit, Section};
pub use repository::{AuthorIdentity, Repository};
