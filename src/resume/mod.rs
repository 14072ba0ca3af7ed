//! Resume documents and their persistence.

mod model;
mod store;

pub use model::{Education, PersonalInfo, ResumeData, StoredResume, WorkExperience};
pub use store::{JsonFileStore, ResumeStore, StoreError};
