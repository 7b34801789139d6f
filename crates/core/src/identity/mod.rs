//! Identity matching between legacy users and auth accounts.
//!
//! Email is the only join key and is compared case-insensitively:
//! 1. [`AuthDirectory`] indexes auth accounts by lowercase email
//! 2. [`MappingFile`] renders and writes the resulting legacy/auth pairs

pub mod directory;
pub mod mapping_file;

pub use directory::AuthDirectory;
pub use mapping_file::MappingFile;
