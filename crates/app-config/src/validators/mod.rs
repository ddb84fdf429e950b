pub mod directory;
pub mod file;
