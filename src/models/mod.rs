pub mod envelope;
pub mod files;
