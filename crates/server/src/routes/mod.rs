pub mod index;
pub mod info;
pub mod transcribe;
