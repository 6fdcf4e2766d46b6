pub mod grading;
pub mod loader;
pub mod output;
pub mod records;
