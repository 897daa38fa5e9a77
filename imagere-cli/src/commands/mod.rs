pub mod process;
pub mod upload;
