pub mod command;
pub mod file;
pub mod process;
pub mod report;
pub mod system;
