pub mod fixame;
pub mod status;
