pub mod client;
pub mod memory;
pub mod navigator;
pub mod protocol;
pub mod variables;
