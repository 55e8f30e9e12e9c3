pub mod arm;
pub mod config;
pub mod filter;
pub mod gesture;
pub mod hand;
pub mod hit;
pub mod pipeline;
pub mod protocol;
pub mod source;
