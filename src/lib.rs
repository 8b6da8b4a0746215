pub mod chat;
pub mod cli;
pub mod core;
pub mod transport;
