pub mod config;
pub mod executor;
pub mod history;
pub mod shared;
pub mod trading;
