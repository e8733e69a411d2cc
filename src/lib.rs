pub mod bus;
pub mod config;
pub mod countdown;
pub mod cpu;
pub mod loader;
pub mod logger;
