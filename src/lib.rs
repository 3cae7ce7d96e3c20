pub mod config;
pub mod console;
pub mod error;
pub mod eventlog;
pub mod feeder;
pub mod receiver;
pub mod scheduler;
pub mod session;
pub mod shutdown;
