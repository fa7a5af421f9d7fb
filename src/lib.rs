mod app;
pub mod capture;
mod cli;
pub mod console;
pub mod core;
pub mod recording;
pub mod session;
pub mod shared;

pub use app::{run, AppError};
