pub mod app;

pub use crate::app::{run, AppConfig, Command};
