mod capture;
mod config;
mod restore;

pub use capture::*;
pub use config::*;
pub use restore::*;
