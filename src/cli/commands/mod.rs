//! CLI command implementations

pub mod config;
pub mod post;
pub mod setup;

pub use config::execute as config;
pub use post::execute as post;
pub use setup::execute as setup;
