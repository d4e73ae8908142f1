pub mod cli;
pub mod error;
pub mod generator;
pub mod logging;
pub mod parser;
pub mod server;
pub mod source;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
