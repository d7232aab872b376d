pub mod cli;
pub mod config;
pub mod generator;
pub mod parser;
pub mod pipeline;
pub mod transform;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
