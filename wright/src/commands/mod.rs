// wright/src/commands/mod.rs

pub mod clean;
pub mod diff;
pub mod discover;
pub mod generate;
pub mod list;
pub mod validate;
