// wright-core/src/domain/compiler/mod.rs

pub mod ddl_parser;

pub use ddl_parser::{ParsedColumn, ParsedDdl, parse_ddl};
