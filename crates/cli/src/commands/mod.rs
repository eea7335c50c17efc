//! CLI subcommands

pub mod catalog;
pub mod classify;
pub mod quote;
