//! CLI module for threadlab - command-line interface and subcommands.
//!
//! Provides the main entry point with one subcommand per demonstration.

pub mod commands;

pub use commands::Cli;
