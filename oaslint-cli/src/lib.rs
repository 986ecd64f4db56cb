// Output rendering is public for use in integration tests
pub mod output;

// Re-export CLI types and functions for testing
pub mod cli;
pub use cli::{Cli, Commands, OutputFormat, run_with_cli};
