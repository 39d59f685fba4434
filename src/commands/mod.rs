//! Command implementations
//!
//! Each module corresponds to a mode of the CLI: the chat loop (interactive or
//! single-shot) and the service diagnostics.

pub mod chat;
pub mod health;

// Re-export commonly used types
pub use chat::{run_interactive, run_single_shot, run_turn, spawn_line_reader, stdin_lines, LoopCommand};
pub use health::{run_health, run_stats, CheckStatus, HealthReport};
