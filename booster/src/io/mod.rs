//! I/O adapters: git, external tools, config and state files, HTTP.

pub mod config;
pub mod detect;
pub mod fetch;
pub mod git;
pub mod process;
pub mod pyproject;
pub mod run_state;
pub mod setup_py;
pub mod uv;
