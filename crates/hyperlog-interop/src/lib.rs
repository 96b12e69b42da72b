//! # Hyperlog Interop
//!
//! Restart harness for the Hyperlog log store.
//!
//! Each step opens the log of a fixed test identity under a root directory,
//! does its work, closes the log and reports the resulting totals. Running
//! the steps as separate processes checks that a log reopened in a fresh
//! process behaves like one that never closed.
//!
//! | step | work | totals |
//! |------|------|--------|
//! | 1 | create, close, reopen | 0 entries, 0 bytes |
//! | 2 | append `Hello`, `World` | 2 entries, 10 bytes |
//! | 3 | read back, append `first`, then `second`, `third` | 5 entries, 26 bytes |

pub mod cli;
pub mod steps;

pub use cli::{Cli, Command};
pub use steps::{Step, StepOutcome, run_all, run_step, test_key_pair};
