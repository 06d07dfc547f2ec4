//! cleo - a single-user, multi-agent task-management engine.
//!
//! The store, hierarchy, gate, lifecycle, session, audit, and query logic
//! lives in the `cleo-*` crates this binary composes through `cleo-engine`.
//! This crate is the CLI shell: argument parsing, config resolution, and
//! envelope rendering.

pub mod cli;
