//! cleo CLI binary.
//!
//! All logic lives in the library; `main` only invokes `cli::run()` and
//! maps the returned exit code.

use std::process::ExitCode;

fn main() -> ExitCode {
    cleo::cli::run()
}
