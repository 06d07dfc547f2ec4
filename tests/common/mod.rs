//! Shared harness for the end-to-end scenario tests (spec.md §8): drive the
//! compiled binary through `assert_cmd`, with `CLEO_DIR` pointed at a fresh
//! `tempfile::TempDir` so each test gets its own isolated store and never
//! touches a real `~/.cleo`.

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    /// Build a `cleo` invocation scoped to this fixture's store, with a
    /// nonexistent home config path so the real developer `~/.cleo/config.json`
    /// can never leak into a test run.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cleo").unwrap();
        cmd.env("CLEO_DIR", self.dir.path().join(".cleo"))
            .arg("--config-path")
            .arg(self.dir.path().join("unused-config.json"))
            .arg("--format")
            .arg("json");
        cmd
    }

    /// Run `args`, parse stdout as the envelope, and return it. Does not
    /// assert success or failure — callers inspect `envelope["success"]`.
    pub fn run(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).output().unwrap();
        serde_json::from_slice(&output.stdout)
            .unwrap_or_else(|e| panic!("stdout was not a JSON envelope: {e}\nstdout={:?}\nstderr={:?}",
                String::from_utf8_lossy(&output.stdout), String::from_utf8_lossy(&output.stderr)))
    }

    /// Like `run`, but attributed to `actor` rather than the default
    /// `agent:cli` identity (spec.md §8 S5 needs three distinct attributors).
    pub fn run_as(&self, actor: &str, args: &[&str]) -> Value {
        let mut full = vec!["--actor", actor];
        full.extend_from_slice(args);
        let output = self.cmd().args(&full).output().unwrap();
        serde_json::from_slice(&output.stdout)
            .unwrap_or_else(|e| panic!("stdout was not a JSON envelope: {e}\nstdout={:?}\nstderr={:?}",
                String::from_utf8_lossy(&output.stdout), String::from_utf8_lossy(&output.stderr)))
    }

    pub fn create_task(&self, title: &str, extra: &[&str]) -> String {
        let mut args = vec!["task", "create", "--title", title];
        args.extend_from_slice(extra);
        let envelope = self.run(&args);
        assert!(envelope["success"].as_bool().unwrap(), "task create failed: {envelope}");
        envelope["result"]["id"].as_str().unwrap().to_string()
    }
}

pub fn exit_code(envelope: &Value) -> i64 {
    envelope["error"]["exitCode"].as_i64().unwrap()
}

pub fn error_code(envelope: &Value) -> &str {
    envelope["error"]["code"].as_str().unwrap()
}
