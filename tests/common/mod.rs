#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

pub const SITE: &str = r#"{
    "default": {"title": "Fallback", "scriptResult": "plain"},
    "pages": {
        "example.com": {
            "title": "Example Domain",
            "uri": "https://example.com/",
            "timing": {"start": 0.25, "load": 0.5, "finish": 1.0},
            "scriptResult": {"links": 1, "tags": ["a", "b"]},
            "scripts": {"document.title": "Example Domain"},
            "snapshot": {"width": 6, "height": 4, "color": [10, 200, 30, 255]}
        },
        "example.org": {
            "title": "Example Org",
            "scriptResult": 42,
            "snapshot": {"width": 3, "height": 2, "color": [0, 0, 0, 255]}
        },
        "slow.test": {"loadDelayMs": 10000},
        "empty.test": {"snapshot": null},
        "flat.test": {"snapshot": {"width": 0, "height": 5}},
        "broken.test": {"fail": "wait"},
        "noscript.test": {"fail": "evaluate"}
    }
}"#;

/// Scratch directory holding the fixture site and an isolated config home.
pub struct Sandbox {
    pub dir: TempDir,
    fixture: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let fixture = dir.path().join("site.json");
        std::fs::write(&fixture, SITE).expect("write fixture");
        Self { dir, fixture }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_render"));
        cmd.args(args)
            .env("RENDER_FIXTURE", &self.fixture)
            .env("XDG_CONFIG_HOME", self.dir.path().join("config-home"))
            .env_remove("RUST_LOG")
            .current_dir(self.dir.path());
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("run render")
    }

    pub fn run_with_stdin(&self, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn render");
        child
            .stdin
            .take()
            .expect("stdin")
            .write_all(input.as_bytes())
            .expect("write stdin");
        child.wait_with_output().expect("wait for render")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn image_size(path: &Path) -> (u32, u32) {
    let img = image::open(path).expect("decode written image");
    (img.width(), img.height())
}
