#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;

const PYFIND_VARS: [&str; 5] = [
    "PYFIND_TIMEOUT_MS",
    "PYFIND_JOBS",
    "PYFIND_CONDA",
    "PYFIND_PATH_FROM_SHELL",
    "PYFIND_MAX_CAPTURE_BYTES",
];

/// `pyfind` with `PATH` limited to `search_path` and no environment manager.
pub fn pyfind(search_path: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("pyfind");
    for var in PYFIND_VARS {
        cmd.env_remove(var);
    }
    cmd.env("PATH", search_path)
        .env("PYFIND_CONDA", "off")
        .env("NO_COLOR", "1");
    cmd
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("script dir");
    }
    fs::write(path, format!("#!/bin/sh\n{body}")).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

/// A shell script that answers the interpreter probes like Python `version`.
#[cfg(unix)]
pub fn fake_python(path: &Path, version: &str, virtual_env: bool) -> PathBuf {
    let prefix = if virtual_env { "Yes" } else { "No" };
    write_script(
        path,
        &format!(
            "case \"$1\" in\n  --version) echo \"Python {version}\" ;;\n  -c) echo \"{prefix}\" ;;\n  -m) exit 0 ;;\n  *) exit 2 ;;\nesac\n"
        ),
    );
    path.to_path_buf()
}

pub fn key(path: &Path) -> String {
    path.display().to_string()
}
