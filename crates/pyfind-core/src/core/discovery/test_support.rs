use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::effects::{Effects, FileSystem, ProcessRunner};
use crate::process::{ProcessError, RunOptions, RunOutput};

use super::probe::{VENV_SUPPORT_ARGS, VIRTUAL_ENV_SCRIPT};

#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    Output { stdout: String, stderr: String },
    Exit(i32),
    Timeout,
}

impl FakeResponse {
    pub(crate) fn stdout(text: &str) -> Self {
        Self::Output {
            stdout: text.to_string(),
            stderr: String::new(),
        }
    }

    pub(crate) fn stderr(text: &str) -> Self {
        Self::Output {
            stdout: String::new(),
            stderr: text.to_string(),
        }
    }
}

/// Scripted process runner keyed by the exact argument vector.
#[derive(Default)]
pub(crate) struct FakeRunner {
    responses: HashMap<Vec<String>, FakeResponse>,
    programs: HashMap<String, PathBuf>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub(crate) fn respond(&mut self, args: &[&str], response: FakeResponse) -> &mut Self {
        let key = args.iter().map(|arg| (*arg).to_string()).collect();
        self.responses.insert(key, response);
        self
    }

    /// Scripts a working interpreter at `path`.
    pub(crate) fn interpreter(&mut self, path: &str, version: &str, venv: bool) -> &mut Self {
        self.respond(
            &[path, "--version"],
            FakeResponse::stdout(&format!("Python {version}\n")),
        );
        self.respond(
            &[path, "-c", VIRTUAL_ENV_SCRIPT],
            FakeResponse::stdout(if venv { "Yes\n" } else { "No\n" }),
        );
        let mut venv_args = vec![path];
        venv_args.extend(VENV_SUPPORT_ARGS);
        self.respond(&venv_args, FakeResponse::stdout("usage: venv\n"));
        self
    }

    pub(crate) fn program(&mut self, name: &str, path: &str) -> &mut Self {
        self.programs.insert(name.to_string(), PathBuf::from(path));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn call_count(&self, args: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.iter().map(String::as_str).eq(args.iter().copied()))
            .count()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, args: &[String], options: &RunOptions) -> Result<RunOutput, ProcessError> {
        self.calls.lock().expect("calls lock").push(args.to_vec());
        let program = args.first().cloned().ok_or(ProcessError::EmptyCommand)?;
        match self.responses.get(args) {
            Some(FakeResponse::Output { stdout, stderr }) => Ok(RunOutput {
                code: 0,
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            Some(FakeResponse::Exit(code)) => Err(ProcessError::Exit {
                program,
                code: Some(*code),
                stderr: String::new(),
            }),
            Some(FakeResponse::Timeout) => Err(ProcessError::Timeout {
                program,
                timeout: options.timeout.max(Duration::from_millis(1)),
            }),
            None => Err(ProcessError::Spawn {
                program,
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.programs.get(program).cloned()
    }
}

type LinkRule = Box<dyn Fn(&Path) -> Option<PathBuf> + Send + Sync>;

/// In-memory directory listings and symlinks.
#[derive(Default)]
pub(crate) struct FakeFs {
    dirs: HashMap<PathBuf, Vec<OsString>>,
    files: HashSet<PathBuf>,
    links: HashMap<PathBuf, PathBuf>,
    denied: HashSet<PathBuf>,
    broken_links: HashSet<PathBuf>,
    link_rule: Option<LinkRule>,
}

impl FakeFs {
    pub(crate) fn dir(&mut self, path: impl AsRef<Path>, entries: &[&str]) -> &mut Self {
        let dir = path.as_ref().to_path_buf();
        for entry in entries {
            self.files.insert(dir.join(entry));
        }
        self.dirs
            .insert(dir, entries.iter().map(OsString::from).collect());
        self
    }

    pub(crate) fn file(&mut self, path: &str) -> &mut Self {
        self.files.insert(PathBuf::from(path));
        self
    }

    pub(crate) fn link(&mut self, path: &str, target: &str) -> &mut Self {
        self.links.insert(PathBuf::from(path), PathBuf::from(target));
        self
    }

    pub(crate) fn deny(&mut self, path: &str) -> &mut Self {
        self.denied.insert(PathBuf::from(path));
        self
    }

    pub(crate) fn unreadable_link(&mut self, path: &str) -> &mut Self {
        self.broken_links.insert(PathBuf::from(path));
        self
    }

    pub(crate) fn link_rule(
        &mut self,
        rule: impl Fn(&Path) -> Option<PathBuf> + Send + Sync + 'static,
    ) -> &mut Self {
        self.link_rule = Some(Box::new(rule));
        self
    }
}

impl FileSystem for FakeFs {
    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<OsString>> {
        if self.denied.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if let Some(entries) = self.dirs.get(path) {
            return Ok(entries.clone());
        }
        if self.files.contains(path) {
            return Err(io::Error::from(io::ErrorKind::NotADirectory));
        }
        Err(io::Error::from(io::ErrorKind::NotFound))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        if self.broken_links.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        if let Some(target) = self.links.get(path) {
            return Ok(target.clone());
        }
        if let Some(target) = self.link_rule.as_ref().and_then(|rule| rule(path)) {
            return Ok(target);
        }
        Err(io::Error::from(io::ErrorKind::InvalidInput))
    }
}

#[derive(Default)]
pub(crate) struct FakeEffects {
    pub(crate) runner: FakeRunner,
    pub(crate) fs: FakeFs,
}

impl Effects for FakeEffects {
    fn process(&self) -> &dyn ProcessRunner {
        &self.runner
    }

    fn fs(&self) -> &dyn FileSystem {
        &self.fs
    }
}
