use std::fmt;
use std::path::Path;

use pyfind_domain::{parse_python_version, InstallationInfo};
use tracing::{debug, warn};

use crate::config::Config;
use crate::effects::ProcessRunner;
use crate::process::{ProcessError, RunOptions, SoftFailure};

use super::platform::PlatformRules;

pub(crate) const VERSION_FLAG: &str = "--version";
pub(crate) const VIRTUAL_ENV_SCRIPT: &str =
    "import sys; print('Yes' if sys.base_prefix != sys.prefix else 'No')";
pub(crate) const VENV_SUPPORT_ARGS: [&str; 3] = ["-m", "venv", "-h"];
const FILE_TOOL: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Interpreter(InstallationInfo),
    NotAnInterpreter(NotAnInterpreter),
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotAnInterpreter {
    /// `--version` could not be run, failed, or timed out.
    DidNotRun { error: String },
    /// `--version` ran but did not print a Python version.
    UnrecognizedVersion { output: String },
}

impl fmt::Display for NotAnInterpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DidNotRun { error } => write!(f, "version probe failed: {error}"),
            Self::UnrecognizedVersion { output } => {
                write!(f, "unrecognized version output {:?}", output.trim_end())
            }
        }
    }
}

/// Runs the interpreter probes for one candidate at a time.
pub struct Prober<'a> {
    process: &'a dyn ProcessRunner,
    options: RunOptions,
    inspect_architectures: bool,
}

impl<'a> Prober<'a> {
    pub fn new(process: &'a dyn ProcessRunner, config: &Config, rules: &dyn PlatformRules) -> Self {
        Self {
            process,
            options: config.run_options(),
            inspect_architectures: rules.inspects_architectures(),
        }
    }

    /// Probes `path`, returning whether it is a usable interpreter.
    ///
    /// # Errors
    /// Only infrastructural failures such as broken output pipes are errors;
    /// a candidate that does not behave like Python yields
    /// [`ProbeOutcome::NotAnInterpreter`].
    pub fn probe(&self, path: &Path) -> Result<ProbeOutcome, ProcessError> {
        let program = path.to_string_lossy().into_owned();
        let output = match self.run(&program, &[VERSION_FLAG]) {
            Ok(output) => output,
            Err(err) if err.is_soft() => {
                debug!(path = %path.display(), %err, "not an interpreter");
                return Ok(ProbeOutcome::NotAnInterpreter(NotAnInterpreter::DidNotRun {
                    error: err.to_string(),
                }));
            }
            Err(err) => return Err(err),
        };
        let text = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        let Some(version) = parse_python_version(text) else {
            debug!(path = %path.display(), output = text.trim_end(), "unrecognized version output");
            return Ok(ProbeOutcome::NotAnInterpreter(
                NotAnInterpreter::UnrecognizedVersion {
                    output: text.clone(),
                },
            ));
        };

        let architectures = if self.inspect_architectures {
            self.architectures(path, &program)?
        } else {
            None
        };
        let is_virtual_env = self.is_virtual_env(path, &program)?;
        let supports_virtual_env = self.run(&program, &VENV_SUPPORT_ARGS).soft()?.is_some();

        debug!(
            path = %path.display(),
            %version,
            is_virtual_env,
            supports_virtual_env,
            "found interpreter"
        );
        Ok(ProbeOutcome::Interpreter(InstallationInfo {
            version,
            architectures,
            is_virtual_env,
            supports_virtual_env,
        }))
    }

    fn architectures(&self, path: &Path, program: &str) -> Result<Option<Vec<String>>, ProcessError> {
        let args = [FILE_TOOL.to_string(), program.to_string()];
        match self.process.run(&args, &self.options).soft()? {
            Some(output) => Ok(Some(parse_architectures(&output.stdout))),
            None => {
                warn!(path = %path.display(), "could not determine architectures");
                Ok(None)
            }
        }
    }

    fn is_virtual_env(&self, path: &Path, program: &str) -> Result<bool, ProcessError> {
        match self.run(program, &["-c", VIRTUAL_ENV_SCRIPT]).soft()? {
            Some(output) => Ok(output.stdout.trim_end_matches(['\r', '\n']) == "Yes"),
            None => {
                warn!(path = %path.display(), "could not determine whether interpreter is a virtual environment");
                Ok(false)
            }
        }
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<crate::process::RunOutput, ProcessError> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(program.to_string());
        argv.extend(args.iter().map(|arg| (*arg).to_string()));
        self.process.run(&argv, &self.options)
    }
}

/// Architecture tokens from `file` output lines ending in `executable <arch>`.
fn parse_architectures(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (head, arch) = line.rsplit_once(' ')?;
            let is_token = !arch.is_empty()
                && arch
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
            (head.ends_with("executable") && is_token).then(|| arch.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSnapshot;
    use crate::core::discovery::platform::PosixRules;
    use crate::core::discovery::test_support::{FakeResponse, FakeRunner};
    use pyfind_domain::PythonVersion;

    const PY: &str = "/usr/bin/python3";

    fn config() -> Config {
        Config::from_snapshot(EnvSnapshot::testing(&[])).expect("config")
    }

    fn probe_with(runner: &FakeRunner, rules: &dyn PlatformRules) -> ProbeOutcome {
        let config = config();
        Prober::new(runner, &config, rules)
            .probe(Path::new(PY))
            .expect("probe")
    }

    #[test]
    fn working_interpreter_reports_info() {
        let mut runner = FakeRunner::default();
        runner.interpreter(PY, "3.11.4", true);
        let outcome = probe_with(&runner, &PosixRules::default());
        assert_eq!(
            outcome,
            ProbeOutcome::Interpreter(InstallationInfo {
                version: PythonVersion::new(3, 11, 4),
                architectures: None,
                is_virtual_env: true,
                supports_virtual_env: true,
            })
        );
    }

    #[test]
    fn python2_version_on_stderr_is_accepted() {
        let mut runner = FakeRunner::default();
        runner
            .interpreter(PY, "2.7.18", false)
            .respond(&[PY, "--version"], FakeResponse::stderr("Python 2.7.18\r\n"));
        match probe_with(&runner, &PosixRules::default()) {
            ProbeOutcome::Interpreter(info) => {
                assert_eq!(info.version, PythonVersion::new(2, 7, 18));
                assert!(!info.is_virtual_env);
            }
            other => panic!("expected interpreter, got {other:?}"),
        }
    }

    #[test]
    fn failing_version_probe_rejects_candidate() {
        let mut runner = FakeRunner::default();
        runner.respond(&[PY, "--version"], FakeResponse::Exit(1));
        assert!(matches!(
            probe_with(&runner, &PosixRules::default()),
            ProbeOutcome::NotAnInterpreter(NotAnInterpreter::DidNotRun { .. })
        ));

        runner.respond(&[PY, "--version"], FakeResponse::Timeout);
        assert!(matches!(
            probe_with(&runner, &PosixRules::default()),
            ProbeOutcome::NotAnInterpreter(NotAnInterpreter::DidNotRun { .. })
        ));
        assert_eq!(runner.call_count(&[PY, "-c", VIRTUAL_ENV_SCRIPT]), 0);
    }

    #[test]
    fn unrecognized_version_output_rejects_candidate() {
        let mut runner = FakeRunner::default();
        runner
            .interpreter(PY, "3.11.4", false)
            .respond(&[PY, "--version"], FakeResponse::stdout("Python 3.11\n"));
        assert!(matches!(
            probe_with(&runner, &PosixRules::default()),
            ProbeOutcome::NotAnInterpreter(NotAnInterpreter::UnrecognizedVersion { .. })
        ));
    }

    #[test]
    fn optional_probe_failures_are_soft() {
        let mut runner = FakeRunner::default();
        runner
            .respond(&[PY, "--version"], FakeResponse::stdout("Python 3.12.1\n"))
            .respond(&[PY, "-c", VIRTUAL_ENV_SCRIPT], FakeResponse::Timeout)
            .respond(&[PY, "-m", "venv", "-h"], FakeResponse::Exit(1));
        match probe_with(&runner, &PosixRules::new(true)) {
            ProbeOutcome::Interpreter(info) => {
                assert_eq!(info.architectures, None);
                assert!(!info.is_virtual_env);
                assert!(!info.supports_virtual_env);
            }
            other => panic!("expected interpreter, got {other:?}"),
        }
    }

    #[test]
    fn architectures_are_read_from_file_output_on_multi_arch_hosts() {
        let mut runner = FakeRunner::default();
        runner.interpreter(PY, "3.12.1", false).respond(
            &["file", PY],
            FakeResponse::stdout(
                "/usr/bin/python3: Mach-O universal binary with 2 architectures: [x86_64:Mach-O 64-bit executable x86_64] [arm64e]\n\
                 /usr/bin/python3 (for architecture x86_64):\tMach-O 64-bit executable x86_64\n\
                 /usr/bin/python3 (for architecture arm64e):\tMach-O 64-bit executable arm64e\n",
            ),
        );
        match probe_with(&runner, &PosixRules::new(true)) {
            ProbeOutcome::Interpreter(info) => assert_eq!(
                info.architectures,
                Some(vec!["x86_64".to_string(), "arm64e".to_string()])
            ),
            other => panic!("expected interpreter, got {other:?}"),
        }
    }

    #[test]
    fn architectures_are_absent_on_single_arch_hosts() {
        let mut runner = FakeRunner::default();
        runner.interpreter(PY, "3.12.1", false);
        match probe_with(&runner, &PosixRules::new(false)) {
            ProbeOutcome::Interpreter(info) => assert_eq!(info.architectures, None),
            other => panic!("expected interpreter, got {other:?}"),
        }
        assert_eq!(runner.call_count(&["file", PY]), 0);
    }

    #[test]
    fn architecture_lines_require_executable_suffix() {
        let parsed = parse_architectures(
            "a: ELF 64-bit LSB executable, x86-64\nb: Mach-O executable i386\nc: data x86_64\n",
        );
        assert_eq!(parsed, vec!["i386".to_string()]);
    }
}
