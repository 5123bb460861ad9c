use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A CPython release number, `major.minor.patch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl PythonVersion {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for PythonVersion {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        parse_triple(input).ok_or_else(|| anyhow!("invalid python version `{input}`"))
    }
}

impl Serialize for PythonVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PythonVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses the output of `python --version`.
///
/// The whole text must be a single `Python <major>.<minor>.<patch>` line
/// terminated by `\n` or `\r\n`. Pre-releases, two-component versions and
/// anything with extra text are rejected.
#[must_use]
pub fn parse_python_version(output: &str) -> Option<PythonVersion> {
    let line = output.strip_suffix('\n')?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    let rest = line.strip_prefix("Python ")?;
    parse_triple(rest)
}

fn parse_triple(input: &str) -> Option<PythonVersion> {
    let mut parts = input.split('.');
    let major = parse_component(parts.next()?)?;
    let minor = parse_component(parts.next()?)?;
    let patch = parse_component(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(PythonVersion::new(major, minor, patch))
}

fn parse_component(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_line() {
        assert_eq!(
            parse_python_version("Python 3.11.4\n"),
            Some(PythonVersion::new(3, 11, 4))
        );
    }

    #[test]
    fn accepts_crlf_terminator() {
        assert_eq!(
            parse_python_version("Python 3.9.18\r\n"),
            Some(PythonVersion::new(3, 9, 18))
        );
    }

    #[test]
    fn rejects_two_component_version() {
        assert_eq!(parse_python_version("Python 3.11\n"), None);
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(parse_python_version("3.11.4\n"), None);
    }

    #[test]
    fn rejects_missing_line_terminator() {
        assert_eq!(parse_python_version("Python 3.11.4"), None);
    }

    #[test]
    fn rejects_prerelease_and_trailing_text() {
        assert_eq!(parse_python_version("Python 3.13.0rc1\n"), None);
        assert_eq!(parse_python_version("Python 3.12.1\nextra\n"), None);
        assert_eq!(parse_python_version("Python 3.12.1.2\n"), None);
        assert_eq!(parse_python_version("PyPy 7.3.1\n"), None);
    }

    #[test]
    fn versions_order_numerically() {
        let older: PythonVersion = "3.9.18".parse().unwrap();
        let newer: PythonVersion = "3.10.0".parse().unwrap();
        assert!(older < newer);
    }

    #[test]
    fn serializes_as_dotted_string() {
        let version = PythonVersion::new(3, 12, 1);
        let json = serde_json::to_string(&version).unwrap();
        assert_eq!(json, "\"3.12.1\"");
        let back: PythonVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, version);
    }
}
