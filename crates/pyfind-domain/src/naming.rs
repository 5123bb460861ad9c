//! File-name rules for spotting interpreter executables in a search path.

/// Executable extensions assumed when `PATHEXT` is unset.
pub const DEFAULT_PATHEXT: &[&str] = &[".EXE", ".CMD", ".BAT", ".COM"];

/// Returns true for `python`, `python3`, `python3.12` and nothing else.
///
/// Matching is exact and case-sensitive.
#[must_use]
pub fn is_posix_interpreter_name(name: &str) -> bool {
    name.strip_prefix("python").is_some_and(is_version_suffix)
}

/// Returns true for a lowercase stem of the form `py`, `python`, `py3`,
/// `python3.11`, ...
#[must_use]
pub fn is_windows_interpreter_stem(stem: &str) -> bool {
    let Some(rest) = stem.strip_prefix("py") else {
        return false;
    };
    let rest = rest.strip_prefix("thon").unwrap_or(rest);
    is_version_suffix(rest)
}

/// Strips the first matching executable extension from `name` and returns the
/// lowercase stem when it names an interpreter.
#[must_use]
pub fn windows_interpreter_stem(name: &str, pathext: &[String]) -> Option<String> {
    let lowered = name.to_ascii_lowercase();
    let ext = pathext
        .iter()
        .find(|ext| lowered.ends_with(ext.to_ascii_lowercase().as_str()))?;
    let stem = &lowered[..lowered.len() - ext.len()];
    is_windows_interpreter_stem(stem).then(|| stem.to_string())
}

/// Splits a `PATHEXT` value into extensions, falling back to
/// [`DEFAULT_PATHEXT`] when the value is missing or empty.
#[must_use]
pub fn parse_pathext(raw: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.starts_with('.') {
                segment.to_string()
            } else {
                format!(".{segment}")
            }
        })
        .collect();
    if parsed.is_empty() {
        DEFAULT_PATHEXT.iter().map(|ext| (*ext).to_string()).collect()
    } else {
        parsed
    }
}

fn is_version_suffix(rest: &str) -> bool {
    if rest.is_empty() {
        return true;
    }
    match rest.split_once('.') {
        Some((major, minor)) => is_digits(major) && is_digits(minor),
        None => is_digits(rest),
    }
}

fn is_digits(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|byte| byte.is_ascii_digit())
}
