use std::path::PathBuf;

use anyhow::Result;
use pyfind_domain::{Installation, InstallationSet};
use serde_json::{json, Value};

use crate::core::discovery::{discover_installations, probe_installation, DiscoveryError, PathProbe};
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug, Default)]
pub struct PythonListRequest {
    pub leaves_only: bool,
}

#[derive(Clone, Debug)]
pub struct PythonProbeRequest {
    pub path: PathBuf,
}

/// Lists the Python interpreters found on this machine.
///
/// # Errors
/// Never fails; discovery errors are reported as a failed outcome.
pub fn python_list(ctx: &CommandContext, request: &PythonListRequest) -> Result<ExecutionOutcome> {
    let mut installations = match discover_installations(ctx.effects(), ctx.config()) {
        Ok(installations) => installations,
        Err(err) => return Ok(discovery_error(err)),
    };
    if request.leaves_only {
        installations.retain(|record| record.leaf);
    }
    let details = installations_details(&installations);
    if installations.is_empty() {
        return Ok(ExecutionOutcome::success(
            "no Python installations found",
            details,
        ));
    }
    let count = installations.len();
    let noun = if count == 1 { "installation" } else { "installations" };
    Ok(ExecutionOutcome::success(
        format!("found {count} Python {noun}"),
        details,
    ))
}

/// Probes a single path.
///
/// # Errors
/// Never fails; a path that is not an interpreter is a user error and
/// structural failures are reported as a failed outcome.
pub fn python_probe(ctx: &CommandContext, request: &PythonProbeRequest) -> Result<ExecutionOutcome> {
    let installations = match probe_installation(ctx.effects(), ctx.config(), &request.path) {
        Ok(PathProbe::Installations(installations)) => installations,
        Ok(PathProbe::Rejected(reason)) => {
            return Ok(ExecutionOutcome::user_error(
                format!("{} is not a Python interpreter", request.path.display()),
                json!({
                    "path": request.path.display().to_string(),
                    "reason": reason.to_string(),
                }),
            ))
        }
        Err(err) => return Ok(discovery_error(err)),
    };
    let version = installations
        .get_path(&request.path)
        .map(|record| record.info.version.to_string())
        .unwrap_or_default();
    Ok(ExecutionOutcome::success(
        format!("{} is Python {version}", request.path.display()),
        installations_details(&installations),
    ))
}

fn installations_details(installations: &InstallationSet) -> Value {
    let records: Vec<Value> = installations.iter().map(installation_to_json).collect();
    json!({
        "count": records.len(),
        "installations": records,
    })
}

fn installation_to_json(record: &Installation) -> Value {
    json!({
        "id": record.id.to_string(),
        "path": record.path.display().to_string(),
        "version": record.info.version,
        "architectures": record.info.architectures,
        "is_virtual_env": record.info.is_virtual_env,
        "supports_virtual_env": record.info.supports_virtual_env,
        "leaf": record.leaf,
        "symlink": record.symlink,
    })
}

fn discovery_error(err: DiscoveryError) -> ExecutionOutcome {
    let err = anyhow::Error::new(err);
    let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
    tracing::debug!(error = %format!("{err:#}"), "discovery failed");
    ExecutionOutcome::failure(
        format!("discovery failed: {err:#}"),
        json!({
            "reason": "discovery_failed",
            "error": err.to_string(),
            "issues": issues,
        }),
    )
}
