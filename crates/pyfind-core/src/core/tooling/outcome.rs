use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            CommandStatus::Ok => 0,
            CommandStatus::UserError => 1,
            CommandStatus::Failure => 2,
        }
    }

    /// The `--json` envelope.
    #[must_use]
    pub fn to_json_response(&self) -> Value {
        json!({
            "status": self.status,
            "message": self.message,
            "details": self.details,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_status() {
        assert_eq!(ExecutionOutcome::success("ok", Value::Null).exit_code(), 0);
        assert_eq!(ExecutionOutcome::user_error("no", Value::Null).exit_code(), 1);
        assert_eq!(ExecutionOutcome::failure("boom", Value::Null).exit_code(), 2);
    }

    #[test]
    fn json_envelope_carries_status_message_and_details() {
        let outcome = ExecutionOutcome::failure("scan aborted", json!({ "reason": "io" }));
        let payload = outcome.to_json_response();
        assert_eq!(payload["status"], "Failure");
        assert_eq!(payload["message"], "scan aborted");
        assert_eq!(payload["details"]["reason"], "io");
    }
}
