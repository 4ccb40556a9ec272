use serde::{Deserialize, Serialize};

use crate::error::{ApplicationError, Error};
use crate::value::Value;

/// Outbound call: `{"func": <dotted name>, "args": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub func: String,
    pub args: Vec<Value>,
}

impl CallEnvelope {
    pub fn new(func: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            func: func.into(),
            args,
        }
    }
}

/// Normalized reply to a call
///
/// On the wire this is `{"success": true, "ret": [...]}` or
/// `{"success": false, "error": "..."}`. Decoding fails on replies that fit
/// neither shape, so a malformed payload never looks like an application error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireReply", into = "WireReply")]
pub enum ReplyEnvelope {
    Success { ret: Vec<Value> },
    Failure { message: String },
}

impl ReplyEnvelope {
    pub fn success(ret: Vec<Value>) -> Self {
        Self::Success { ret }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Split into return values or the server's error, tagged with the function name
    pub fn into_result(self, function: &str) -> Result<Vec<Value>, ApplicationError> {
        match self {
            Self::Success { ret } => Ok(ret),
            Self::Failure { message } => Err(ApplicationError {
                function: function.to_string(),
                message,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireReply {
    #[serde(default)]
    success: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ret: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

impl TryFrom<WireReply> for ReplyEnvelope {
    type Error = Error;

    fn try_from(wire: WireReply) -> Result<Self, Error> {
        if wire.success.is_truthy() {
            let ret = match wire.ret {
                None => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(Error::malformed(format!(
                        "`ret` must be an array, found {}",
                        other.kind()
                    )))
                }
            };
            return Ok(Self::Success { ret });
        }

        match wire.error {
            Some(Value::String(message)) => Ok(Self::Failure { message }),
            Some(other) => Ok(Self::Failure {
                message: other.to_string(),
            }),
            None => Err(Error::malformed("failed reply carries no `error`")),
        }
    }
}

impl From<ReplyEnvelope> for WireReply {
    fn from(reply: ReplyEnvelope) -> Self {
        match reply {
            ReplyEnvelope::Success { ret } => WireReply {
                success: Value::Bool(true),
                ret: Some(Value::Array(ret)),
                error: None,
            },
            ReplyEnvelope::Failure { message } => WireReply {
                success: Value::Bool(false),
                ret: None,
                error: Some(Value::String(message)),
            },
        }
    }
}
