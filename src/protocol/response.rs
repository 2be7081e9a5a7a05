use std::fmt;

/// One response line, rendered as `SUCCESS: ...` or `ERROR: ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Success,
    Error,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Success => write!(f, "SUCCESS: {}", self.message),
            Status::Error => write!(f, "ERROR: {}", self.message),
        }
    }
}
