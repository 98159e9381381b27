use viewstate::DecodeError;

/// Failure talking to the map store at all (no HTTP status).
#[derive(Debug)]
pub struct TransportError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Loading a persisted configuration failed.
#[derive(Debug)]
pub enum LoadError {
    Transport(TransportError),
    /// Non-2xx response; `message` is the server's `error` field when the
    /// body carried one.
    Server { status: u16, message: Option<String> },
    /// 2xx response whose body is not a usable configuration.
    Decode { status: u16, source: DecodeError },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Transport(e) => write!(f, "map store unreachable: {e}"),
            LoadError::Server {
                status,
                message: Some(msg),
            } => write!(f, "map store returned {status}: {msg}"),
            LoadError::Server {
                status,
                message: None,
            } => write!(f, "map store returned {status}"),
            LoadError::Decode { status, source } => {
                write!(f, "unreadable map configuration (status {status}): {source}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Transport(e) => Some(e),
            LoadError::Decode { source, .. } => Some(source),
            LoadError::Server { .. } => None,
        }
    }
}

pub const LOAD_CONFIG_ERROR_TEXT: &str = "Trouble reading saved configuration: ";
pub const LOAD_CONFIG_ERROR_DEFAULT_TEXT: &str = "Server Error.";
pub const XHR_TROUBLE_TEXT: &str = "Communication Trouble: Status ";

/// User-facing warning, shown once the viewer is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl LoadError {
    /// HTTP status of the failed request; 0 when no response arrived.
    pub fn status(&self) -> u16 {
        match self {
            LoadError::Transport(_) => 0,
            LoadError::Server { status, .. } | LoadError::Decode { status, .. } => *status,
        }
    }

    pub fn notice(&self) -> Notice {
        let detail = match self {
            LoadError::Server {
                message: Some(msg), ..
            } => msg.as_str(),
            _ => LOAD_CONFIG_ERROR_DEFAULT_TEXT,
        };
        Notice {
            title: format!("{XHR_TROUBLE_TEXT}{}", self.status()),
            message: format!("{LOAD_CONFIG_ERROR_TEXT}{detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadError, TransportError};

    #[test]
    fn notice_prefers_server_message() {
        let err = LoadError::Server {
            status: 404,
            message: Some("no such map".into()),
        };
        let notice = err.notice();
        assert_eq!(notice.title, "Communication Trouble: Status 404");
        assert_eq!(
            notice.message,
            "Trouble reading saved configuration: no such map"
        );
    }

    #[test]
    fn notice_falls_back_to_generic_text() {
        let err = LoadError::Transport(TransportError::new("connection refused"));
        let notice = err.notice();
        assert_eq!(notice.title, "Communication Trouble: Status 0");
        assert!(notice.message.ends_with("Server Error."));
    }
}
