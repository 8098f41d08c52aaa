use thiserror::Error;
use tracing_error::SpanTrace;

/// Failure raised while executing a single widget handler.
///
/// Errors never cross the per-widget boundary: the batch router routes them
/// to the owning handler's `on_error` and moves on to the next entry. Each
/// error captures the span trace at construction so debug diagnostics can
/// show where in the invocation pipeline it originated.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("invalid widget arguments: {message}")]
    InvalidArguments { message: String, trace: SpanTrace },
    #[error("widget data unavailable: {message}")]
    Unavailable { message: String, trace: SpanTrace },
    #[error("widget failed: {message}")]
    Internal { message: String, trace: SpanTrace },
}

impl WidgetError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
            trace: SpanTrace::capture(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            trace: SpanTrace::capture(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            trace: SpanTrace::capture(),
        }
    }

    /// Stable error kind label used in debug diagnostics payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::Unavailable { .. } => "unavailable",
            Self::Internal { .. } => "internal",
        }
    }

    /// Span trace captured where the error was constructed.
    pub fn trace(&self) -> &SpanTrace {
        match self {
            Self::InvalidArguments { trace, .. }
            | Self::Unavailable { trace, .. }
            | Self::Internal { trace, .. } => trace,
        }
    }
}
