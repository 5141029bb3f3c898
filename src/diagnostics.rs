use serde::{Deserialize, Serialize};

/// Severity of a diagnostic, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }
}

/// A message emitted while resolving a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
}

/// Receiver for diagnostics, handed to the resolver by its caller.
///
/// Calls happen synchronously at the point of detection.
pub trait DiagnosticSink {
    fn log(&mut self, message: &str, severity: Severity);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Critical | Severity::Error => {
                tracing::error!(severity = severity.as_str(), "{}", message)
            }
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Notice | Severity::Info => {
                tracing::info!(severity = severity.as_str(), "{}", message)
            }
            Severity::Debug => tracing::debug!("{}", message),
        }
    }
}

/// Keeps every diagnostic in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of diagnostics recorded at exactly `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn log(&mut self, message: &str, severity: Severity) {
        self.diagnostics.push(Diagnostic {
            message: message.to_string(),
            severity,
        });
    }
}

/// Sends each diagnostic to both sinks.
pub struct Tee<'a, A: DiagnosticSink, B: DiagnosticSink> {
    pub first: &'a mut A,
    pub second: &'a mut B,
}

impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for Tee<'_, A, B> {
    fn log(&mut self, message: &str, severity: Severity) {
        self.first.log(message, severity);
        self.second.log(message, severity);
    }
}
