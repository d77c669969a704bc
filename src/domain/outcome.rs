//! Classification of one intercepted admin-client call.

use serde::Serialize;

/// Result class of a façade-intercepted call.
///
/// `AmbiguousEmpty` exists because the wrapped client turns retry
/// exhaustion, some 4xx responses, and post-retry connection errors into
/// an empty return value. That is indistinguishable from a legitimate
/// "not found", so it is reported as an error for alerting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiCallOutcome {
    Success,
    Failed,
    AmbiguousEmpty,
}

impl ApiCallOutcome {
    /// Value of the `status` label on `ranger_api_calls_total`.
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed | Self::AmbiguousEmpty => "error",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Whether an operation's result must be present to count as healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Absence is a documented answer (e.g. "not modified since version N").
    MayBeEmpty,
    /// Absence can only mean "not found" or a swallowed failure.
    Present,
}

impl Expectation {
    /// Classify a completed call.
    pub fn classify(self, failed: bool, absent: bool) -> ApiCallOutcome {
        match (failed, self, absent) {
            (true, _, _) => ApiCallOutcome::Failed,
            (false, Self::Present, true) => ApiCallOutcome::AmbiguousEmpty,
            _ => ApiCallOutcome::Success,
        }
    }
}
