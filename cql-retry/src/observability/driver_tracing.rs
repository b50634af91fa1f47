use tracing::trace_span;

use crate::frame::types::Consistency;
use crate::utils::SpanExt;

/// Span covering the whole execution of a request, across all attempts.
pub(crate) struct RequestSpan {
    span: tracing::Span,
}

impl RequestSpan {
    pub(crate) fn new_statement(contents: &str, consistency: Consistency) -> Self {
        use tracing::field::Empty;

        let span = trace_span!(
            "Request",
            kind = "unprepared",
            contents = contents,
            consistency = %consistency,
            //
            retries = Empty,
            outcome = Empty,
            otel.status_code = Empty,
            otel.status_message = Empty,
        );

        Self { span }
    }

    pub(crate) fn record_retries(&self, retries: u32) {
        self.span.record("retries", retries);
    }

    pub(crate) fn record_outcome(&self, outcome: &'static str) {
        self.span.record("outcome", outcome);
    }

    pub(crate) fn record_error(&self, error: &impl std::error::Error) {
        self.span.record_error(error);
    }

    pub(crate) fn span(&self) -> &tracing::Span {
        &self.span
    }
}
