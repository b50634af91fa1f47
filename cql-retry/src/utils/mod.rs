#[cfg(test)]
pub(crate) mod test_utils;

use std::error::Error;

use tracing::{debug, field::display, Span};

pub(crate) trait SpanExt {
    fn record_error(&self, error: &impl Error);
}

impl SpanExt for Span {
    fn record_error(&self, error: &impl Error) {
        self.record("otel.status_code", "ERROR");
        self.record("otel.status_message", display(error));
        self.in_scope(|| debug!("{}", "Finished with error"));
    }
}
