//! W3C Trace Context propagation over string-map carriers.
//!
//! Used when a message crosses a process edge and the trace context rides
//! along as extension attributes or headers.

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::collections::HashMap;

/// Inject the given context into a carrier map (`traceparent` et al.).
pub fn inject_context(context: &Context, carrier: &mut HashMap<String, String>) {
    TraceContextPropagator::new().inject_context(context, carrier);
}

/// Extract a context from a carrier map.
pub fn extract_context(carrier: &HashMap<String, String>) -> Context {
    TraceContextPropagator::new().extract(carrier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::TraceContextExt;

    #[test]
    fn test_extracts_a_valid_remote_span_context() {
        let mut carrier = HashMap::new();
        carrier.insert(
            "traceparent".to_string(),
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_string(),
        );

        let context = extract_context(&carrier);
        let span_context = context.span().span_context().clone();
        assert!(span_context.is_valid());
        assert!(span_context.is_remote());
    }

    #[test]
    fn test_inject_with_empty_context_adds_nothing() {
        let mut carrier = HashMap::new();
        inject_context(&Context::new(), &mut carrier);
        assert!(carrier.is_empty());
    }
}
