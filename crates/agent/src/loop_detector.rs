//! Exact-match detection of repeated tool-call patterns.
//!
//! Each step's tool calls are reduced to a fingerprint: every call rendered
//! as `name(arguments)` with argument keys in canonical order, the rendered
//! calls sorted and joined. Two steps requesting the same calls in a
//! different order share a fingerprint.

use serde_json::Value;
use stepwise_core::ToolCall;

/// Number of earlier occurrences that make the latest pattern a loop.
const REPEAT_THRESHOLD: usize = 2;

/// Append-only record of per-step tool-call fingerprints.
#[derive(Debug, Clone, Default)]
pub struct LoopDetector {
    fingerprints: Vec<String>,
}

impl LoopDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tool calls executed in one step.
    pub fn record(&mut self, calls: &[ToolCall]) {
        self.fingerprints.push(fingerprint(calls));
    }

    /// True once the most recent pattern has been seen at least twice
    /// before, i.e. three or more times in total.
    pub fn is_looping(&self) -> bool {
        let Some((latest, earlier)) = self.fingerprints.split_last() else {
            return false;
        };
        earlier.iter().filter(|f| *f == latest).count() >= REPEAT_THRESHOLD
    }
}

/// Order-independent fingerprint of one step's tool calls.
pub fn fingerprint(calls: &[ToolCall]) -> String {
    let mut rendered: Vec<String> = calls
        .iter()
        .map(|call| {
            let mut out = format!("{}(", call.name);
            write_canonical_object(call.arguments.iter(), &mut out);
            out.push(')');
            out
        })
        .collect();
    rendered.sort_unstable();
    rendered.join("|")
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_canonical_object(map.iter(), out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_canonical_object<'a>(
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
    out: &mut String,
) {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_canonical(value, out);
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: format!("call_{name}"),
            name: name.into(),
            arguments: args.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn empty_detector_is_not_looping() {
        assert!(!LoopDetector::new().is_looping());
    }

    #[test]
    fn single_pattern_is_not_looping() {
        let mut d = LoopDetector::new();
        d.record(&[call("quote", json!({"symbol": "AAPL"}))]);
        assert!(!d.is_looping());
    }

    #[test]
    fn two_distinct_patterns_are_not_looping() {
        let mut d = LoopDetector::new();
        d.record(&[call("quote", json!({"symbol": "AAPL"}))]);
        d.record(&[call("quote", json!({"symbol": "MSFT"}))]);
        assert!(!d.is_looping());
    }

    #[test]
    fn same_pattern_three_times_is_looping() {
        let a = [call("quote", json!({"symbol": "AAPL"}))];
        let mut d = LoopDetector::new();
        d.record(&a);
        assert!(!d.is_looping());
        d.record(&a);
        assert!(!d.is_looping());
        d.record(&a);
        assert!(d.is_looping());
    }

    #[test]
    fn interleaved_pattern_is_not_looping() {
        let a = [call("quote", json!({"symbol": "AAPL"}))];
        let b = [call("news", json!({"topic": "markets"}))];
        let mut d = LoopDetector::new();
        d.record(&a);
        d.record(&b);
        d.record(&a);
        assert!(!d.is_looping());
    }

    #[test]
    fn argument_order_is_irrelevant() {
        let first = call("search", json!({"q": "rust", "limit": 5, "opts": {"b": 1, "a": 2}}));
        let second = call("search", json!({"opts": {"a": 2, "b": 1}, "limit": 5, "q": "rust"}));
        assert_eq!(fingerprint(&[first]), fingerprint(&[second]));
    }

    #[test]
    fn call_order_within_a_step_is_irrelevant() {
        let a = call("quote", json!({"symbol": "AAPL"}));
        let b = call("news", json!({}));
        assert_eq!(
            fingerprint(&[a.clone(), b.clone()]),
            fingerprint(&[b, a])
        );
    }

    #[test]
    fn different_arguments_differ() {
        let a = call("quote", json!({"symbol": "AAPL"}));
        let b = call("quote", json!({"symbol": "aapl"}));
        assert_ne!(fingerprint(&[a]), fingerprint(&[b]));
    }

    #[test]
    fn fingerprint_format() {
        let c = call("quote", json!({"symbol": "AAPL", "days": [1, 2]}));
        assert_eq!(fingerprint(&[c]), r#"quote({"days":[1,2],"symbol":"AAPL"})"#);
    }
}
