//! Per-step validation and the refinement hint fed back to the model.

use stepwise_core::{Message, ToolResult, ValidationResult};

use crate::loop_detector::LoopDetector;

pub const ALL_ERRORS_ISSUE: &str =
    "All tool calls returned errors. Try different parameters or a different tool.";
pub const ALL_EMPTY_ISSUE: &str =
    "All tool calls returned empty results. Try broader parameters or a different approach.";
pub const LOOPING_ISSUE: &str = "Detected repeated identical tool calls. Try a different approach \
     or provide your best answer with the information gathered.";

/// Validate one step's tool results against the loop history.
///
/// The error and empty checks only apply when the step produced results.
pub fn validate_step(results: &[ToolResult], detector: &LoopDetector) -> ValidationResult {
    let mut issues = Vec::new();

    if !results.is_empty() {
        if results.iter().all(|r| r.error.is_some()) {
            issues.push(ALL_ERRORS_ISSUE.to_string());
        } else if results.iter().all(ToolResult::is_empty) {
            issues.push(ALL_EMPTY_ISSUE.to_string());
        }
    }

    if detector.is_looping() {
        issues.push(LOOPING_ISSUE.to_string());
    }

    ValidationResult::from_issues(issues)
}

/// User-role message steering the next provider call, or `None` when the
/// step was valid.
pub fn refinement_hint(validation: &ValidationResult) -> Option<Message> {
    if !validation.needs_refinement() {
        return None;
    }
    let mut text = String::from("The previous step had issues:\n");
    for issue in &validation.issues {
        text.push_str("- ");
        text.push_str(issue);
        text.push('\n');
    }
    text.push_str("Please adjust your approach.");
    Some(Message::user(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepwise_core::{Role, ToolCall};

    fn ok(value: serde_json::Value) -> ToolResult {
        ToolResult {
            tool_call_id: "call_1".into(),
            name: "quote".into(),
            result: Some(value),
            error: None,
            duration_ms: 3,
        }
    }

    fn failed(reason: &str) -> ToolResult {
        ToolResult {
            tool_call_id: "call_1".into(),
            name: "quote".into(),
            result: None,
            error: Some(reason.into()),
            duration_ms: 3,
        }
    }

    #[test]
    fn single_error_is_invalid() {
        let v = validate_step(&[failed("symbol not found")], &LoopDetector::new());
        assert!(!v.is_valid);
        assert_eq!(v.issues, vec![ALL_ERRORS_ISSUE.to_string()]);
        assert!(v.needs_refinement());
    }

    #[test]
    fn non_empty_success_is_valid() {
        let v = validate_step(&[ok(json!({"price": 189.5}))], &LoopDetector::new());
        assert!(v.is_valid);
        assert!(v.issues.is_empty());
    }

    #[test]
    fn partial_errors_are_fine() {
        let v = validate_step(&[failed("boom"), ok(json!(1))], &LoopDetector::new());
        assert!(v.is_valid);
    }

    #[test]
    fn all_empty_results() {
        let results = [ok(json!(null)), ok(json!("")), ok(json!([])), ok(json!({}))];
        let v = validate_step(&results, &LoopDetector::new());
        assert_eq!(v.issues, vec![ALL_EMPTY_ISSUE.to_string()]);
    }

    #[test]
    fn zero_and_false_are_not_empty() {
        let v = validate_step(&[ok(json!(0)), ok(json!(false))], &LoopDetector::new());
        assert!(v.is_valid);
    }

    #[test]
    fn no_results_is_valid() {
        assert!(validate_step(&[], &LoopDetector::new()).is_valid);
    }

    #[test]
    fn looping_adds_issue() {
        let calls = [ToolCall {
            id: "c".into(),
            name: "quote".into(),
            arguments: Default::default(),
        }];
        let mut detector = LoopDetector::new();
        for _ in 0..3 {
            detector.record(&calls);
        }
        let v = validate_step(&[failed("x")], &detector);
        assert_eq!(
            v.issues,
            vec![ALL_ERRORS_ISSUE.to_string(), LOOPING_ISSUE.to_string()]
        );
    }

    #[test]
    fn hint_lists_issues() {
        let v = ValidationResult::from_issues(vec![ALL_ERRORS_ISSUE.into()]);
        let hint = refinement_hint(&v).unwrap();
        assert_eq!(hint.role, Role::User);
        assert!(hint.content.starts_with("The previous step had issues:\n- All tool calls"));
        assert!(hint.content.ends_with("Please adjust your approach."));
    }

    #[test]
    fn no_hint_when_valid() {
        assert!(refinement_hint(&ValidationResult::from_issues(vec![])).is_none());
    }
}
