//! Demonstration tools for stepwise.
//!
//! Small, dependency-free capabilities that make the binary usable end to
//! end: arithmetic and the current time. Real deployments register their
//! own domain tools instead.

pub mod calculator;
pub mod clock;

use std::sync::Arc;
use stepwise_core::ToolRegistry;

pub use calculator::CalculatorTool;
pub use clock::CurrentTimeTool;

/// Create a registry holding the demonstration tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CurrentTimeTool::new()));
    registry.register(Arc::new(CalculatorTool::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_order() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["current_time", "calculator"]);
    }
}
