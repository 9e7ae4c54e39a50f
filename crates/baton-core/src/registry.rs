//! Name-keyed tool registry.
//!
//! Registration happens during wiring, before any task runs; lookups are
//! concurrent and read-only afterwards. Last registration wins for a name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::tool::Tool;

#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a tool by its name; replaces any previous registration.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.tools.write().insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// Sorted names of every registered tool.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{RunContext, ToolError, ToolOutput};
    use async_trait::async_trait;
    use serde_json::{Map, Value};

    struct StaticTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(
            &self,
            _ctx: &RunContext,
            _inputs: &Map<String, Value>,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text(self.reply))
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool {
            name: "echo",
            reply: "one",
        }));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        tokio_test::block_on(async {
            let registry = ToolRegistry::new();
            registry.register(Arc::new(StaticTool {
                name: "echo",
                reply: "one",
            }));
            registry.register(Arc::new(StaticTool {
                name: "echo",
                reply: "two",
            }));
            let tool = registry.get("echo").expect("tool");
            let out = tool
                .execute(&RunContext::new(), &Map::new())
                .await
                .expect("output");
            assert_eq!(out.output, Value::String("two".to_string()));
        });
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool {
            name: "zeta",
            reply: "",
        }));
        registry.register(Arc::new(StaticTool {
            name: "alpha",
            reply: "",
        }));
        assert_eq!(registry.names(), vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
