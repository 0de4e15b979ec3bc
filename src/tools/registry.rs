//! Per-call tool registry.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::tool::Tool;
use crate::error::AskflowError;
use crate::provider::ToolDefinition;

fn tool_id_regex() -> &'static Regex {
    static TOOL_ID: OnceLock<Regex> = OnceLock::new();
    TOOL_ID.get_or_init(|| Regex::new(r"^[a-z0-9_]{1,64}$").expect("tool id regex must compile"))
}

/// Normalize a tool name into the id declared to the endpoint: lowercase,
/// spaces and hyphens replaced by `_`.
pub fn tool_id(name: &str) -> Result<String, AskflowError> {
    let id = name.trim().to_lowercase().replace([' ', '-'], "_");
    if tool_id_regex().is_match(&id) {
        Ok(id)
    } else {
        Err(AskflowError::Configuration(format!("invalid tool name '{name}'")))
    }
}

/// Tools available to one ask call, keyed by normalized id.
///
/// Declaration order is kept so the tool list sent to the endpoint is
/// stable across turns.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<(String, Arc<dyn Tool>)>,
    index: HashMap<String, usize>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, failing on the first duplicate id.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self, AskflowError> {
        let mut set = Self::new();
        for tool in tools {
            set.register(tool)?;
        }
        Ok(set)
    }

    /// Register a tool under its normalized id.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), AskflowError> {
        let id = tool_id(tool.name())?;
        if self.index.contains_key(&id) {
            return Err(AskflowError::Configuration(format!("duplicate tool name '{id}'")));
        }
        self.index.insert(id.clone(), self.tools.len());
        self.tools.push((id, tool));
        Ok(())
    }

    /// Resolve a tool by the name the model called.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        let idx = match self.index.get(name) {
            Some(idx) => *idx,
            None => *self.index.get(&tool_id(name).ok()?)?,
        };
        self.tools.get(idx).map(|(_, tool)| tool)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|(id, _)| id.as_str())
    }

    /// Strict-mode declarations for the endpoint.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|(id, tool)| ToolDefinition {
                name: id.clone(),
                description: tool.description().to_string(),
                parameters: tool.parameters().clone(),
                strict: true,
            })
            .collect()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
