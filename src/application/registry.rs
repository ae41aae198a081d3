//! # Tool Registry
//!
//! Validated mapping from tool name to its definition, built once at startup.
//! Registering a name twice is rejected immediately instead of shadowing the
//! earlier entry.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::config::ToolsConfig;
use crate::domain::errors::RegistryError;
use crate::domain::traits::ToolHandler;
use crate::domain::types::ToolSpec;
use crate::infrastructure::tools;
use crate::infrastructure::tools::fs::LocalFs;

/// A registered tool: declaration plus handler.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("handler", &"Arc<dyn ToolHandler>")
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ToolDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), RegistryError> {
        if definition.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(&definition.name) {
            return Err(RegistryError::Duplicate(definition.name));
        }
        self.order.push(definition.name.clone());
        self.tools.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Declarations in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(ToolDefinition::spec)
            .collect()
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Registry with every built-in tool, file tools rooted at `workdir`.
pub fn builtin_registry(
    config: &ToolsConfig,
    workdir: impl Into<PathBuf>,
) -> Result<ToolRegistry, RegistryError> {
    let workdir = workdir.into();
    let fs = LocalFs::new(&workdir).map_err(|e| RegistryError::Workdir {
        path: workdir.display().to_string(),
        reason: e.to_string(),
    })?;
    ToolRegistry::from_definitions(tools::builtin_definitions(config, Arc::new(fs)))
}
