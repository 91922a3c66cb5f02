//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parlance::{CommandSource, SourceType};

pub const CONSOLE: SourceType = SourceType::new("console");
pub const PLAYER: SourceType = SourceType::new("player");

/// A command source with a fixed type, locale and permission list.
pub struct MockSource {
    name: String,
    kind: SourceType,
    locale: String,
    permissions: Vec<String>,
}

impl MockSource {
    pub fn new(name: &str, kind: SourceType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            locale: "en".to_string(),
            permissions: Vec::new(),
        }
    }

    pub fn console() -> Arc<dyn CommandSource> {
        Arc::new(Self::new("console", CONSOLE).with_permission("*"))
    }

    pub fn player(name: &str) -> Arc<dyn CommandSource> {
        Arc::new(Self::new(name, PLAYER))
    }

    pub fn with_permission(mut self, node: &str) -> Self {
        self.permissions.push(node.to_string());
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn shared(self) -> Arc<dyn CommandSource> {
        Arc::new(self)
    }
}

impl CommandSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn identity(&self) -> &str {
        &self.name
    }

    fn locale(&self) -> &str {
        &self.locale
    }

    fn source_type(&self) -> SourceType {
        self.kind
    }

    fn has_permission(&self, node: &str) -> bool {
        self.permissions.iter().any(|p| p == "*" || p == node)
    }
}
