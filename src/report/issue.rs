// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Defines the `Issue` record every audit stream produces.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Severity of an issue, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Pass,
    Info,
    Warn,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pass => "pass",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::High => "high",
        };
        f.write_str(name)
    }
}

/// A single finding with a fixed core schema and an open `context` map for
/// rule-specific details (`action`, `abi`, `max_alignment`, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    pub origin: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

impl Issue {
    pub fn new(
        severity: Severity,
        rule: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            rule: rule.into(),
            message: message.into(),
            origin: origin.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a rule-specific context value.
    #[must_use]
    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    /// Attach the remediation hint shown to the user.
    #[must_use]
    pub fn with_action(self, action: impl Into<String>) -> Self {
        self.with_context("action", action.into())
    }

    /// Get the remediation hint, if any.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.context.get("action").and_then(Value::as_str)
    }

    /// Key used to keep reports deterministic regardless of scan order.
    pub(crate) fn sort_key(&self) -> (&str, &str, &str, Severity) {
        (&self.origin, &self.rule, &self.message, self.severity)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.severity, self.rule, self.message, self.origin
        )
    }
}

/// Render an error with its sources, `outer: inner: ...`.
pub(crate) fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
