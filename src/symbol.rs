//! Symbol table for one propagation request
//!
//! Tracks which names are measured variables, which are fixed constants and
//! which are built-in constants, and resolves name collisions between them.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::PropagationError;

/// Built-in constants recognised unless the user declares the same name
pub const BUILTIN_CONSTANTS: &[(&str, f64)] =
    &[("pi", std::f64::consts::PI), ("e", std::f64::consts::E)];

/// What a declared name refers to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymbolKind {
    /// Measured quantity; differentiated and given an uncertainty
    Variable,
    /// User constant with a fixed value
    Constant(f64),
    /// `pi`, `e`
    Builtin(f64),
}

/// How to treat a constant whose name is already a declared variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Fail the request with a syntax error
    #[default]
    Reject,
    /// Keep the variable and drop the constant binding
    VariableWins,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(CollisionPolicy::Reject),
            "variable-wins" | "variable_wins" => Ok(CollisionPolicy::VariableWins),
            other => Err(format!(
                "unknown collision policy '{}' (expected 'reject' or 'variable-wins')",
                other
            )),
        }
    }
}

/// Check that `name` can be used as a variable or constant name
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names and kinds of every symbol a request may use
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: FxHashMap<String, SymbolKind>,
    /// Variables in declaration order
    variables: Vec<String>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Create a table holding only the built-in constants
    pub fn new() -> Self {
        let entries = BUILTIN_CONSTANTS
            .iter()
            .map(|(name, value)| (name.to_string(), SymbolKind::Builtin(*value)))
            .collect();
        SymbolTable {
            entries,
            variables: Vec::new(),
        }
    }

    fn check_name(&self, field: &str, name: &str) -> Result<(), PropagationError> {
        if !is_identifier(name) {
            return Err(PropagationError::syntax(
                field,
                format!("'{}' is not a valid identifier", name),
            ));
        }
        if crate::functions::registry::Registry::contains(name) {
            return Err(PropagationError::syntax(
                field,
                format!("'{}' is the name of a built-in function", name),
            ));
        }
        Ok(())
    }

    /// Declare a measured variable; shadows a built-in constant of the same name
    pub fn declare_variable(&mut self, name: &str) -> Result<(), PropagationError> {
        self.check_name("variable list", name)?;
        match self.entries.get(name) {
            Some(SymbolKind::Variable) => Err(PropagationError::syntax(
                "variable list",
                format!("variable '{}' is declared more than once", name),
            )),
            Some(SymbolKind::Constant(_)) => Err(PropagationError::syntax(
                "variable list",
                format!("'{}' is already declared as a constant", name),
            )),
            Some(SymbolKind::Builtin(_)) | None => {
                if self.entries.contains_key(name) {
                    log::debug!("variable '{}' shadows the built-in constant", name);
                }
                self.entries.insert(name.to_string(), SymbolKind::Variable);
                self.variables.push(name.to_string());
                Ok(())
            }
        }
    }

    /// Declare a constant. Returns `false` when the binding was dropped
    /// because of [`CollisionPolicy::VariableWins`].
    pub fn declare_constant(
        &mut self,
        name: &str,
        value: f64,
        policy: CollisionPolicy,
    ) -> Result<bool, PropagationError> {
        self.check_name("constant list", name)?;
        match self.entries.get(name) {
            Some(SymbolKind::Variable) => match policy {
                CollisionPolicy::Reject => Err(PropagationError::syntax(
                    "constant list",
                    format!("'{}' is declared both as a variable and as a constant", name),
                )),
                CollisionPolicy::VariableWins => {
                    log::warn!(
                        "constant '{}' has the same name as a variable; the variable is kept",
                        name
                    );
                    Ok(false)
                }
            },
            Some(SymbolKind::Constant(_)) => Err(PropagationError::syntax(
                "constant list",
                format!("constant '{}' is declared more than once", name),
            )),
            Some(SymbolKind::Builtin(_)) | None => {
                self.entries
                    .insert(name.to_string(), SymbolKind::Constant(value));
                Ok(true)
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolKind> {
        self.entries.get(name).copied()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_variable(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some(SymbolKind::Variable))
    }

    /// Variables in declaration order
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Numeric values of every constant and visible built-in
    pub fn constant_bindings(&self) -> FxHashMap<String, f64> {
        self.entries
            .iter()
            .filter_map(|(name, kind)| match kind {
                SymbolKind::Constant(v) | SymbolKind::Builtin(v) => Some((name.clone(), *v)),
                SymbolKind::Variable => None,
            })
            .collect()
    }
}
