#![forbid(unsafe_code)]

//! Runtime variables.
//!
//! Variables are named JSON values. Packages define them with
//! [`Engine::def_variable`] and read them back as any deserializable type.
//! A buffer may override a variable locally; lookups for that buffer see the
//! override, every other buffer sees the global value.
//!
//! `set` only changes a variable that already exists, so a misspelled name
//! is an error instead of a silently unused value.

use std::collections::{BTreeMap, HashMap};

use paned_layout::BufferId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::engine::Engine;
use crate::error::VariableError;

/// Columns between tab stops when rendering buffer lines.
pub const TAB_STOP: &str = "tab-stop";

/// Global variables plus per-buffer overrides.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    globals: BTreeMap<String, Value>,
    locals: HashMap<BufferId, BTreeMap<String, Value>>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine a global variable. Returns the previous value.
    pub fn define(&mut self, name: &str, value: Value) -> Option<Value> {
        self.globals.insert(name.to_string(), value)
    }

    /// Change an existing global variable.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), VariableError> {
        let slot = self
            .globals
            .get_mut(name)
            .ok_or_else(|| VariableError::Undefined(name.to_string()))?;
        *slot = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    /// Define an override of `name` for `buffer`.
    pub fn define_local(&mut self, buffer: BufferId, name: &str, value: Value) -> Option<Value> {
        self.locals
            .entry(buffer)
            .or_default()
            .insert(name.to_string(), value)
    }

    /// Change `name` for `buffer` only.
    ///
    /// The variable must exist either globally or as an override of this
    /// buffer; a global one gains an override.
    pub fn set_local(
        &mut self,
        buffer: BufferId,
        name: &str,
        value: Value,
    ) -> Result<(), VariableError> {
        let has_local = self
            .locals
            .get(&buffer)
            .is_some_and(|locals| locals.contains_key(name));
        if !has_local && !self.is_defined(name) {
            return Err(VariableError::Undefined(name.to_string()));
        }
        self.define_local(buffer, name, value);
        Ok(())
    }

    /// The value `buffer` sees: its override if it has one, else the global.
    pub fn lookup(&self, buffer: Option<BufferId>, name: &str) -> Option<&Value> {
        buffer
            .and_then(|buffer| self.locals.get(&buffer))
            .and_then(|locals| locals.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// Drop every override of a buffer that is going away.
    pub fn forget_buffer(&mut self, buffer: BufferId) {
        self.locals.remove(&buffer);
    }

    /// Global variable names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.globals.keys().map(String::as_str)
    }
}

fn to_value(name: &str, value: impl Serialize) -> Result<Value, VariableError> {
    serde_json::to_value(value).map_err(|source| VariableError::Conversion {
        name: name.to_string(),
        source,
    })
}

fn from_value<T: DeserializeOwned>(name: &str, value: Option<&Value>) -> Result<T, VariableError> {
    let value = value.ok_or_else(|| VariableError::Undefined(name.to_string()))?;
    T::deserialize(value).map_err(|source| VariableError::Conversion {
        name: name.to_string(),
        source,
    })
}

impl Engine {
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Define (or redefine) a global variable.
    pub fn def_variable(&mut self, name: &str, value: impl Serialize) -> Result<(), VariableError> {
        let value = to_value(name, value)?;
        if self.variables.define(name, value).is_some() {
            tracing::debug!(variable = name, "redefined variable");
        }
        Ok(())
    }

    /// Change a defined global variable.
    pub fn set_variable(&mut self, name: &str, value: impl Serialize) -> Result<(), VariableError> {
        let value = to_value(name, value)?;
        self.variables.set(name, value)
    }

    /// Read a global variable as `T`.
    pub fn get_variable<T: DeserializeOwned>(&self, name: &str) -> Result<T, VariableError> {
        from_value(name, self.variables.get(name))
    }

    pub fn def_buffer_variable(
        &mut self,
        buffer: BufferId,
        name: &str,
        value: impl Serialize,
    ) -> Result<(), VariableError> {
        let value = to_value(name, value)?;
        self.variables.define_local(buffer, name, value);
        Ok(())
    }

    pub fn set_buffer_variable(
        &mut self,
        buffer: BufferId,
        name: &str,
        value: impl Serialize,
    ) -> Result<(), VariableError> {
        let value = to_value(name, value)?;
        self.variables.set_local(buffer, name, value)
    }

    /// Read `name` as `buffer` sees it.
    pub fn buffer_variable<T: DeserializeOwned>(
        &self,
        buffer: BufferId,
        name: &str,
    ) -> Result<T, VariableError> {
        from_value(name, self.variables.lookup(Some(buffer), name))
    }
}

#[cfg(test)]
mod tests {
    use paned_core::surface::HeadlessSurface;
    use serde_json::json;

    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn set_requires_a_definition() {
        let mut vars = Variables::new();
        assert!(matches!(
            vars.set("host", json!("example.org")),
            Err(VariableError::Undefined(name)) if name == "host"
        ));
        vars.define("host", json!("localhost"));
        vars.set("host", json!("example.org")).unwrap();
        assert_eq!(vars.get("host"), Some(&json!("example.org")));
    }

    #[test]
    fn buffer_overrides_shadow_globals_for_that_buffer_only() {
        let mut vars = Variables::new();
        vars.define("width", json!(4));
        vars.set_local(BufferId(1), "width", json!(8)).unwrap();
        assert_eq!(vars.lookup(Some(BufferId(1)), "width"), Some(&json!(8)));
        assert_eq!(vars.lookup(Some(BufferId(2)), "width"), Some(&json!(4)));
        assert_eq!(vars.lookup(None, "width"), Some(&json!(4)));

        vars.forget_buffer(BufferId(1));
        assert_eq!(vars.lookup(Some(BufferId(1)), "width"), Some(&json!(4)));
    }

    #[test]
    fn local_set_needs_a_local_or_global_definition() {
        let mut vars = Variables::new();
        assert!(vars.set_local(BufferId(1), "mode", json!("x")).is_err());
        vars.define_local(BufferId(1), "mode", json!("x"));
        vars.set_local(BufferId(1), "mode", json!("y")).unwrap();
        assert_eq!(vars.lookup(Some(BufferId(1)), "mode"), Some(&json!("y")));
        assert_eq!(vars.lookup(Some(BufferId(2)), "mode"), None);
    }

    #[test]
    fn engine_reads_typed_values() {
        let mut engine = Engine::new(EngineConfig::default(), HeadlessSurface::new(25, 80)).unwrap();
        assert_eq!(engine.get_variable::<u16>(TAB_STOP).unwrap(), 4);

        engine.def_variable("server.port", 5000u16).unwrap();
        engine.set_variable("server.port", 5001u16).unwrap();
        assert_eq!(engine.get_variable::<u16>("server.port").unwrap(), 5001);

        let err = engine.get_variable::<String>("server.port").unwrap_err();
        assert!(matches!(err, VariableError::Conversion { .. }));
        assert_eq!(
            engine.set_variable("server.hots", "x").unwrap_err().to_string(),
            "variable server.hots is not defined"
        );
    }

    #[test]
    fn engine_buffer_variables_fall_back_to_globals() {
        let mut engine = Engine::new(EngineConfig::default(), HeadlessSurface::new(25, 80)).unwrap();
        let log = engine.current_buffer().unwrap();
        engine.set_buffer_variable(log, TAB_STOP, 8u16).unwrap();
        assert_eq!(engine.buffer_variable::<u16>(log, TAB_STOP).unwrap(), 8);
        assert_eq!(engine.get_variable::<u16>(TAB_STOP).unwrap(), 4);

        engine.def_buffer_variable(log, "greeting", "hi").unwrap();
        assert_eq!(engine.buffer_variable::<String>(log, "greeting").unwrap(), "hi");
        assert!(engine.get_variable::<String>("greeting").is_err());
    }
}
