//! In-memory catalog.

use std::collections::{BTreeMap, BTreeSet};

use super::{FormatRole, RawEnumValue, RawOperation, TypeCatalog};
use crate::error::Result;
use crate::session::IntrospectionSession;

/// [`TypeCatalog`] over records built in code.
///
/// Names registered with [`MemoryCatalog::with_unavailable`] are discovered but cannot be
/// described, like an operation the installed library lists but cannot instantiate.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    operations: BTreeMap<String, RawOperation>,
    unavailable: BTreeSet<String>,
    enums: BTreeMap<String, Vec<RawEnumValue>>,
}

impl MemoryCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation.
    pub fn with_operation(mut self, operation: RawOperation) -> Self {
        self.operations.insert(operation.name.clone(), operation);
        self
    }

    /// Add a discoverable name that describes to `None`.
    pub fn with_unavailable(mut self, name: impl Into<String>) -> Self {
        self.unavailable.insert(name.into());
        self
    }

    /// Add an enum or flags type.
    pub fn with_enum(mut self, native_type: impl Into<String>, values: Vec<RawEnumValue>) -> Self {
        self.enums.insert(native_type.into(), values);
        self
    }
}

impl TypeCatalog for MemoryCatalog {
    fn discover_operation_names(&self, session: &mut IntrospectionSession) -> Result<Vec<String>> {
        let names: BTreeSet<&String> = self.operations.keys().chain(&self.unavailable).collect();
        session.counters_mut().operations_discovered += names.len();
        Ok(names.into_iter().cloned().collect())
    }

    fn describe_operation(
        &self,
        session: &mut IntrospectionSession,
        name: &str,
    ) -> Result<Option<RawOperation>> {
        if self.unavailable.contains(name) {
            return Ok(None);
        }
        let operation = self.operations.get(name).cloned();
        if operation.is_some() {
            session.counters_mut().operations_described += 1;
        }
        Ok(operation)
    }

    fn describe_enum(
        &self,
        _session: &mut IntrospectionSession,
        native_type: &str,
    ) -> Result<Option<Vec<RawEnumValue>>> {
        Ok(self.enums.get(native_type).cloned())
    }

    fn format_exists(
        &self,
        _session: &mut IntrospectionSession,
        tag: &str,
        role: FormatRole,
    ) -> bool {
        self.operations.contains_key(&role.operation_name(tag))
    }
}
