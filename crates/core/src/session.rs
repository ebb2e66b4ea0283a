//! Per-run introspection state.
//!
//! One [`IntrospectionSession`] is created per run, threaded through discovery and
//! normalization, then dropped. It owns everything that would otherwise be process-wide:
//! the enum registry, the C-string cache used at the FFI boundary, and counters.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::{CStr, CString};

use serde::Serialize;
use tracing::debug;

use crate::error::{GenError, Result};
use crate::ir::EnumType;

/// Counters collected while discovering and describing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryCounters {
    /// Types visited while walking the operation hierarchy.
    pub types_visited: usize,
    /// Operation names returned by discovery.
    pub operations_discovered: usize,
    /// Operations successfully described.
    pub operations_described: usize,
    /// Deprecated operations left out of discovery.
    pub deprecated_skipped: usize,
    /// Enum types described.
    pub enums_described: usize,
    /// Distinct strings interned.
    pub interned_strings: usize,
}

/// State shared by every stage of one run.
#[derive(Debug, Default)]
pub struct IntrospectionSession {
    enums: BTreeMap<String, EnumType>,
    missing_enums: BTreeSet<String>,
    interned: HashMap<String, CString>,
    counters: DiscoveryCounters,
}

impl IntrospectionSession {
    /// Empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// NUL-terminated copy of `s`, created once per distinct string.
    ///
    /// The returned bytes stay at a fixed address for the life of the session.
    pub fn intern(&mut self, s: &str) -> Result<&CStr> {
        if !self.interned.contains_key(s) {
            let cstring = CString::new(s).map_err(|err| {
                GenError::Session(format!("Cannot intern string with interior NUL: {err}"))
            })?;
            self.interned.insert(s.to_string(), cstring);
            self.counters.interned_strings += 1;
        }

        self.interned
            .get(s)
            .map(CString::as_c_str)
            .ok_or_else(|| GenError::Session(format!("Interned string '{s}' vanished")))
    }

    /// Register a discovered enum type. Each native name is registered once.
    pub fn register_enum(&mut self, enum_type: EnumType) -> Result<()> {
        if self.enums.contains_key(&enum_type.native_name) {
            return Err(GenError::Session(format!(
                "Enum type '{}' registered twice",
                enum_type.native_name
            )));
        }
        debug!(
            enum_type = %enum_type.native_name,
            values = enum_type.values.len(),
            "Registered enum type."
        );
        self.counters.enums_described += 1;
        self.enums.insert(enum_type.native_name.clone(), enum_type);
        Ok(())
    }

    /// Registered enum type by native name.
    pub fn enum_type(&self, native_name: &str) -> Option<&EnumType> {
        self.enums.get(native_name)
    }

    /// Remember that an enum type could not be described.
    pub fn mark_missing_enum(&mut self, native_name: &str) {
        self.missing_enums.insert(native_name.to_string());
    }

    /// Whether an enum type is already known to be missing.
    pub fn is_missing_enum(&self, native_name: &str) -> bool {
        self.missing_enums.contains(native_name)
    }

    /// Registered enums, sorted by native name.
    pub fn enums(&self) -> impl Iterator<Item = &EnumType> {
        self.enums.values()
    }

    /// Counters so far.
    pub fn counters(&self) -> DiscoveryCounters {
        self.counters
    }

    /// Mutable counters, for catalogs.
    pub fn counters_mut(&mut self) -> &mut DiscoveryCounters {
        &mut self.counters
    }
}
