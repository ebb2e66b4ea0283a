//! [`TypeCatalog`] over the running libvips type system.

use std::collections::BTreeSet;
use std::ffi::{c_char, c_void};
use std::ptr;

use tracing::{debug, warn};
use vipsgen_core::catalog::{
    FormatRole, RawArgument, RawDefault, RawEnumValue, RawOperation, RawTypeKind, TypeCatalog,
    op_flags,
};
use vipsgen_core::{GenError, IntrospectionSession, Result};

use crate::ffi::{
    self, G_TYPE_BOOLEAN, G_TYPE_DOUBLE, G_TYPE_ENUM, G_TYPE_FLAG_ABSTRACT, G_TYPE_FLAGS,
    G_TYPE_FLOAT, G_TYPE_INT, G_TYPE_INT64, G_TYPE_STRING, G_TYPE_UINT, G_TYPE_UINT64, GEnumClass,
    GFlagsClass, GParamSpec, GType, VipsArgumentClass, VipsArgumentInstance, VipsObject,
};
use crate::guard::{ClassRef, ObjectRef, text};
use crate::runtime::{LiveRuntime, take_error};

/// Enum types with more values than this are treated as corrupt.
const MAX_ENUM_VALUES: usize = 1024;

/// Catalog backed by a started [`LiveRuntime`].
#[derive(Debug)]
pub struct LiveCatalog<'rt> {
    _runtime: &'rt LiveRuntime,
}

impl<'rt> LiveCatalog<'rt> {
    /// Catalog over `runtime`. The borrow keeps libvips alive for as long as the catalog.
    pub fn new(runtime: &'rt LiveRuntime) -> Self {
        Self { _runtime: runtime }
    }
}

impl TypeCatalog for LiveCatalog<'_> {
    fn discover_operation_names(&self, session: &mut IntrospectionSession) -> Result<Vec<String>> {
        let base = session.intern("VipsOperation")?;
        // SAFETY: `base` is a NUL-terminated string owned by the session.
        let base_type = unsafe { ffi::g_type_from_name(base.as_ptr()) };
        if base_type == 0 {
            return Err(GenError::Internal(
                "VipsOperation is not a registered type".to_string(),
            ));
        }

        let mut types: Vec<GType> = Vec::new();
        // SAFETY: `collect_type` only pushes into the Vec passed as `a`, which outlives the call.
        unsafe {
            ffi::vips_type_map_all(base_type, collect_type, ptr::from_mut(&mut types).cast());
        }

        let mut names = BTreeSet::new();
        let mut deprecated = 0;
        for gtype in &types {
            // SAFETY: every id came from the type system walk above.
            let is_abstract = unsafe { ffi::g_type_test_flags(*gtype, G_TYPE_FLAG_ABSTRACT) } != 0;
            if is_abstract {
                continue;
            }
            // SAFETY: as above; the nickname is a static string owned by the class.
            let nickname = unsafe { text(ffi::vips_nickname_find(*gtype)) };
            if nickname.is_empty() {
                continue;
            }
            let Some(flags) = instance_flags(session, &nickname)? else {
                continue;
            };
            if flags & op_flags::DEPRECATED != 0 {
                debug!(operation = %nickname, "Skipping deprecated operation.");
                deprecated += 1;
                continue;
            }
            names.insert(nickname);
        }

        let counters = session.counters_mut();
        counters.types_visited += types.len();
        counters.operations_discovered += names.len();
        counters.deprecated_skipped += deprecated;
        debug!(
            types = types.len(),
            operations = names.len(),
            deprecated,
            "Walked operation hierarchy."
        );

        Ok(names.into_iter().collect())
    }

    fn describe_operation(
        &self,
        session: &mut IntrospectionSession,
        name: &str,
    ) -> Result<Option<RawOperation>> {
        let nickname = session.intern(name)?;
        // SAFETY: `nickname` is NUL-terminated; ownership of the new object moves to the guard.
        let operation = unsafe { ObjectRef::from_owned(ffi::vips_operation_new(nickname.as_ptr())) };
        let Some(operation) = operation else {
            let reason = take_error();
            debug!(operation = name, reason = %reason, "Operation cannot be instantiated.");
            return Ok(None);
        };

        let object = operation.as_ptr().cast::<VipsObject>();
        // SAFETY: `object` is a live VipsObject held by the guard.
        let description = unsafe { text(ffi::vips_object_get_description(object)) };
        // SAFETY: as above.
        let flags = unsafe { ffi::vips_operation_get_flags(operation.as_ptr()) };

        let mut arguments: Vec<RawArgument> = Vec::new();
        // SAFETY: `collect_argument` only pushes into the Vec passed as `a`, which outlives
        // the call; `object` stays alive for its duration.
        unsafe {
            ffi::vips_argument_map(
                object,
                collect_argument,
                ptr::from_mut(&mut arguments).cast(),
                ptr::null_mut(),
            );
        }

        session.counters_mut().operations_described += 1;

        let mut raw = RawOperation::new(name, description).with_flags(flags);
        raw.arguments = arguments;
        Ok(Some(raw))
    }

    fn describe_enum(
        &self,
        session: &mut IntrospectionSession,
        native_type: &str,
    ) -> Result<Option<Vec<RawEnumValue>>> {
        let type_name = session.intern(native_type)?;
        // SAFETY: `type_name` is NUL-terminated.
        let gtype = unsafe { ffi::g_type_from_name(type_name.as_ptr()) };
        if gtype == 0 {
            return Ok(None);
        }

        // SAFETY: `gtype` is registered.
        let fundamental = unsafe { ffi::g_type_fundamental(gtype) };
        if fundamental != G_TYPE_ENUM && fundamental != G_TYPE_FLAGS {
            warn!(enum_type = native_type, "Type is neither an enum nor flags.");
            return Ok(None);
        }

        // SAFETY: enum and flags types are classed.
        let Some(class) = (unsafe { ClassRef::new(gtype) }) else {
            return Err(GenError::Internal(format!(
                "Cannot reference class of {native_type}"
            )));
        };

        let values = if fundamental == G_TYPE_ENUM {
            let class = class.as_ptr::<GEnumClass>();
            // SAFETY: the class is a GEnumClass and stays referenced while we read it.
            let (n_values, values) = unsafe { ((*class).n_values as usize, (*class).values) };
            check_value_count(native_type, n_values)?;
            // SAFETY: GLib guarantees `n_values` readable entries.
            let slice = unsafe { std::slice::from_raw_parts(values, n_values) };
            slice
                .iter()
                .map(|v| {
                    // SAFETY: names and nicks are static strings owned by the class.
                    let (name, nick) = unsafe { (value_name(v.value_name), text(v.value_nick)) };
                    RawEnumValue::new(name, i64::from(v.value), nick)
                })
                .collect()
        } else {
            let class = class.as_ptr::<GFlagsClass>();
            // SAFETY: the class is a GFlagsClass and stays referenced while we read it.
            let (n_values, values) = unsafe { ((*class).n_values as usize, (*class).values) };
            check_value_count(native_type, n_values)?;
            // SAFETY: GLib guarantees `n_values` readable entries.
            let slice = unsafe { std::slice::from_raw_parts(values, n_values) };
            slice
                .iter()
                .map(|v| {
                    // SAFETY: names and nicks are static strings owned by the class.
                    let (name, nick) = unsafe { (value_name(v.value_name), text(v.value_nick)) };
                    RawEnumValue::new(name, i64::from(v.value), nick)
                })
                .collect()
        };

        Ok(Some(values))
    }

    fn format_exists(
        &self,
        session: &mut IntrospectionSession,
        tag: &str,
        role: FormatRole,
    ) -> bool {
        let Ok(base) = session.intern("VipsOperation").map(|s| s.as_ptr()) else {
            return false;
        };
        let Ok(nickname) = session.intern(&role.operation_name(tag)) else {
            return false;
        };
        // SAFETY: both strings are NUL-terminated and owned by the session, whose interned
        // bytes never move.
        unsafe { ffi::vips_type_find(base, nickname.as_ptr()) != 0 }
    }
}

/// Operation flags of a fresh instance of `nickname`, `None` when it cannot be created.
fn instance_flags(session: &mut IntrospectionSession, nickname: &str) -> Result<Option<u32>> {
    let cname = session.intern(nickname)?;
    // SAFETY: `cname` is NUL-terminated; the guard releases the instance on return.
    let instance = unsafe { ObjectRef::from_owned(ffi::vips_operation_new(cname.as_ptr())) };
    let Some(instance) = instance else {
        let reason = take_error();
        debug!(operation = nickname, reason = %reason, "Operation cannot be instantiated.");
        return Ok(None);
    };
    // SAFETY: the instance is live for as long as the guard.
    Ok(Some(unsafe { ffi::vips_operation_get_flags(instance.as_ptr()) }))
}

/// Enum value name, `UNKNOWN` when GLib has none.
///
/// # Safety
///
/// Same contract as [`text`].
unsafe fn value_name(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return "UNKNOWN".to_string();
    }
    // SAFETY: forwarded from the caller.
    unsafe { text(ptr) }
}

fn check_value_count(native_type: &str, n_values: usize) -> Result<()> {
    if n_values == 0 || n_values > MAX_ENUM_VALUES {
        return Err(GenError::Internal(format!(
            "{native_type} reports {n_values} values"
        )));
    }
    Ok(())
}

/// `VipsTypeMapFn` that appends each visited type to the `Vec<GType>` at `a`.
unsafe extern "C" fn collect_type(gtype: GType, a: *mut c_void) -> *mut c_void {
    // SAFETY: `a` is the `&mut Vec<GType>` passed by `discover_operation_names`.
    let types = unsafe { &mut *a.cast::<Vec<GType>>() };
    types.push(gtype);
    ptr::null_mut()
}

/// `VipsArgumentMapFn` that appends each argument to the `Vec<RawArgument>` at `a`.
unsafe extern "C" fn collect_argument(
    _object: *mut VipsObject,
    pspec: *mut GParamSpec,
    argument_class: *mut VipsArgumentClass,
    _argument_instance: *mut VipsArgumentInstance,
    a: *mut c_void,
    _b: *mut c_void,
) -> *mut c_void {
    if pspec.is_null() || argument_class.is_null() {
        return ptr::null_mut();
    }
    // SAFETY: `a` is the `&mut Vec<RawArgument>` passed by `describe_operation`.
    let arguments = unsafe { &mut *a.cast::<Vec<RawArgument>>() };
    // SAFETY: libvips hands out live pspec and class pointers for the duration of the callback.
    let (name, value_type, flags, blurb, nick) = unsafe {
        (
            text((*pspec).name),
            (*pspec).value_type,
            (*argument_class).flags,
            text(ffi::g_param_spec_get_blurb(pspec)),
            text(ffi::g_param_spec_get_nick(pspec)),
        )
    };
    let description = if blurb.is_empty() { nick } else { blurb };
    // SAFETY: `value_type` is a registered type id read from the pspec.
    let (type_name, fundamental) =
        unsafe { (text(ffi::g_type_name(value_type)), ffi::g_type_fundamental(value_type)) };

    let kind = match fundamental {
        G_TYPE_ENUM => RawTypeKind::Enum,
        G_TYPE_FLAGS => RawTypeKind::Flags,
        _ => RawTypeKind::Plain,
    };

    let mut argument = RawArgument::new(name, type_name, flags)
        .with_kind(kind)
        .with_description(description);
    // SAFETY: `pspec` is live for the callback and `fundamental` is its value type's root.
    if let Some(default) = unsafe { default_value(pspec, fundamental) } {
        argument = argument.with_default(default);
    }
    arguments.push(argument);
    ptr::null_mut()
}

/// Default held by a param spec, for the fundamental types a literal can express.
///
/// # Safety
///
/// `pspec` must be a live param spec whose value type derives from `fundamental`.
unsafe fn default_value(pspec: *mut GParamSpec, fundamental: GType) -> Option<RawDefault> {
    // SAFETY: forwarded from the caller; GLib owns the returned value.
    let value = unsafe { ffi::g_param_spec_get_default_value(pspec) };
    if value.is_null() {
        return None;
    }
    // SAFETY: each getter matches the fundamental type of `value`.
    let default = unsafe {
        match fundamental {
            G_TYPE_BOOLEAN => RawDefault::Bool(ffi::g_value_get_boolean(value) != 0),
            G_TYPE_INT => RawDefault::Int(i64::from(ffi::g_value_get_int(value))),
            G_TYPE_UINT => RawDefault::Int(i64::from(ffi::g_value_get_uint(value))),
            G_TYPE_INT64 => RawDefault::Int(ffi::g_value_get_int64(value)),
            G_TYPE_UINT64 => RawDefault::Int(i64::try_from(ffi::g_value_get_uint64(value)).ok()?),
            G_TYPE_ENUM => RawDefault::Int(i64::from(ffi::g_value_get_enum(value))),
            G_TYPE_FLAGS => RawDefault::Int(i64::from(ffi::g_value_get_flags(value))),
            G_TYPE_FLOAT => RawDefault::Double(f64::from(ffi::g_value_get_float(value))),
            G_TYPE_DOUBLE => RawDefault::Double(ffi::g_value_get_double(value)),
            G_TYPE_STRING => {
                let ptr = ffi::g_value_get_string(value);
                if ptr.is_null() {
                    return None;
                }
                RawDefault::String(text(ptr))
            }
            _ => return None,
        }
    };
    Some(default)
}
