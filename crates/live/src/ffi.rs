//! Raw libvips, GObject and GLib declarations used during discovery.

// Layout-only fields are never read from Rust
#![allow(dead_code)]

use std::ffi::{c_char, c_double, c_float, c_int, c_uint, c_void};

pub type GType = usize;

/// `G_TYPE_FLAG_ABSTRACT`.
pub const G_TYPE_FLAG_ABSTRACT: c_uint = 1 << 4;
/// `G_TYPE_BOOLEAN`, a fundamental type id.
pub const G_TYPE_BOOLEAN: GType = 5 << 2;
/// `G_TYPE_INT`, a fundamental type id.
pub const G_TYPE_INT: GType = 6 << 2;
/// `G_TYPE_UINT`, a fundamental type id.
pub const G_TYPE_UINT: GType = 7 << 2;
/// `G_TYPE_INT64`, a fundamental type id.
pub const G_TYPE_INT64: GType = 10 << 2;
/// `G_TYPE_UINT64`, a fundamental type id.
pub const G_TYPE_UINT64: GType = 11 << 2;
/// `G_TYPE_ENUM`, a fundamental type id.
pub const G_TYPE_ENUM: GType = 12 << 2;
/// `G_TYPE_FLAGS`, a fundamental type id.
pub const G_TYPE_FLAGS: GType = 13 << 2;
/// `G_TYPE_FLOAT`, a fundamental type id.
pub const G_TYPE_FLOAT: GType = 14 << 2;
/// `G_TYPE_DOUBLE`, a fundamental type id.
pub const G_TYPE_DOUBLE: GType = 15 << 2;
/// `G_TYPE_STRING`, a fundamental type id.
pub const G_TYPE_STRING: GType = 16 << 2;

#[repr(C)]
pub struct VipsObject {
    _private: [u8; 0],
}

#[repr(C)]
pub struct VipsOperation {
    _private: [u8; 0],
}

#[repr(C)]
pub struct VipsArgumentInstance {
    _private: [u8; 0],
}

#[repr(C)]
pub struct GValue {
    _private: [u8; 0],
}

/// Public head of `GParamSpec`.
#[repr(C)]
pub struct GParamSpec {
    pub g_type_instance: *mut c_void,
    pub name: *const c_char,
    pub flags: c_uint,
    pub value_type: GType,
    pub owner_type: GType,
}

/// `VipsArgumentClass`, including its `VipsArgument` parent.
#[repr(C)]
pub struct VipsArgumentClass {
    pub pspec: *mut GParamSpec,
    pub object_class: *mut c_void,
    pub flags: c_uint,
    pub priority: c_int,
    pub offset: c_uint,
}

#[repr(C)]
pub struct GTypeClass {
    pub g_type: GType,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct GEnumValue {
    pub value: c_int,
    pub value_name: *const c_char,
    pub value_nick: *const c_char,
}

#[repr(C)]
pub struct GEnumClass {
    pub g_type_class: GTypeClass,
    pub minimum: c_int,
    pub maximum: c_int,
    pub n_values: c_uint,
    pub values: *mut GEnumValue,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct GFlagsValue {
    pub value: c_uint,
    pub value_name: *const c_char,
    pub value_nick: *const c_char,
}

#[repr(C)]
pub struct GFlagsClass {
    pub g_type_class: GTypeClass,
    pub mask: c_uint,
    pub n_values: c_uint,
    pub values: *mut GFlagsValue,
}

pub type VipsTypeMapFn = unsafe extern "C" fn(GType, *mut c_void) -> *mut c_void;

pub type VipsArgumentMapFn = unsafe extern "C" fn(
    *mut VipsObject,
    *mut GParamSpec,
    *mut VipsArgumentClass,
    *mut VipsArgumentInstance,
    *mut c_void,
    *mut c_void,
) -> *mut c_void;

#[link(name = "vips")]
unsafe extern "C" {
    pub fn vips_init(argv0: *const c_char) -> c_int;
    pub fn vips_shutdown();
    pub fn vips_version(flag: c_int) -> c_int;
    pub fn vips_error_buffer() -> *const c_char;
    pub fn vips_error_clear();

    pub fn vips_type_map_all(base: GType, func: VipsTypeMapFn, a: *mut c_void) -> *mut c_void;
    pub fn vips_type_find(basename: *const c_char, nickname: *const c_char) -> GType;
    pub fn vips_nickname_find(gtype: GType) -> *const c_char;

    pub fn vips_operation_new(name: *const c_char) -> *mut VipsOperation;
    pub fn vips_operation_get_flags(operation: *mut VipsOperation) -> c_uint;
    pub fn vips_object_get_description(object: *mut VipsObject) -> *const c_char;
    pub fn vips_argument_map(
        object: *mut VipsObject,
        func: VipsArgumentMapFn,
        a: *mut c_void,
        b: *mut c_void,
    ) -> *mut c_void;
}

#[link(name = "gobject-2.0")]
unsafe extern "C" {
    pub fn g_type_from_name(name: *const c_char) -> GType;
    pub fn g_type_name(gtype: GType) -> *const c_char;
    pub fn g_type_fundamental(gtype: GType) -> GType;
    pub fn g_type_test_flags(gtype: GType, flags: c_uint) -> c_int;
    pub fn g_type_class_ref(gtype: GType) -> *mut c_void;
    pub fn g_type_class_unref(class: *mut c_void);
    pub fn g_object_unref(object: *mut c_void);
    pub fn g_param_spec_get_blurb(pspec: *mut GParamSpec) -> *const c_char;
    pub fn g_param_spec_get_nick(pspec: *mut GParamSpec) -> *const c_char;
    pub fn g_param_spec_get_default_value(pspec: *mut GParamSpec) -> *const GValue;
    pub fn g_value_get_boolean(value: *const GValue) -> c_int;
    pub fn g_value_get_int(value: *const GValue) -> c_int;
    pub fn g_value_get_uint(value: *const GValue) -> c_uint;
    pub fn g_value_get_int64(value: *const GValue) -> i64;
    pub fn g_value_get_uint64(value: *const GValue) -> u64;
    pub fn g_value_get_float(value: *const GValue) -> c_float;
    pub fn g_value_get_double(value: *const GValue) -> c_double;
    pub fn g_value_get_string(value: *const GValue) -> *const c_char;
    pub fn g_value_get_enum(value: *const GValue) -> c_int;
    pub fn g_value_get_flags(value: *const GValue) -> c_uint;
}
