//! Scoped ownership of GObject handles.

use std::ffi::{CStr, c_char, c_void};
use std::ptr::NonNull;

use crate::ffi::{self, GType};

/// One owned GObject reference, released on drop.
pub(crate) struct ObjectRef<T> {
    ptr: NonNull<T>,
}

impl<T> ObjectRef<T> {
    /// Take ownership of a new reference. `None` for NULL.
    ///
    /// # Safety
    ///
    /// `ptr` must be NULL or a GObject the caller holds one reference to.
    pub(crate) unsafe fn from_owned(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T> Drop for ObjectRef<T> {
    fn drop(&mut self) {
        // SAFETY: the reference was owned since `from_owned` and is released exactly once.
        unsafe { ffi::g_object_unref(self.ptr.as_ptr().cast()) }
    }
}

/// A referenced GType class, released on drop.
pub(crate) struct ClassRef {
    ptr: NonNull<c_void>,
}

impl ClassRef {
    /// Reference the class of `gtype`. `None` when GLib returns NULL.
    ///
    /// # Safety
    ///
    /// `gtype` must be a registered classed type (enum, flags, object).
    pub(crate) unsafe fn new(gtype: GType) -> Option<Self> {
        // SAFETY: guaranteed by the caller.
        let ptr = unsafe { ffi::g_type_class_ref(gtype) };
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// The class viewed as `T`.
    pub(crate) fn as_ptr<T>(&self) -> *const T {
        self.ptr.as_ptr().cast_const().cast()
    }
}

impl Drop for ClassRef {
    fn drop(&mut self) {
        // SAFETY: paired with the g_type_class_ref in `new`.
        unsafe { ffi::g_type_class_unref(self.ptr.as_ptr()) }
    }
}

/// Copy a borrowed C string. NULL reads as empty.
///
/// # Safety
///
/// `ptr` must be NULL or point to a NUL-terminated string valid for the call.
pub(crate) unsafe fn text(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
