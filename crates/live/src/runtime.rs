//! Process-wide libvips lifetime.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};
use vipsgen_core::{GenError, Result};

use crate::ffi;
use crate::guard::text;

static ACTIVE: AtomicBool = AtomicBool::new(false);

/// A started libvips runtime.
///
/// At most one exists at a time, and it stays on the thread that created it. Dropping it
/// shuts libvips down.
#[derive(Debug)]
pub struct LiveRuntime {
    version: String,
    _not_send: PhantomData<*const ()>,
}

impl LiveRuntime {
    /// Start libvips.
    ///
    /// Fails with [`GenError::Initialization`] if another runtime is alive or `vips_init`
    /// reports an error.
    pub fn init() -> Result<Self> {
        if ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GenError::Initialization(
                "a libvips runtime is already active".to_string(),
            ));
        }

        // SAFETY: ACTIVE admits one caller; argv0 is a static NUL-terminated string.
        let status = unsafe { ffi::vips_init(c"vipsgen".as_ptr()) };
        if status != 0 {
            let message = take_error();
            ACTIVE.store(false, Ordering::Release);
            return Err(GenError::Initialization(message));
        }

        let version = (0..3)
            .map(|flag| {
                // SAFETY: vips_version only reads compiled-in constants.
                unsafe { ffi::vips_version(flag) }.to_string()
            })
            .collect::<Vec<_>>()
            .join(".");
        info!(version = %version, "Initialized libvips.");

        Ok(Self {
            version,
            _not_send: PhantomData,
        })
    }

    /// libvips version, `major.minor.micro`.
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Drop for LiveRuntime {
    fn drop(&mut self) {
        // SAFETY: paired with the successful vips_init in `init`.
        unsafe { ffi::vips_shutdown() };
        ACTIVE.store(false, Ordering::Release);
        debug!("Shut down libvips.");
    }
}

/// Read and clear the libvips error buffer.
pub(crate) fn take_error() -> String {
    // SAFETY: the buffer is a NUL-terminated string owned by libvips.
    let message = unsafe { text(ffi::vips_error_buffer()) };
    // SAFETY: no borrowed pointer into the buffer outlives this call.
    unsafe { ffi::vips_error_clear() };
    message.trim().to_string()
}
