// C ABI trampolines shaped like libvlc's media callbacks.
//
// The opaque pointer is produced by `CallbackMediaAdapter::into_raw` and must be
// released with `ma_media_release` after the engine has called close.

use std::os::raw::{c_int, c_uchar, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::slice;

use super::{CallbackMedia, CallbackMediaAdapter};

pub const MA_OK: c_int = 0;
pub const MA_ERROR: c_int = -1;

impl CallbackMediaAdapter {
    /// Move the adapter to the heap and hand out the opaque pointer for the C callbacks.
    pub fn into_raw(self) -> *mut c_void {
        Box::into_raw(Box::new(self)) as *mut c_void
    }

    /// Reclaim an adapter produced by [`CallbackMediaAdapter::into_raw`].
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` and must not be used afterwards.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Self {
        *Box::from_raw(ptr as *mut CallbackMediaAdapter)
    }
}

unsafe fn adapter<'a>(opaque: *mut c_void) -> Option<&'a mut CallbackMediaAdapter> {
    (opaque as *mut CallbackMediaAdapter).as_mut()
}

fn guarded<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(fallback)
}

/// Open callback. Stores `opaque` in `*datap` and the size in `*sizep`.
///
/// # Safety
/// `opaque` must come from `into_raw`; `datap` and `sizep` must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn ma_media_open(
    opaque: *mut c_void,
    datap: *mut *mut c_void,
    sizep: *mut u64,
) -> c_int {
    let Some(media) = adapter(opaque) else {
        return MA_ERROR;
    };
    guarded(MA_ERROR, || {
        if !media.on_open() {
            return MA_ERROR;
        }
        if !datap.is_null() {
            *datap = opaque;
        }
        if !sizep.is_null() {
            *sizep = media.on_get_size();
        }
        MA_OK
    })
}

/// Read callback. Returns the byte count or `-1` at end of stream or on error.
///
/// # Safety
/// `opaque` must come from `into_raw`; `buf` must point to `len` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn ma_media_read(opaque: *mut c_void, buf: *mut c_uchar, len: usize) -> isize {
    let Some(media) = adapter(opaque) else {
        return -1;
    };
    if len == 0 {
        return 0;
    }
    if buf.is_null() {
        return -1;
    }
    let buf = slice::from_raw_parts_mut(buf, len);
    guarded(-1, || media.on_read(buf) as isize)
}

/// Seek callback.
///
/// # Safety
/// `opaque` must come from `into_raw`.
#[no_mangle]
pub unsafe extern "C" fn ma_media_seek(opaque: *mut c_void, offset: u64) -> c_int {
    let Some(media) = adapter(opaque) else {
        return MA_ERROR;
    };
    guarded(MA_ERROR, || if media.on_seek(offset) { MA_OK } else { MA_ERROR })
}

/// Close callback. Does not free the adapter.
///
/// # Safety
/// `opaque` must come from `into_raw`.
#[no_mangle]
pub unsafe extern "C" fn ma_media_close(opaque: *mut c_void) {
    if let Some(media) = adapter(opaque) {
        guarded((), || media.on_close());
    }
}

/// Free an adapter after the engine is done with it.
///
/// # Safety
/// `opaque` must come from `into_raw` and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn ma_media_release(opaque: *mut c_void) {
    if !opaque.is_null() {
        drop(CallbackMediaAdapter::from_raw(opaque));
    }
}
