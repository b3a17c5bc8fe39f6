//! Thin `unsafe` helpers over the easy-interface FFI.
//!
//! Every function here requires a live easy handle; callers in the parent
//! module guarantee that through `Handle::open_handle`.

use std::{
    ffi::{CStr, CString},
    fmt,
    ptr::{self, NonNull},
};

use curl_sys::{CURL, CURLINFO, CURLcode, CURLoption, curl_slist};
use libc::{c_char, c_int, c_long, c_void};

use crate::error::{Error, Result};

pub(crate) const CURLE_OK: CURLcode = 0;
pub(crate) const CURL_ERROR_SIZE: usize = 256;
pub(crate) const CURL_READFUNC_ABORT: usize = 0x1000_0000;
const CURL_BLOB_COPY: u32 = 1;

/// Native libcurl easy handle (`CURL *`).
///
/// Copying a `RawHandle` does not copy the session; it is only the pointer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(*mut CURL);

impl RawHandle {
    /// Wrap a pointer obtained from `curl_easy_init` (or any libcurl binding).
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live easy handle, and must stay live for as
    /// long as any [`Handle`](crate::Handle) wraps it.
    #[must_use]
    pub const unsafe fn from_ptr(ptr: *mut CURL) -> Self {
        Self(ptr)
    }

    /// The underlying pointer.
    #[must_use]
    pub const fn as_ptr(self) -> *mut CURL {
        self.0
    }

    /// Whether the pointer is null.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0.is_null()
    }

    pub(crate) fn key(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:p})", self.0)
    }
}

/// Native option id. The public [`Key`](crate::Key) is an `i32`; libcurl's
/// enums are unsigned on most targets.
#[allow(clippy::cast_sign_loss)]
const fn option(key: i32) -> CURLoption {
    key as CURLoption
}

/// Native information id, see [`option`].
#[allow(clippy::cast_sign_loss)]
pub(crate) const fn info(key: i32) -> CURLINFO {
    key as CURLINFO
}

/// Mirror of libcurl's `struct curl_blob`.
#[repr(C)]
struct CurlBlob {
    data: *mut c_void,
    len: usize,
    flags: u32,
}

pub(crate) fn init() -> Option<RawHandle> {
    curl::init();
    // SAFETY: global init has run.
    let ptr = unsafe { curl_sys::curl_easy_init() };
    (!ptr.is_null()).then_some(RawHandle(ptr))
}

pub(crate) unsafe fn cleanup(raw: RawHandle) {
    unsafe { curl_sys::curl_easy_cleanup(raw.0) }
}

pub(crate) unsafe fn duplicate(raw: RawHandle) -> Option<RawHandle> {
    let ptr = unsafe { curl_sys::curl_easy_duphandle(raw.0) };
    (!ptr.is_null()).then_some(RawHandle(ptr))
}

pub(crate) unsafe fn reset(raw: RawHandle) {
    unsafe { curl_sys::curl_easy_reset(raw.0) }
}

pub(crate) unsafe fn perform(raw: RawHandle) -> CURLcode {
    unsafe { curl_sys::curl_easy_perform(raw.0) }
}

pub(crate) unsafe fn pause(raw: RawHandle, bitmask: c_int) -> CURLcode {
    unsafe { curl_sys::curl_easy_pause(raw.0, bitmask) }
}

pub(crate) unsafe fn setopt_long(raw: RawHandle, key: i32, value: i64) -> Result<CURLcode> {
    let value = c_long::try_from(value)
        .map_err(|_| Error::warning(format!("value {value} does not fit a C long")))?;
    Ok(unsafe { curl_sys::curl_easy_setopt(raw.0, option(key), value) })
}

pub(crate) unsafe fn setopt_off_t(raw: RawHandle, key: i32, value: i64) -> CURLcode {
    let value: curl_sys::curl_off_t = value;
    unsafe { curl_sys::curl_easy_setopt(raw.0, option(key), value) }
}

pub(crate) unsafe fn setopt_ptr(raw: RawHandle, key: i32, value: *const c_void) -> CURLcode {
    unsafe { curl_sys::curl_easy_setopt(raw.0, option(key), value) }
}

/// Set a string option; libcurl copies the string.
pub(crate) unsafe fn setopt_str(raw: RawHandle, key: i32, value: &[u8]) -> Result<CURLcode> {
    let value = c_string(value)?;
    Ok(unsafe { setopt_ptr(raw, key, value.as_ptr().cast()) })
}

/// Set a blob option; libcurl copies the bytes.
pub(crate) unsafe fn setopt_blob(raw: RawHandle, key: i32, value: &[u8]) -> CURLcode {
    let blob = CurlBlob {
        data: value.as_ptr().cast_mut().cast(),
        len: value.len(),
        flags: CURL_BLOB_COPY,
    };
    unsafe { setopt_ptr(raw, key, ptr::from_ref(&blob).cast()) }
}

pub(crate) fn c_string(value: &[u8]) -> Result<CString> {
    CString::new(value).map_err(|err| {
        Error::warning(format!(
            "string argument contains a NUL byte at position {}",
            err.nul_position()
        ))
    })
}

/// Read a NUL-terminated string owned by libcurl.
pub(crate) unsafe fn borrowed_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Owned `curl_slist`, freed on drop.
#[derive(Debug)]
pub(crate) struct SList(Option<NonNull<curl_slist>>);

impl SList {
    pub(crate) fn new<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self(None);
        for item in items {
            let item = c_string(item.as_ref().as_bytes())?;
            let head = list.as_ptr();
            // SAFETY: head is null or a list built by curl_slist_append.
            let appended = unsafe { curl_sys::curl_slist_append(head, item.as_ptr()) };
            let Some(appended) = NonNull::new(appended) else {
                return Err(Error::runtime_msg("curl_slist_append failed"));
            };
            list.0 = Some(appended);
        }
        Ok(list)
    }

    /// Take ownership of a list returned by libcurl.
    pub(crate) unsafe fn from_raw(ptr: *mut curl_slist) -> Self {
        Self(NonNull::new(ptr))
    }

    pub(crate) fn as_ptr(&self) -> *mut curl_slist {
        self.0.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    pub(crate) fn to_strings(&self) -> Vec<String> {
        let mut items = Vec::new();
        let mut node = self.as_ptr();
        while !node.is_null() {
            // SAFETY: node is an element of a well-formed list.
            let entry = unsafe { &*node };
            if let Some(item) = unsafe { borrowed_str(entry.data) } {
                items.push(item);
            }
            node = entry.next;
        }
        items
    }
}

impl Drop for SList {
    fn drop(&mut self) {
        if let Some(head) = self.0.take() {
            // SAFETY: head was produced by curl_slist_append or handed over by libcurl.
            unsafe { curl_sys::curl_slist_free_all(head.as_ptr()) }
        }
    }
}

/// Percent-encode `input` with the handle's encoder.
pub(crate) unsafe fn escape(raw: RawHandle, input: &[u8]) -> Result<String> {
    // A zero length makes libcurl fall back to strlen().
    if input.is_empty() {
        return Ok(String::new());
    }
    let len = c_int::try_from(input.len())
        .map_err(|_| Error::warning("input too long for curl_easy_escape"))?;
    let encoded = unsafe { curl_sys::curl_easy_escape(raw.0, input.as_ptr().cast(), len) };
    if encoded.is_null() {
        return Err(Error::runtime_msg("curl_easy_escape failed"));
    }
    let text = unsafe { CStr::from_ptr(encoded) }.to_string_lossy().into_owned();
    unsafe { curl_sys::curl_free(encoded.cast()) };
    Ok(text)
}

/// Decode a percent-encoded string with the handle's decoder.
pub(crate) unsafe fn unescape(raw: RawHandle, input: &[u8]) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    let len = c_int::try_from(input.len())
        .map_err(|_| Error::warning("input too long for curl_easy_unescape"))?;
    let mut out_len: c_int = 0;
    let decoded = unsafe {
        curl_sys::curl_easy_unescape(raw.0, input.as_ptr().cast(), len, &raw mut out_len)
    };
    if decoded.is_null() {
        return Err(Error::runtime_msg("curl_easy_unescape failed"));
    }
    let len = usize::try_from(out_len).unwrap_or_default();
    let bytes = unsafe { std::slice::from_raw_parts(decoded.cast::<u8>(), len) }.to_vec();
    unsafe { curl_sys::curl_free(decoded.cast()) };
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_cross_the_boundary_unchanged() {
        assert_eq!(i64::from(option(10_002)), 10_002);
        assert_eq!(i64::from(info(0x10_0001)), 0x10_0001);
        assert_eq!(CURLE_OK, 0);
    }
}
