//! Wrapper-side session state: callback slots and retained option data.
//!
//! libcurl keeps raw pointers to everything installed here (callback user
//! data, string lists, the `CURLOPT_PRIVATE` string), so the state must
//! outlive any use of those pointers by the native handle. Slots are
//! reference counted so that duplicates of a session can share callbacks
//! while each gets its own slot pointing back at its own native handle.

use std::{
    cell::RefCell,
    collections::HashMap,
    ffi::CString,
    io::{self, Read, Write},
    mem,
    panic::{self, AssertUnwindSafe},
    ptr, slice,
    rc::Rc,
};

use curl_sys::{CURLcode, curl_off_t};
use libc::{c_char, c_int, c_void, size_t};
use tracing::debug;

use super::{
    raw::{self, CURL_READFUNC_ABORT, CURLE_OK, RawHandle, SList},
    scope,
};
use crate::{
    callback::{HeaderFunction, ProgressFunction, ReadFunction, WriteFunction},
    options::Key,
};

/// Where received body data goes.
#[derive(Debug, Clone, Default)]
pub(crate) enum WriteMode {
    /// Standard output, libcurl's own default
    #[default]
    Stdout,
    /// Collected and returned from `execute`
    Return,
    /// Handed to a user callback
    User(WriteFunction),
}

struct WriteSlot {
    raw: RawHandle,
    mode: WriteMode,
    body: RefCell<Vec<u8>>,
}

struct ReadSlot {
    raw: RawHandle,
    function: Option<ReadFunction>,
}

struct Slot<F> {
    raw: RawHandle,
    function: F,
}

#[derive(Default)]
pub(crate) struct Session {
    write: Option<Rc<WriteSlot>>,
    read: Option<Rc<ReadSlot>>,
    header: Option<Rc<Slot<HeaderFunction>>>,
    progress: Option<Rc<Slot<ProgressFunction>>>,
    lists: HashMap<Key, Rc<SList>>,
    private: Option<Rc<CString>>,
}

impl Session {
    pub(crate) fn is_empty(&self) -> bool {
        self.write.is_none()
            && self.read.is_none()
            && self.header.is_none()
            && self.progress.is_none()
            && self.lists.is_empty()
            && self.private.is_none()
    }

    pub(crate) unsafe fn set_write_mode(&mut self, raw: RawHandle, mode: WriteMode) -> CURLcode {
        let slot = Rc::new(WriteSlot {
            raw,
            mode,
            body: RefCell::new(Vec::new()),
        });
        let code = unsafe {
            install(
                raw,
                Key::WRITEFUNCTION,
                Key::WRITEDATA,
                write_trampoline as *const c_void,
                Rc::as_ptr(&slot).cast(),
            )
        };
        self.write = Some(slot);
        code
    }

    pub(crate) unsafe fn set_read(
        &mut self,
        raw: RawHandle,
        function: Option<ReadFunction>,
    ) -> CURLcode {
        let slot = Rc::new(ReadSlot { raw, function });
        let code = unsafe {
            install(
                raw,
                Key::READFUNCTION,
                Key::READDATA,
                read_trampoline as *const c_void,
                Rc::as_ptr(&slot).cast(),
            )
        };
        self.read = Some(slot);
        code
    }

    pub(crate) unsafe fn set_header(
        &mut self,
        raw: RawHandle,
        function: Option<HeaderFunction>,
    ) -> CURLcode {
        let Some(function) = function else {
            let code = unsafe {
                install(
                    raw,
                    Key::HEADERFUNCTION,
                    Key::HEADERDATA,
                    ptr::null(),
                    ptr::null(),
                )
            };
            self.header = None;
            return code;
        };
        let slot = Rc::new(Slot { raw, function });
        let code = unsafe {
            install(
                raw,
                Key::HEADERFUNCTION,
                Key::HEADERDATA,
                header_trampoline as *const c_void,
                Rc::as_ptr(&slot).cast(),
            )
        };
        self.header = Some(slot);
        code
    }

    pub(crate) unsafe fn set_progress(
        &mut self,
        raw: RawHandle,
        function: Option<ProgressFunction>,
    ) -> CURLcode {
        let Some(function) = function else {
            let code = unsafe {
                install(
                    raw,
                    Key::XFERINFOFUNCTION,
                    Key::XFERINFODATA,
                    ptr::null(),
                    ptr::null(),
                )
            };
            self.progress = None;
            return code;
        };
        let slot = Rc::new(Slot { raw, function });
        let code = unsafe {
            install(
                raw,
                Key::XFERINFOFUNCTION,
                Key::XFERINFODATA,
                xferinfo_trampoline as *const c_void,
                Rc::as_ptr(&slot).cast(),
            )
        };
        self.progress = Some(slot);
        code
    }

    /// Keep a string list alive while libcurl points at it.
    pub(crate) fn retain_list(&mut self, key: Key, list: Option<SList>) {
        match list {
            Some(list) => self.lists.insert(key, Rc::new(list)),
            None => self.lists.remove(&key),
        };
    }

    /// Install `CURLOPT_PRIVATE`; libcurl stores the pointer, not a copy.
    pub(crate) unsafe fn set_private(
        &mut self,
        raw: RawHandle,
        value: Option<CString>,
    ) -> CURLcode {
        let value = value.map(Rc::new);
        let pointer = value.as_ref().map_or(ptr::null(), |text| text.as_ptr().cast());
        let code = unsafe { raw::setopt_ptr(raw, Key::PRIVATE.0, pointer) };
        if code == CURLE_OK {
            self.private = value;
        }
        code
    }

    pub(crate) fn begin_transfer(&self) {
        if let Some(slot) = &self.write {
            slot.body.borrow_mut().clear();
        }
    }

    pub(crate) fn finish_transfer(&self) -> Option<Vec<u8>> {
        let slot = self.write.as_ref()?;
        matches!(slot.mode, WriteMode::Return).then(|| mem::take(&mut *slot.body.borrow_mut()))
    }

    /// Rebuild this session's slots for a duplicated native handle.
    ///
    /// `curl_easy_duphandle` copies the callback pointers and the user data
    /// pointers verbatim; the copy gets slots of its own that share the
    /// callbacks but report the copy's handle. Callbacks this session does
    /// not know about are reset on the copy, so it never points at user
    /// data owned by another wrapper.
    pub(crate) unsafe fn duplicate(&self, copy: RawHandle) -> (Self, CURLcode) {
        let mut session = Self {
            lists: self.lists.clone(),
            private: self.private.clone(),
            ..Self::default()
        };
        let write = self
            .write
            .as_ref()
            .map_or_else(WriteMode::default, |slot| slot.mode.clone());
        let read = self.read.as_ref().and_then(|slot| slot.function.clone());
        let header = self.header.as_ref().map(|slot| slot.function.clone());
        let progress = self.progress.as_ref().map(|slot| slot.function.clone());
        let codes = unsafe {
            [
                session.set_write_mode(copy, write),
                session.set_read(copy, read),
                session.set_header(copy, header),
                session.set_progress(copy, progress),
            ]
        };
        let code = codes.into_iter().find(|code| *code != CURLE_OK).unwrap_or(CURLE_OK);
        (session, code)
    }

    /// Let go of the state without freeing it.
    ///
    /// The native handle outlives this wrapper and may still call into the
    /// slots or read the lists, so they are leaked rather than dropped.
    pub(crate) fn relinquish(self, raw: RawHandle) {
        if self.is_empty() {
            return;
        }
        debug!(handle = ?raw, "leaking callback state of a relinquished libcurl handle");
        mem::forget(self);
    }
}

unsafe fn install(
    raw: RawHandle,
    function_key: Key,
    data_key: Key,
    function: *const c_void,
    data: *const c_void,
) -> CURLcode {
    let code = unsafe { raw::setopt_ptr(raw, data_key.0, data) };
    if code != CURLE_OK {
        return code;
    }
    unsafe { raw::setopt_ptr(raw, function_key.0, function) }
}

fn guarded<R>(raw: RawHandle, abort: R, body: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|text| (*text).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_owned());
            scope::raise(raw, format!("callback panicked: {reason}"));
            abort
        }
    }
}

unsafe fn chunk<'a>(ptr: *const c_char, size: usize, count: usize) -> &'a [u8] {
    let len = size.saturating_mul(count);
    if ptr.is_null() || len == 0 {
        return &[];
    }
    unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len) }
}

extern "C" fn write_trampoline(
    ptr: *mut c_char,
    size: size_t,
    count: size_t,
    data: *mut c_void,
) -> size_t {
    // SAFETY: data is the WriteSlot installed next to this trampoline.
    let slot = unsafe { &*data.cast::<WriteSlot>() };
    let chunk = unsafe { chunk(ptr, size, count) };
    guarded(slot.raw, 0, || match &slot.mode {
        WriteMode::User(function) => function.call(slot.raw, chunk),
        WriteMode::Return => match slot.body.try_borrow_mut() {
            Ok(mut body) => {
                body.extend_from_slice(chunk);
                chunk.len()
            }
            Err(_) => {
                scope::raise(slot.raw, "response body written re-entrantly");
                0
            }
        },
        WriteMode::Stdout => match io::stdout().write_all(chunk) {
            Ok(()) => chunk.len(),
            Err(err) => {
                scope::raise(slot.raw, format!("could not write response body to stdout: {err}"));
                0
            }
        },
    })
}

extern "C" fn header_trampoline(
    ptr: *mut c_char,
    size: size_t,
    count: size_t,
    data: *mut c_void,
) -> size_t {
    // SAFETY: data is the header slot installed next to this trampoline.
    let slot = unsafe { &*data.cast::<Slot<HeaderFunction>>() };
    let line = unsafe { chunk(ptr, size, count) };
    guarded(slot.raw, 0, || slot.function.call(slot.raw, line))
}

extern "C" fn read_trampoline(
    buffer: *mut c_char,
    size: size_t,
    count: size_t,
    data: *mut c_void,
) -> size_t {
    // SAFETY: data is the ReadSlot installed next to this trampoline.
    let slot = unsafe { &*data.cast::<ReadSlot>() };
    let max_len = size.saturating_mul(count);
    guarded(slot.raw, CURL_READFUNC_ABORT, || {
        let bytes = match &slot.function {
            Some(function) => function.call(slot.raw, max_len),
            None => read_stdin(slot.raw, max_len),
        };
        if bytes.len() > max_len {
            scope::raise(
                slot.raw,
                format!("read callback returned {} bytes, at most {max_len} allowed", bytes.len()),
            );
            return CURL_READFUNC_ABORT;
        }
        // SAFETY: libcurl provides room for size * count bytes.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.cast::<u8>(), bytes.len()) };
        bytes.len()
    })
}

fn read_stdin(raw: RawHandle, max_len: usize) -> Vec<u8> {
    let mut bytes = vec![0; max_len];
    match io::stdin().read(&mut bytes) {
        Ok(read) => {
            bytes.truncate(read);
            bytes
        }
        Err(err) => {
            scope::raise(raw, format!("could not read request body from stdin: {err}"));
            Vec::new()
        }
    }
}

extern "C" fn xferinfo_trampoline(
    data: *mut c_void,
    download_total: curl_off_t,
    downloaded: curl_off_t,
    upload_total: curl_off_t,
    uploaded: curl_off_t,
) -> c_int {
    // SAFETY: data is the progress slot installed next to this trampoline.
    let slot = unsafe { &*data.cast::<Slot<ProgressFunction>>() };
    guarded(slot.raw, 1, || {
        slot.function
            .call(slot.raw, download_total, downloaded, upload_total, uploaded)
    })
}
