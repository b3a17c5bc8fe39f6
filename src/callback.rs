//! Callable adapters between libcurl callbacks and user code.
//!
//! libcurl calls back with a bare `CURL *`; each adapter wraps it in a
//! non-owning [`Handle`] so user code sees the same API it used to configure
//! the transfer. Implement the traits directly for stateful callbacks, or
//! pass a closure with the matching signature.

use std::{
    cell::{RefCell, RefMut},
    fmt,
    rc::Rc,
};

use crate::handle::{Handle, RawHandle, scope};

/// Receives response header lines.
pub trait HeaderCallback {
    /// Handle one header line, returning the number of bytes consumed.
    ///
    /// Anything other than `line.len()` aborts the transfer.
    fn header(&mut self, handle: &mut Handle, line: &[u8]) -> usize;
}

/// Observes transfer progress.
pub trait ProgressCallback {
    /// Return non-zero to abort the transfer.
    fn progress(
        &mut self,
        handle: &mut Handle,
        download_total: i64,
        downloaded: i64,
        upload_total: i64,
        uploaded: i64,
    ) -> i32;
}

/// Supplies request body data.
pub trait ReadCallback {
    /// Produce at most `max_len` bytes; an empty vector ends the body.
    fn read(&mut self, handle: &mut Handle, max_len: usize) -> Vec<u8>;
}

/// Consumes response body data.
pub trait WriteCallback {
    /// Handle one chunk, returning the number of bytes consumed.
    ///
    /// Anything other than `data.len()` aborts the transfer.
    fn write(&mut self, handle: &mut Handle, data: &[u8]) -> usize;
}

impl<F> HeaderCallback for F
where
    F: FnMut(&mut Handle, &[u8]) -> usize,
{
    fn header(&mut self, handle: &mut Handle, line: &[u8]) -> usize {
        self(handle, line)
    }
}

impl<F> ProgressCallback for F
where
    F: FnMut(&mut Handle, i64, i64, i64, i64) -> i32,
{
    fn progress(
        &mut self,
        handle: &mut Handle,
        download_total: i64,
        downloaded: i64,
        upload_total: i64,
        uploaded: i64,
    ) -> i32 {
        self(handle, download_total, downloaded, upload_total, uploaded)
    }
}

impl<F> ReadCallback for F
where
    F: FnMut(&mut Handle, usize) -> Vec<u8>,
{
    fn read(&mut self, handle: &mut Handle, max_len: usize) -> Vec<u8> {
        self(handle, max_len)
    }
}

impl<F> WriteCallback for F
where
    F: FnMut(&mut Handle, &[u8]) -> usize,
{
    fn write(&mut self, handle: &mut Handle, data: &[u8]) -> usize {
        self(handle, data)
    }
}

macro_rules! adapter {
    ($(#[$meta:meta])* $name:ident, $trait:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Rc<RefCell<dyn $trait>>);

        impl $name {
            /// Wrap a callback.
            pub fn new(callback: impl $trait + 'static) -> Self {
                Self(Rc::new(RefCell::new(callback)))
            }

            fn enter(&self, raw: RawHandle) -> Option<RefMut<'_, dyn $trait + 'static>> {
                match self.0.try_borrow_mut() {
                    Ok(callback) => Some(callback),
                    Err(_) => {
                        scope::raise(raw, concat!($label, " callback invoked re-entrantly"));
                        None
                    }
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }
    };
}

adapter!(
    /// Shared header callback.
    HeaderFunction,
    HeaderCallback,
    "header"
);
adapter!(
    /// Shared progress callback.
    ProgressFunction,
    ProgressCallback,
    "progress"
);
adapter!(
    /// Shared read callback.
    ReadFunction,
    ReadCallback,
    "read"
);
adapter!(
    /// Shared write callback.
    WriteFunction,
    WriteCallback,
    "write"
);

impl HeaderFunction {
    /// Invoke the callback on behalf of the session behind `raw`.
    pub fn call(&self, raw: RawHandle, line: &[u8]) -> usize {
        let Some(mut callback) = self.enter(raw) else {
            return 0;
        };
        let mut handle = Handle::in_callback(raw);
        callback.header(&mut handle, line)
    }
}

impl ProgressFunction {
    /// Invoke the callback on behalf of the session behind `raw`.
    pub fn call(
        &self,
        raw: RawHandle,
        download_total: i64,
        downloaded: i64,
        upload_total: i64,
        uploaded: i64,
    ) -> i32 {
        let Some(mut callback) = self.enter(raw) else {
            return 1;
        };
        let mut handle = Handle::in_callback(raw);
        callback.progress(&mut handle, download_total, downloaded, upload_total, uploaded)
    }
}

impl ReadFunction {
    /// Invoke the callback on behalf of the session behind `raw`.
    pub fn call(&self, raw: RawHandle, max_len: usize) -> Vec<u8> {
        let Some(mut callback) = self.enter(raw) else {
            return Vec::new();
        };
        let mut handle = Handle::in_callback(raw);
        callback.read(&mut handle, max_len)
    }
}

impl WriteFunction {
    /// Invoke the callback on behalf of the session behind `raw`.
    pub fn call(&self, raw: RawHandle, data: &[u8]) -> usize {
        let Some(mut callback) = self.enter(raw) else {
            return 0;
        };
        let mut handle = Handle::in_callback(raw);
        callback.write(&mut handle, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        chunks: usize,
    }

    impl WriteCallback for Counter {
        fn write(&mut self, _handle: &mut Handle, data: &[u8]) -> usize {
            self.chunks += 1;
            data.len()
        }
    }

    #[test]
    fn struct_callbacks_keep_state() {
        let mut counter = Counter { chunks: 0 };
        let mut handle = Handle::new().unwrap();
        assert_eq!(counter.write(&mut handle, b"abc"), 3);
        assert_eq!(counter.write(&mut handle, b""), 0);
        assert_eq!(counter.chunks, 2);
    }

    #[test]
    fn adapters_debug_without_contents() {
        let function = HeaderFunction::new(|_: &mut Handle, line: &[u8]| line.len());
        assert_eq!(format!("{function:?}"), "HeaderFunction { .. }");
        let clone = function.clone();
        assert!(Rc::ptr_eq(&function.0, &clone.0));
    }
}
