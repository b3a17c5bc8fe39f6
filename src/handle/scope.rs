//! Scoped error interception around libcurl calls.
//!
//! An [`ErrorScope`] installs a fresh `CURLOPT_ERRORBUFFER` on the handle for
//! the duration of one wrapper call and collects warnings raised while the
//! call runs, including those raised by callbacks that fire inside it.
//! Scopes nest per handle (a callback may call back into the same handle);
//! dropping a scope restores whatever buffer the enclosing scope installed.
//!
//! Handles the wrapper does not own may carry an error buffer of their own,
//! which cannot be read back from libcurl. Buffers are therefore only
//! installed on owned handles and inside scopes that already installed one;
//! elsewhere messages fall back to `curl_easy_strerror`.

use std::{
    cell::{RefCell, UnsafeCell},
    collections::HashMap,
    ffi::CStr,
    ptr,
    rc::Rc,
};

use curl_sys::CURLcode;
use libc::c_char;
use tracing::{trace, warn};

use super::raw::{self, CURL_ERROR_SIZE, CURLE_OK, RawHandle};
use crate::{
    error::{Error, Result},
    options::Key,
};

struct Frame {
    buffer: Option<Box<UnsafeCell<[c_char; CURL_ERROR_SIZE]>>>,
    warnings: RefCell<Vec<String>>,
}

impl Frame {
    fn new(with_buffer: bool) -> Self {
        Self {
            buffer: with_buffer.then(|| Box::new(UnsafeCell::new([0; CURL_ERROR_SIZE]))),
            warnings: RefCell::new(Vec::new()),
        }
    }

    fn buffer_ptr(&self) -> Option<*mut c_char> {
        self.buffer.as_ref().map(|buffer| buffer.get().cast())
    }
}

thread_local! {
    static FRAMES: RefCell<HashMap<usize, Vec<Rc<Frame>>>> = RefCell::new(HashMap::new());
}

/// Guard that owns the error buffer and warnings of one wrapper call.
pub(crate) struct ErrorScope {
    raw: RawHandle,
    frame: Rc<Frame>,
}

impl ErrorScope {
    /// Open a scope on `raw`. `owned` tells whether the wrapper created the
    /// handle and so knows its error-buffer state.
    pub(crate) fn enter(raw: RawHandle, owned: bool) -> Self {
        let frame = FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            let stack = frames.entry(raw.key()).or_default();
            let enclosing = stack.last().and_then(|frame| frame.buffer_ptr());
            let frame = Rc::new(Frame::new(owned || enclosing.is_some()));
            stack.push(Rc::clone(&frame));
            frame
        });
        if let Some(buffer) = frame.buffer_ptr() {
            install(raw, buffer);
        }
        Self { raw, frame }
    }

    /// First warning recorded so far, consuming all of them.
    pub(crate) fn take_warning(&self) -> Option<Error> {
        let mut warnings = self.frame.warnings.borrow_mut();
        if warnings.is_empty() {
            return None;
        }
        let first = warnings.remove(0);
        for extra in warnings.drain(..) {
            trace!(warning = %extra, "additional warning in the same call");
        }
        Some(Error::Warning(first))
    }

    /// Text libcurl left in the error buffer, if any.
    pub(crate) fn message(&self) -> Option<String> {
        let buffer = self.frame.buffer.as_ref()?;
        // SAFETY: the buffer is zero-initialised and libcurl always
        // NUL-terminates what it writes; no native call is running now.
        let bytes = unsafe { &*buffer.get() };
        if bytes[0] == 0 {
            return None;
        }
        let text = unsafe { CStr::from_ptr(bytes.as_ptr()) };
        Some(text.to_string_lossy().trim_end().to_owned())
    }

    /// Turn a native result into the wrapper's error taxonomy.
    pub(crate) fn check(&self, code: CURLcode) -> Result<()> {
        if let Some(warning) = self.take_warning() {
            return Err(warning);
        }
        if code != CURLE_OK {
            return Err(Error::transfer(code, self.message()));
        }
        Ok(())
    }
}

impl Drop for ErrorScope {
    fn drop(&mut self) {
        let previous = FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            let Some(stack) = frames.get_mut(&self.raw.key()) else {
                return None;
            };
            if let Some(position) = stack.iter().rposition(|frame| Rc::ptr_eq(frame, &self.frame))
            {
                stack.remove(position);
            }
            let previous = stack.last().and_then(|frame| frame.buffer_ptr());
            if stack.is_empty() {
                frames.remove(&self.raw.key());
            }
            previous
        });
        if self.frame.buffer.is_some() {
            install(self.raw, previous.unwrap_or(ptr::null_mut()));
        }
        if let Some(Error::Warning(message)) = self.take_warning() {
            warn!(warning = %message, "warning raised after its call had completed");
        }
    }
}

fn install(raw: RawHandle, buffer: *mut c_char) {
    // SAFETY: scopes only exist around calls on an open handle, and the
    // buffer is either null or owned by a frame that outlives its install.
    let code = unsafe { raw::setopt_ptr(raw, Key::ERRORBUFFER.0, buffer.cast_const().cast()) };
    if code != CURLE_OK {
        trace!(code, "could not install libcurl error buffer");
    }
}

/// Raise a warning in the innermost scope active for `raw`.
///
/// Used where no error can be returned directly, such as inside callback
/// trampolines. Without an active scope the warning is only logged.
pub(crate) fn raise(raw: RawHandle, message: impl Into<String>) {
    let message = message.into();
    let frame = FRAMES.with(|frames| {
        frames
            .borrow()
            .get(&raw.key())
            .and_then(|stack| stack.last().cloned())
    });
    match frame {
        Some(frame) => frame.warnings.borrow_mut().push(message),
        None => warn!(handle = ?raw, warning = %message, "warning raised outside of any call"),
    }
}

/// Forget every frame recorded for a handle that is being released.
pub(crate) fn forget(raw: RawHandle) {
    FRAMES.with(|frames| {
        frames.borrow_mut().remove(&raw.key());
    });
}
