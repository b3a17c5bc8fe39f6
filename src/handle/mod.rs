//! Object wrapper around one libcurl easy handle.

mod info;
mod raw;
pub(crate) mod scope;
mod session;

use std::mem;

use curl_sys::{CURL, CURLcode};
use tracing::{debug, trace, warn};

pub use info::{InfoKey, InfoValue, Information};
pub use raw::RawHandle;

use self::{
    raw::{CURLE_OK, SList},
    scope::ErrorScope,
    session::{Session, WriteMode},
};
use crate::{
    error::{Error, Result},
    options::{Key, KeyClass, OptionValue},
    pause::Pause,
};

/// Who is responsible for releasing the native handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created by the wrapper and released when it is dropped
    Owned,
    /// Supplied by the caller and never released implicitly
    Borrowed,
    /// Lent to a callback for the duration of one invocation
    Callback,
}

/// What a [`Handle`] is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Source {
    /// A new, empty session
    #[default]
    Empty,
    /// A new session with `CURLOPT_URL` preset
    Url(String),
    /// An existing native handle, wrapped without taking ownership
    Raw(RawHandle),
}

impl From<&str> for Source {
    fn from(url: &str) -> Self {
        Self::Url(url.to_owned())
    }
}

impl From<String> for Source {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<RawHandle> for Source {
    fn from(raw: RawHandle) -> Self {
        Self::Raw(raw)
    }
}

impl<T: Into<Self>> From<Option<T>> for Source {
    fn from(source: Option<T>) -> Self {
        source.map_or(Self::Empty, Into::into)
    }
}

/// A libcurl easy session.
///
/// Every operation fails with [`Error::NoOpenHandle`] once the handle has
/// been closed or detached. A handle is bound to the thread that created it.
pub struct Handle {
    raw: Option<RawHandle>,
    ownership: Ownership,
    session: Session,
}

impl Handle {
    /// Start a new session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] when libcurl cannot allocate a handle.
    pub fn new() -> Result<Self> {
        let raw = raw::init()
            .ok_or_else(|| Error::runtime_msg("curl_easy_init could not create a session"))?;
        debug!(handle = ?raw, "created libcurl session");
        Ok(Self::owned(raw))
    }

    /// Start a new session for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a URL containing a NUL byte.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        Self::from_source(Source::Url(url.into()))
    }

    /// Wrap a native handle created elsewhere.
    ///
    /// The wrapper never releases it on drop; [`close`](Self::close) does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a null handle.
    pub fn wrap(raw: RawHandle) -> Result<Self> {
        Self::from_source(Source::Raw(raw))
    }

    /// Build a handle from any supported source.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new), [`with_url`](Self::with_url) and [`wrap`](Self::wrap).
    pub fn from_source(source: impl Into<Source>) -> Result<Self> {
        match source.into() {
            Source::Empty => Self::new(),
            Source::Url(url) => {
                if url.contains('\0') {
                    return Err(Error::InvalidArgument(format!(
                        "expected a URL without NUL bytes; got: {url:?}"
                    )));
                }
                let mut handle = Self::new()?;
                handle.set_option(Key::URL, url)?;
                Ok(handle)
            }
            Source::Raw(raw) => {
                if raw.is_null() {
                    return Err(Error::InvalidArgument(
                        "expected a libcurl easy handle; got: null pointer".to_owned(),
                    ));
                }
                debug!(handle = ?raw, "wrapped foreign libcurl session");
                Ok(Self::with_ownership(raw, Ownership::Borrowed))
            }
        }
    }

    pub(crate) fn in_callback(raw: RawHandle) -> Self {
        Self::with_ownership(raw, Ownership::Callback)
    }

    fn owned(raw: RawHandle) -> Self {
        Self::with_ownership(raw, Ownership::Owned)
    }

    fn with_ownership(raw: RawHandle, ownership: Ownership) -> Self {
        Self {
            raw: Some(raw),
            ownership,
            session: Session::default(),
        }
    }

    fn open_handle(&self) -> Result<RawHandle> {
        self.raw.ok_or(Error::NoOpenHandle)
    }

    /// The native handle, if still open.
    #[must_use]
    pub fn raw(&self) -> Option<*mut CURL> {
        self.raw.map(RawHandle::as_ptr)
    }

    /// Whether the handle has neither been closed nor detached.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    /// Whether dropping the wrapper releases the native handle.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    /// Ownership of the native handle.
    #[must_use]
    pub const fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Set one option.
    ///
    /// # Errors
    ///
    /// [`Error::NoOpenHandle`] for a closed handle, otherwise
    /// [`Error::Runtime`] carrying the cause.
    pub fn set_option(&mut self, key: Key, value: impl Into<OptionValue>) -> Result<()> {
        let raw = self.open_handle()?;
        let scope = ErrorScope::enter(raw, self.is_owned());
        self.apply(raw, &scope, key, value.into()).map_err(|err| {
            Error::runtime("error occurred while setting libcurl session option", err)
        })
    }

    /// Set options one at a time, in order.
    ///
    /// Stops at the first failure; options applied before it stay applied.
    ///
    /// # Errors
    ///
    /// Same as [`set_option`](Self::set_option).
    pub fn set_options<I>(&mut self, options: I) -> Result<()>
    where
        I: IntoIterator<Item = (Key, OptionValue)>,
    {
        let raw = self.open_handle()?;
        let scope = ErrorScope::enter(raw, self.is_owned());
        for (key, value) in options {
            self.apply(raw, &scope, key, value).map_err(|err| {
                Error::runtime("error occurred while setting libcurl session options", err)
            })?;
        }
        Ok(())
    }

    fn apply(
        &mut self,
        raw: RawHandle,
        scope: &ErrorScope,
        key: Key,
        value: OptionValue,
    ) -> Result<()> {
        trace!(handle = ?raw, %key, kind = value.kind(), "setting option");
        if key == Key::RETURNTRANSFER {
            let flag = value.as_long().ok_or_else(|| mismatch(key, &value))?;
            let mode = if flag == 0 { WriteMode::Stdout } else { WriteMode::Return };
            // SAFETY: raw is open, and the slot lives in self.session.
            return scope.check(unsafe { self.session.set_write_mode(raw, mode) });
        }
        if key.is_managed() {
            return Err(Error::warning(format!("{key} is managed by the handle")));
        }
        // SAFETY: every branch below calls into libcurl on the open handle
        // with arguments of the kind the key's class expects.
        let code = unsafe {
            match key {
                Key::WRITEFUNCTION => {
                    let mode = match value {
                        OptionValue::Write(function) => WriteMode::User(function),
                        OptionValue::Null => WriteMode::Stdout,
                        other => return Err(mismatch(key, &other)),
                    };
                    self.session.set_write_mode(raw, mode)
                }
                Key::READFUNCTION => match value {
                    OptionValue::Read(function) => self.session.set_read(raw, Some(function)),
                    OptionValue::Null => self.session.set_read(raw, None),
                    other => return Err(mismatch(key, &other)),
                },
                Key::HEADERFUNCTION => match value {
                    OptionValue::Header(function) => self.session.set_header(raw, Some(function)),
                    OptionValue::Null => self.session.set_header(raw, None),
                    other => return Err(mismatch(key, &other)),
                },
                Key::PROGRESSFUNCTION | Key::XFERINFOFUNCTION => match value {
                    OptionValue::Progress(function) => {
                        self.session.set_progress(raw, Some(function))
                    }
                    OptionValue::Null => self.session.set_progress(raw, None),
                    other => return Err(mismatch(key, &other)),
                },
                Key::POSTFIELDS => match value {
                    OptionValue::Str(body) => post_fields(raw, scope, body.as_bytes())?,
                    OptionValue::Bytes(body) => post_fields(raw, scope, &body)?,
                    OptionValue::Null => raw::setopt_ptr(raw, key.0, std::ptr::null()),
                    other => return Err(mismatch(key, &other)),
                },
                Key::PRIVATE => match value {
                    OptionValue::Str(text) => {
                        let text = raw::c_string(text.as_bytes())?;
                        self.session.set_private(raw, Some(text))
                    }
                    OptionValue::Bytes(bytes) => {
                        self.session.set_private(raw, Some(raw::c_string(&bytes)?))
                    }
                    OptionValue::Null => self.session.set_private(raw, None),
                    other => return Err(mismatch(key, &other)),
                },
                _ => self.apply_by_class(raw, key, value)?,
            }
        };
        scope.check(code)
    }

    unsafe fn apply_by_class(
        &mut self,
        raw: RawHandle,
        key: Key,
        value: OptionValue,
    ) -> Result<CURLcode> {
        unsafe {
            match (key.class(), value) {
                (KeyClass::Long | KeyClass::Unknown, value) => {
                    let number = value.as_long().ok_or_else(|| mismatch(key, &value))?;
                    raw::setopt_long(raw, key.0, number)
                }
                (KeyClass::OffT, value) => {
                    let number = value.as_long().ok_or_else(|| mismatch(key, &value))?;
                    Ok(raw::setopt_off_t(raw, key.0, number))
                }
                (KeyClass::Object, OptionValue::List(items)) => {
                    if !key.takes_list() {
                        return Err(Error::warning(format!("{key} does not take a string list")));
                    }
                    let list = SList::new(&items)?;
                    let code = raw::setopt_ptr(raw, key.0, list.as_ptr().cast_const().cast());
                    self.session.retain_list(key, Some(list));
                    Ok(code)
                }
                (KeyClass::Object, OptionValue::Null) => {
                    let code = raw::setopt_ptr(raw, key.0, std::ptr::null());
                    if key.takes_list() {
                        self.session.retain_list(key, None);
                    }
                    Ok(code)
                }
                (KeyClass::Object, value) if key.takes_list() => Err(mismatch(key, &value)),
                (KeyClass::Object, _) if key.takes_pointer() => Err(Error::warning(format!(
                    "{key} takes a native pointer this handle cannot supply"
                ))),
                (KeyClass::Object, OptionValue::Str(text)) => {
                    raw::setopt_str(raw, key.0, text.as_bytes())
                }
                (KeyClass::Object, OptionValue::Bytes(bytes)) => {
                    raw::setopt_str(raw, key.0, &bytes)
                }
                (KeyClass::Blob, OptionValue::Str(text)) => {
                    Ok(raw::setopt_blob(raw, key.0, text.as_bytes()))
                }
                (KeyClass::Blob, OptionValue::Bytes(bytes)) => {
                    Ok(raw::setopt_blob(raw, key.0, &bytes))
                }
                (KeyClass::Blob, OptionValue::Null) => {
                    Ok(raw::setopt_ptr(raw, key.0, std::ptr::null()))
                }
                (KeyClass::Function, _) => Err(Error::warning(format!(
                    "{key} takes a callback this handle cannot install"
                ))),
                (_, value) => Err(mismatch(key, &value)),
            }
        }
    }

    /// Perform the transfer.
    ///
    /// Returns the response body when [`Key::RETURNTRANSFER`] is enabled and
    /// `None` otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::Transfer`] when libcurl reports a failure, [`Error::Runtime`]
    /// when a callback raised a warning during the transfer.
    pub fn execute(&mut self) -> Result<Option<Vec<u8>>> {
        let raw = self.open_handle()?;
        let scope = ErrorScope::enter(raw, self.is_owned());
        self.session.begin_transfer();
        trace!(handle = ?raw, "performing transfer");
        // SAFETY: raw is open and every installed slot lives in self.session.
        let code = unsafe { raw::perform(raw) };
        let body = self.session.finish_transfer();
        if let Some(warning) = scope.take_warning() {
            return Err(Error::runtime(
                "error occurred while executing libcurl session",
                warning,
            ));
        }
        if code != CURLE_OK {
            let err = Error::transfer(code, scope.message());
            debug!(handle = ?raw, code, error = %err, "transfer failed");
            return Err(err);
        }
        Ok(body)
    }

    /// All transfer information libcurl keeps for this session.
    ///
    /// # Errors
    ///
    /// [`Error::Runtime`] when any field cannot be read.
    pub fn information(&self) -> Result<Information> {
        let raw = self.open_handle()?;
        let scope = ErrorScope::enter(raw, self.is_owned());
        // SAFETY: raw is open.
        unsafe { Information::collect(raw, &scope) }.map_err(|err| {
            Error::runtime("error occurred while getting libcurl session information", err)
        })
    }

    /// One piece of transfer information.
    ///
    /// # Errors
    ///
    /// [`Error::Runtime`] for unknown ids or failed reads.
    pub fn information_field(&self, key: InfoKey) -> Result<InfoValue> {
        let raw = self.open_handle()?;
        let scope = ErrorScope::enter(raw, self.is_owned());
        // SAFETY: raw is open.
        unsafe { info::field(raw, &scope, key) }.map_err(|err| {
            Error::runtime("error occurred while getting libcurl session information", err)
        })
    }

    /// Restore every option to its default.
    ///
    /// # Errors
    ///
    /// [`Error::NoOpenHandle`] for a closed handle.
    pub fn reset(&mut self) -> Result<()> {
        let raw = self.open_handle()?;
        let _scope = ErrorScope::enter(raw, self.is_owned());
        // SAFETY: raw is open.
        unsafe { raw::reset(raw) };
        // libcurl no longer points at any of the old state.
        drop(mem::take(&mut self.session));
        debug!(handle = ?raw, "reset libcurl session");
        Ok(())
    }

    /// Pause or resume the transfer in one or both directions.
    ///
    /// # Errors
    ///
    /// [`Error::Transfer`] when libcurl refuses.
    pub fn pause(&mut self, bitmask: Pause) -> Result<()> {
        let raw = self.open_handle()?;
        let scope = ErrorScope::enter(raw, self.is_owned());
        // SAFETY: raw is open.
        let code = unsafe { raw::pause(raw, bitmask.bits()) };
        if let Some(warning) = scope.take_warning() {
            return Err(Error::runtime(
                "error occurred while pausing/unpausing libcurl session",
                warning,
            ));
        }
        if code != CURLE_OK {
            return Err(Error::transfer(code, scope.message()));
        }
        Ok(())
    }

    /// Resume a paused transfer in both directions.
    ///
    /// # Errors
    ///
    /// Same as [`pause`](Self::pause).
    pub fn resume(&mut self) -> Result<()> {
        self.pause(Pause::CONT)
    }

    /// Percent-encode `input` (RFC 3986).
    ///
    /// # Errors
    ///
    /// [`Error::Runtime`] when libcurl cannot encode the input.
    pub fn escape(&self, input: impl AsRef<[u8]>) -> Result<String> {
        let raw = self.open_handle()?;
        let _scope = ErrorScope::enter(raw, self.is_owned());
        // SAFETY: raw is open.
        unsafe { raw::escape(raw, input.as_ref()) }
            .map_err(|err| Error::runtime("error occurred while escaping string", err))
    }

    /// Decode a percent-encoded string.
    ///
    /// # Errors
    ///
    /// [`Error::Runtime`] when decoding fails or does not yield UTF-8.
    pub fn unescape(&self, input: impl AsRef<[u8]>) -> Result<String> {
        let bytes = self.unescape_bytes(input)?;
        String::from_utf8(bytes).map_err(|err| {
            Error::runtime(
                "error occurred while unescaping string",
                Error::warning(format!("decoded bytes are not UTF-8: {err}")),
            )
        })
    }

    /// Decode a percent-encoded string into raw bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Runtime`] when libcurl cannot decode the input.
    pub fn unescape_bytes(&self, input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let raw = self.open_handle()?;
        let _scope = ErrorScope::enter(raw, self.is_owned());
        // SAFETY: raw is open.
        unsafe { raw::unescape(raw, input.as_ref()) }
            .map_err(|err| Error::runtime("error occurred while unescaping string", err))
    }

    /// Release the native handle. Does nothing when already closed.
    ///
    /// Borrowed handles are released too. Inside a callback the wrapper only
    /// lets go, since libcurl forbids cleanup while its transfer runs.
    pub fn close(&mut self) {
        let Some(raw) = self.raw.take() else {
            return;
        };
        let session = mem::take(&mut self.session);
        if self.ownership == Ownership::Callback {
            warn!(handle = ?raw, "libcurl session cannot be released from its own callback");
            session.relinquish(raw);
            return;
        }
        scope::forget(raw);
        // SAFETY: raw is open and no wrapper call on it is in progress.
        unsafe { raw::cleanup(raw) };
        drop(session);
        debug!(handle = ?raw, "released libcurl session");
    }

    /// Give up the native handle without releasing it.
    ///
    /// Callback state registered through this wrapper stays alive, since the
    /// returned handle may still call into it.
    pub fn detach(&mut self) -> Option<*mut CURL> {
        let raw = self.raw.take()?;
        mem::take(&mut self.session).relinquish(raw);
        debug!(handle = ?raw, "detached libcurl session");
        Some(raw.as_ptr())
    }

    /// Duplicate the session with `curl_easy_duphandle`.
    ///
    /// The copy is owned and fully independent, except that callbacks are
    /// shared with the original. A closed handle duplicates to a closed one.
    ///
    /// # Errors
    ///
    /// [`Error::Runtime`] when libcurl cannot duplicate the session.
    pub fn try_clone(&self) -> Result<Self> {
        let Some(raw) = self.raw else {
            return Ok(Self {
                raw: None,
                ownership: Ownership::Owned,
                session: Session::default(),
            });
        };
        // SAFETY: raw is open.
        let copy = unsafe { raw::duplicate(raw) }
            .ok_or_else(|| Error::runtime_msg("curl_easy_duphandle could not copy the session"))?;
        let mut handle = Self::owned(copy);
        // SAFETY: copy is a fresh handle; it must not share this session's
        // error buffer or callback slots.
        let code = unsafe {
            raw::setopt_ptr(copy, Key::ERRORBUFFER.0, std::ptr::null());
            let (session, code) = self.session.duplicate(copy);
            handle.session = session;
            code
        };
        if code != CURLE_OK {
            return Err(Error::runtime(
                "error occurred while duplicating libcurl session",
                Error::transfer(code, None),
            ));
        }
        debug!(handle = ?raw, copy = ?copy, "duplicated libcurl session");
        Ok(handle)
    }
}

/// Binary-safe `CURLOPT_POSTFIELDS`: libcurl copies exactly `body`.
unsafe fn post_fields(raw: RawHandle, scope: &ErrorScope, body: &[u8]) -> Result<CURLcode> {
    let len = i64::try_from(body.len()).map_err(|_| Error::warning("request body too large"))?;
    scope.check(unsafe { raw::setopt_off_t(raw, Key::POSTFIELDSIZE_LARGE.0, len) })?;
    Ok(unsafe { raw::setopt_ptr(raw, Key::COPYPOSTFIELDS.0, body.as_ptr().cast()) })
}

fn mismatch(key: Key, value: &OptionValue) -> Error {
    Error::warning(format!("{key} does not accept a {} value", value.kind()))
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("raw", &self.raw)
            .field("ownership", &self.ownership)
            .finish_non_exhaustive()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.ownership == Ownership::Owned {
            self.close();
        } else if let Some(raw) = self.raw.take() {
            mem::take(&mut self.session).relinquish(raw);
            trace!(handle = ?raw, ownership = ?self.ownership, "let go of libcurl session");
        }
    }
}
