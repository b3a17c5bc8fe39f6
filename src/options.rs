//! Dynamic libcurl option maps.
//!
//! libcurl's option space is open-ended, so options are modelled as an
//! ordered list of numeric [`Key`]s paired with an untyped [`OptionValue`].
//! The handle checks each value against the kind of argument its key takes
//! before forwarding it.

use std::fmt;

use crate::callback::{
    HeaderCallback, HeaderFunction, ProgressCallback, ProgressFunction, ReadCallback,
    ReadFunction, WriteCallback, WriteFunction,
};

const OBJECTPOINT: i32 = 10_000;
const FUNCTIONPOINT: i32 = 20_000;
const OFF_T: i32 = 30_000;
const BLOB: i32 = 40_000;
const BLOB_END: i32 = 50_000;

/// Numeric libcurl option id (`CURLOPT_*`).
///
/// Any id can be constructed; the constants cover the commonly used ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub i32);

/// The kind of argument an option takes, derived from its id range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// `long` argument
    Long,
    /// String, string list or data pointer argument
    Object,
    /// Callback function argument
    Function,
    /// `curl_off_t` argument
    OffT,
    /// `struct curl_blob` argument
    Blob,
    /// Outside every range libcurl defines
    Unknown,
}

impl Key {
    /// Make [`Handle::execute`](crate::Handle::execute) return the response
    /// body instead of writing it out.
    ///
    /// Handled by the wrapper; never forwarded to libcurl.
    pub const RETURNTRANSFER: Self = Self(19_913);

    /// `CURLOPT_PORT`
    pub const PORT: Self = Self(3);
    /// `CURLOPT_TIMEOUT`
    pub const TIMEOUT: Self = Self(13);
    /// `CURLOPT_VERBOSE`
    pub const VERBOSE: Self = Self(41);
    /// `CURLOPT_HEADER`
    pub const HEADER: Self = Self(42);
    /// `CURLOPT_NOPROGRESS`
    pub const NOPROGRESS: Self = Self(43);
    /// `CURLOPT_NOBODY`
    pub const NOBODY: Self = Self(44);
    /// `CURLOPT_FAILONERROR`
    pub const FAILONERROR: Self = Self(45);
    /// `CURLOPT_UPLOAD`
    pub const UPLOAD: Self = Self(46);
    /// `CURLOPT_POST`
    pub const POST: Self = Self(47);
    /// `CURLOPT_FOLLOWLOCATION`
    pub const FOLLOWLOCATION: Self = Self(52);
    /// `CURLOPT_SSL_VERIFYPEER`
    pub const SSL_VERIFYPEER: Self = Self(64);
    /// `CURLOPT_MAXREDIRS`
    pub const MAXREDIRS: Self = Self(68);
    /// `CURLOPT_CONNECTTIMEOUT`
    pub const CONNECTTIMEOUT: Self = Self(78);
    /// `CURLOPT_HTTPGET`
    pub const HTTPGET: Self = Self(80);
    /// `CURLOPT_SSL_VERIFYHOST`
    pub const SSL_VERIFYHOST: Self = Self(81);
    /// `CURLOPT_HTTP_VERSION`
    pub const HTTP_VERSION: Self = Self(84);
    /// `CURLOPT_TIMEOUT_MS`
    pub const TIMEOUT_MS: Self = Self(155);
    /// `CURLOPT_CONNECTTIMEOUT_MS`
    pub const CONNECTTIMEOUT_MS: Self = Self(156);

    /// `CURLOPT_WRITEDATA`, owned by the handle
    pub const WRITEDATA: Self = Self(OBJECTPOINT + 1);
    /// `CURLOPT_URL`
    pub const URL: Self = Self(OBJECTPOINT + 2);
    /// `CURLOPT_PROXY`
    pub const PROXY: Self = Self(OBJECTPOINT + 4);
    /// `CURLOPT_USERPWD`
    pub const USERPWD: Self = Self(OBJECTPOINT + 5);
    /// `CURLOPT_RANGE`
    pub const RANGE: Self = Self(OBJECTPOINT + 7);
    /// `CURLOPT_READDATA`, owned by the handle
    pub const READDATA: Self = Self(OBJECTPOINT + 9);
    /// `CURLOPT_ERRORBUFFER`, owned by the handle
    pub const ERRORBUFFER: Self = Self(OBJECTPOINT + 10);
    /// `CURLOPT_POSTFIELDS`, applied as a copied body
    pub const POSTFIELDS: Self = Self(OBJECTPOINT + 15);
    /// `CURLOPT_REFERER`
    pub const REFERER: Self = Self(OBJECTPOINT + 16);
    /// `CURLOPT_USERAGENT`
    pub const USERAGENT: Self = Self(OBJECTPOINT + 18);
    /// `CURLOPT_COOKIE`
    pub const COOKIE: Self = Self(OBJECTPOINT + 22);
    /// `CURLOPT_HTTPHEADER`
    pub const HTTPHEADER: Self = Self(OBJECTPOINT + 23);
    /// `CURLOPT_QUOTE`
    pub const QUOTE: Self = Self(OBJECTPOINT + 28);
    /// `CURLOPT_HEADERDATA`, owned by the handle
    pub const HEADERDATA: Self = Self(OBJECTPOINT + 29);
    /// `CURLOPT_CUSTOMREQUEST`
    pub const CUSTOMREQUEST: Self = Self(OBJECTPOINT + 36);
    /// `CURLOPT_POSTQUOTE`
    pub const POSTQUOTE: Self = Self(OBJECTPOINT + 39);
    /// `CURLOPT_PROGRESSDATA` / `CURLOPT_XFERINFODATA`, owned by the handle
    pub const XFERINFODATA: Self = Self(OBJECTPOINT + 57);
    /// `CURLOPT_TELNETOPTIONS`
    pub const TELNETOPTIONS: Self = Self(OBJECTPOINT + 70);
    /// `CURLOPT_PREQUOTE`
    pub const PREQUOTE: Self = Self(OBJECTPOINT + 93);
    /// `CURLOPT_ACCEPT_ENCODING`
    pub const ACCEPT_ENCODING: Self = Self(OBJECTPOINT + 102);
    /// `CURLOPT_PRIVATE`, a string kept alive by the handle
    pub const PRIVATE: Self = Self(OBJECTPOINT + 103);
    /// `CURLOPT_HTTP200ALIASES`
    pub const HTTP200ALIASES: Self = Self(OBJECTPOINT + 104);
    /// `CURLOPT_COPYPOSTFIELDS`
    pub const COPYPOSTFIELDS: Self = Self(OBJECTPOINT + 165);
    /// `CURLOPT_MAIL_RCPT`
    pub const MAIL_RCPT: Self = Self(OBJECTPOINT + 187);
    /// `CURLOPT_RESOLVE`
    pub const RESOLVE: Self = Self(OBJECTPOINT + 203);
    /// `CURLOPT_PROXYHEADER`
    pub const PROXYHEADER: Self = Self(OBJECTPOINT + 228);
    /// `CURLOPT_CONNECT_TO`
    pub const CONNECT_TO: Self = Self(OBJECTPOINT + 243);

    /// `CURLOPT_WRITEFUNCTION`
    pub const WRITEFUNCTION: Self = Self(FUNCTIONPOINT + 11);
    /// `CURLOPT_READFUNCTION`
    pub const READFUNCTION: Self = Self(FUNCTIONPOINT + 12);
    /// `CURLOPT_PROGRESSFUNCTION`, installed as the transfer-info callback
    pub const PROGRESSFUNCTION: Self = Self(FUNCTIONPOINT + 56);
    /// `CURLOPT_HEADERFUNCTION`
    pub const HEADERFUNCTION: Self = Self(FUNCTIONPOINT + 79);
    /// `CURLOPT_XFERINFOFUNCTION`
    pub const XFERINFOFUNCTION: Self = Self(FUNCTIONPOINT + 219);

    /// `CURLOPT_INFILESIZE_LARGE`
    pub const INFILESIZE_LARGE: Self = Self(OFF_T + 115);
    /// `CURLOPT_POSTFIELDSIZE_LARGE`
    pub const POSTFIELDSIZE_LARGE: Self = Self(OFF_T + 120);
    /// `CURLOPT_MAX_RECV_SPEED_LARGE`
    pub const MAX_RECV_SPEED_LARGE: Self = Self(OFF_T + 146);

    /// `CURLOPT_SSLCERT_BLOB`
    pub const SSLCERT_BLOB: Self = Self(BLOB + 291);
    /// `CURLOPT_SSLKEY_BLOB`
    pub const SSLKEY_BLOB: Self = Self(BLOB + 292);
    /// `CURLOPT_CAINFO_BLOB`
    pub const CAINFO_BLOB: Self = Self(BLOB + 309);

    /// Kind of argument this option takes.
    #[must_use]
    pub const fn class(self) -> KeyClass {
        match self.0 {
            0..OBJECTPOINT => KeyClass::Long,
            OBJECTPOINT..FUNCTIONPOINT => KeyClass::Object,
            FUNCTIONPOINT..OFF_T => KeyClass::Function,
            OFF_T..BLOB => KeyClass::OffT,
            BLOB..BLOB_END => KeyClass::Blob,
            _ => KeyClass::Unknown,
        }
    }

    /// Options whose argument is a `struct curl_slist`.
    #[must_use]
    pub const fn takes_list(self) -> bool {
        matches!(
            self,
            Self::HTTPHEADER
                | Self::QUOTE
                | Self::POSTQUOTE
                | Self::TELNETOPTIONS
                | Self::PREQUOTE
                | Self::HTTP200ALIASES
                | Self::MAIL_RCPT
                | Self::RESOLVE
                | Self::PROXYHEADER
                | Self::CONNECT_TO
        )
    }

    /// Options whose argument is a native object or user-data pointer that
    /// libcurl stores without copying (`CURLOPT_STDERR`, `CURLOPT_SHARE`,
    /// `CURLOPT_MIMEPOST`, `CURLOPT_CURLU`, the `*DATA` options, ...).
    ///
    /// Only `Null` can be passed for these.
    #[must_use]
    pub const fn takes_pointer(self) -> bool {
        if !matches!(self.class(), KeyClass::Object) {
            return false;
        }
        matches!(
            self.0 - OBJECTPOINT,
            24
                | 37
                | 95
                | 100
                | 109
                | 131
                | 149
                | 164
                | 168
                | 185
                | 195
                | 201
                | 202
                | 209
                | 240
                | 241
                | 269
                | 273
                | 282
                | 284
                | 302
                | 304
                | 313
                | 317
        )
    }

    /// User-data pointers the handle installs for its own callbacks.
    #[must_use]
    pub const fn is_managed(self) -> bool {
        matches!(
            self,
            Self::WRITEDATA
                | Self::READDATA
                | Self::HEADERDATA
                | Self::XFERINFODATA
                | Self::ERRORBUFFER
        )
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option {}", self.0)
    }
}

impl fmt::Display for KeyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Object => write!(f, "object"),
            Self::Function => write!(f, "function"),
            Self::OffT => write!(f, "off_t"),
            Self::Blob => write!(f, "blob"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Untyped option value.
#[derive(Debug, Clone)]
pub enum OptionValue {
    /// Boolean, sent to libcurl as `1`/`0`
    Bool(bool),
    /// `long` value
    Long(i64),
    /// `curl_off_t` value
    OffT(i64),
    /// String value
    Str(String),
    /// Raw bytes (blob options, binary post bodies)
    Bytes(Vec<u8>),
    /// String list
    List(Vec<String>),
    /// Header callback
    Header(HeaderFunction),
    /// Progress callback
    Progress(ProgressFunction),
    /// Read callback
    Read(ReadFunction),
    /// Write callback
    Write(WriteFunction),
    /// Unset the option
    Null,
}

impl OptionValue {
    /// Short name of the value's kind, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Long(_) => "long",
            Self::OffT(_) => "off_t",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Header(_) => "header function",
            Self::Progress(_) => "progress function",
            Self::Read(_) => "read function",
            Self::Write(_) => "write function",
            Self::Null => "null",
        }
    }

    /// Integer view of boolean and integer values.
    pub(crate) const fn as_long(&self) -> Option<i64> {
        match self {
            Self::Bool(flag) => Some(*flag as i64),
            Self::Long(value) | Self::OffT(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! long_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for OptionValue {
            fn from(value: $ty) -> Self {
                Self::Long(i64::from(value))
            }
        })*
    };
}

long_from!(i8, i16, i32, i64, u8, u16, u32);

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for OptionValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<Vec<u8>> for OptionValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for OptionValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<&[&str]> for OptionValue {
    fn from(value: &[&str]) -> Self {
        Self::List(value.iter().map(|item| (*item).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for OptionValue {
    fn from(value: [&str; N]) -> Self {
        Self::from(&value[..])
    }
}

impl From<HeaderFunction> for OptionValue {
    fn from(value: HeaderFunction) -> Self {
        Self::Header(value)
    }
}

impl From<ProgressFunction> for OptionValue {
    fn from(value: ProgressFunction) -> Self {
        Self::Progress(value)
    }
}

impl From<ReadFunction> for OptionValue {
    fn from(value: ReadFunction) -> Self {
        Self::Read(value)
    }
}

impl From<WriteFunction> for OptionValue {
    fn from(value: WriteFunction) -> Self {
        Self::Write(value)
    }
}

impl OptionValue {
    /// Wrap a header callback.
    pub fn header(callback: impl HeaderCallback + 'static) -> Self {
        Self::Header(HeaderFunction::new(callback))
    }

    /// Wrap a progress callback.
    pub fn progress(callback: impl ProgressCallback + 'static) -> Self {
        Self::Progress(ProgressFunction::new(callback))
    }

    /// Wrap a read callback.
    pub fn read(callback: impl ReadCallback + 'static) -> Self {
        Self::Read(ReadFunction::new(callback))
    }

    /// Wrap a write callback.
    pub fn write(callback: impl WriteCallback + 'static) -> Self {
        Self::Write(WriteFunction::new(callback))
    }
}

/// Ordered set of options, applied first to last.
///
/// Duplicate keys are kept; the later entry wins once applied.
#[derive(Debug, Clone, Default)]
pub struct Options {
    entries: Vec<(Key, OptionValue)>,
}

impl Options {
    /// Create an empty option list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an option, builder style.
    #[must_use]
    pub fn set(mut self, key: Key, value: impl Into<OptionValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Append an option.
    pub fn push(&mut self, key: Key, value: impl Into<OptionValue>) {
        self.entries.push((key, value.into()));
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in application order.
    pub fn iter(&self) -> impl Iterator<Item = &(Key, OptionValue)> {
        self.entries.iter()
    }
}

impl FromIterator<(Key, OptionValue)> for Options {
    fn from_iter<T: IntoIterator<Item = (Key, OptionValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Options {
    type Item = (Key, OptionValue);
    type IntoIter = std::vec::IntoIter<(Key, OptionValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = &'a (Key, OptionValue);
    type IntoIter = std::slice::Iter<'a, (Key, OptionValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_libcurl_ranges() {
        assert_eq!(Key::TIMEOUT.class(), KeyClass::Long);
        assert_eq!(Key::URL.class(), KeyClass::Object);
        assert_eq!(Key::RETURNTRANSFER.class(), KeyClass::Object);
        assert_eq!(Key::WRITEFUNCTION.class(), KeyClass::Function);
        assert_eq!(Key::POSTFIELDSIZE_LARGE.class(), KeyClass::OffT);
        assert_eq!(Key::CAINFO_BLOB.class(), KeyClass::Blob);
        assert_eq!(Key(i32::MIN).class(), KeyClass::Unknown);
        assert_eq!(Key(60_000).class(), KeyClass::Unknown);
    }

    #[test]
    fn list_keys() {
        assert!(Key::HTTPHEADER.takes_list());
        assert!(Key::RESOLVE.takes_list());
        assert!(!Key::URL.takes_list());
    }

    #[test]
    fn pointer_keys() {
        assert!(Key(OBJECTPOINT + 37).takes_pointer());
        assert!(Key(OBJECTPOINT + 282).takes_pointer());
        assert!(!Key::PRIVATE.takes_pointer());
        assert!(!Key::URL.takes_pointer());
        assert!(!Key::TIMEOUT.takes_pointer());
        assert!(!Key(i32::MIN).takes_pointer());
    }

    #[test]
    fn options_keep_insertion_order() {
        let options = Options::new()
            .set(Key::URL, "http://localhost/")
            .set(Key::RETURNTRANSFER, true)
            .set(Key::URL, "http://localhost/second");
        let keys: Vec<Key> = options.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![Key::URL, Key::RETURNTRANSFER, Key::URL]);
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn value_conversions() {
        assert!(matches!(OptionValue::from(true), OptionValue::Bool(true)));
        assert!(matches!(OptionValue::from(30_u32), OptionValue::Long(30)));
        assert!(matches!(OptionValue::from("GET"), OptionValue::Str(ref s) if s == "GET"));
        let headers = OptionValue::from(["Accept: */*", "X-Test: 1"]);
        assert!(matches!(headers, OptionValue::List(ref items) if items.len() == 2));
        assert_eq!(OptionValue::Null.kind(), "null");
        assert_eq!(OptionValue::Bool(true).as_long(), Some(1));
        assert_eq!(OptionValue::from("x").as_long(), None);
    }
}
