//! Transfer introspection (`curl_easy_getinfo`).

use std::{fmt, ptr};

use curl_sys::{CURLcode, curl_off_t, curl_slist};
use libc::{c_char, c_double, c_long};
use serde::Serialize;

use super::{
    raw::{self, RawHandle, SList},
    scope::ErrorScope,
};
use crate::error::{Error, Result};

const STRING: i32 = 0x10_0000;
const LONG: i32 = 0x20_0000;
const DOUBLE: i32 = 0x30_0000;
const SLIST: i32 = 0x40_0000;
const OFF_T: i32 = 0x60_0000;
const TYPEMASK: i32 = 0xf0_0000;

/// Numeric libcurl information id (`CURLINFO_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoKey(pub i32);

impl InfoKey {
    /// Last used URL
    pub const EFFECTIVE_URL: Self = Self(STRING + 1);
    /// Last received response code
    pub const RESPONSE_CODE: Self = Self(LONG + 2);
    /// Total transfer time in seconds
    pub const TOTAL_TIME: Self = Self(DOUBLE + 3);
    /// Time until name resolution completed
    pub const NAMELOOKUP_TIME: Self = Self(DOUBLE + 4);
    /// Time until the connection was established
    pub const CONNECT_TIME: Self = Self(DOUBLE + 5);
    /// Time until the transfer was about to start
    pub const PRETRANSFER_TIME: Self = Self(DOUBLE + 6);
    /// Bytes uploaded
    pub const SIZE_UPLOAD: Self = Self(OFF_T + 7);
    /// Bytes downloaded
    pub const SIZE_DOWNLOAD: Self = Self(OFF_T + 8);
    /// Average download speed, bytes per second
    pub const SPEED_DOWNLOAD: Self = Self(OFF_T + 9);
    /// Average upload speed, bytes per second
    pub const SPEED_UPLOAD: Self = Self(OFF_T + 10);
    /// Total size of received headers
    pub const HEADER_SIZE: Self = Self(LONG + 11);
    /// Total size of issued requests
    pub const REQUEST_SIZE: Self = Self(LONG + 12);
    /// Result of the certificate verification
    pub const SSL_VERIFYRESULT: Self = Self(LONG + 13);
    /// Remote time of the retrieved document
    pub const FILETIME: Self = Self(LONG + 14);
    /// Content length announced for the download
    pub const CONTENT_LENGTH_DOWNLOAD: Self = Self(OFF_T + 15);
    /// Content length announced for the upload
    pub const CONTENT_LENGTH_UPLOAD: Self = Self(OFF_T + 16);
    /// Time until the first byte was received
    pub const STARTTRANSFER_TIME: Self = Self(DOUBLE + 17);
    /// `Content-Type` of the response
    pub const CONTENT_TYPE: Self = Self(STRING + 18);
    /// Time spent following redirects
    pub const REDIRECT_TIME: Self = Self(DOUBLE + 19);
    /// Number of redirects followed
    pub const REDIRECT_COUNT: Self = Self(LONG + 20);
    /// Value set with `CURLOPT_PRIVATE`
    pub const PRIVATE: Self = Self(STRING + 21);
    /// Last proxy CONNECT response code
    pub const HTTP_CONNECTCODE: Self = Self(LONG + 22);
    /// errno of the last connect failure
    pub const OS_ERRNO: Self = Self(LONG + 25);
    /// Number of new connections made
    pub const NUM_CONNECTS: Self = Self(LONG + 26);
    /// Available TLS engines
    pub const SSL_ENGINES: Self = Self(SLIST + 27);
    /// Known cookies
    pub const COOKIELIST: Self = Self(SLIST + 28);
    /// URL a redirect would take you to
    pub const REDIRECT_URL: Self = Self(STRING + 31);
    /// IP address of the last connection
    pub const PRIMARY_IP: Self = Self(STRING + 32);
    /// Time until the TLS handshake completed
    pub const APPCONNECT_TIME: Self = Self(DOUBLE + 33);
    /// Whether a time condition was not met
    pub const CONDITION_UNMET: Self = Self(LONG + 35);
    /// Destination port of the last connection
    pub const PRIMARY_PORT: Self = Self(LONG + 40);
    /// Local IP address of the last connection
    pub const LOCAL_IP: Self = Self(STRING + 41);
    /// Local port of the last connection
    pub const LOCAL_PORT: Self = Self(LONG + 42);
    /// HTTP version used by the last connection
    pub const HTTP_VERSION: Self = Self(LONG + 46);
    /// URL scheme used by the last connection
    pub const SCHEME: Self = Self(STRING + 49);

    /// Type bits of the id.
    const fn class(self) -> i32 {
        self.0 & TYPEMASK
    }

    /// Pointer-class ids whose value is a `curl_slist` handed to the caller.
    /// The others (`CERTINFO`, `TLS_SSL_PTR`, ...) point at memory libcurl owns.
    const fn returns_list(self) -> bool {
        matches!(self, Self::SSL_ENGINES | Self::COOKIELIST)
    }
}

impl fmt::Display for InfoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "information {:#x}", self.0)
    }
}

/// One introspection value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    /// String value, `None` when libcurl has nothing to report
    Str(Option<String>),
    /// `long` value
    Long(i64),
    /// `double` value
    Double(f64),
    /// `curl_off_t` value
    OffT(i64),
    /// String list
    List(Vec<String>),
}

impl InfoValue {
    /// String view, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => value.as_deref(),
            _ => None,
        }
    }

    /// Integer view of `long` and `curl_off_t` values.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Long(value) | Self::OffT(value) => Some(*value),
            _ => None,
        }
    }

    /// Floating point view of `double` values.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }
}

/// Full introspection record of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct Information {
    pub url: Option<String>,
    pub content_type: Option<String>,
    pub http_code: i64,
    pub header_size: i64,
    pub request_size: i64,
    pub filetime: i64,
    pub ssl_verify_result: i64,
    pub redirect_count: i64,
    pub total_time: f64,
    pub namelookup_time: f64,
    pub connect_time: f64,
    pub pretransfer_time: f64,
    pub size_upload: i64,
    pub size_download: i64,
    pub speed_download: i64,
    pub speed_upload: i64,
    pub download_content_length: i64,
    pub upload_content_length: i64,
    pub starttransfer_time: f64,
    pub redirect_time: f64,
    pub redirect_url: Option<String>,
    pub primary_ip: Option<String>,
    pub primary_port: i64,
    pub local_ip: Option<String>,
    pub local_port: i64,
    pub http_version: i64,
    pub scheme: Option<String>,
}

impl Information {
    pub(crate) unsafe fn collect(raw: RawHandle, scope: &ErrorScope) -> Result<Self> {
        let text = |key| unsafe { string(raw, scope, key) };
        let int = |key| unsafe { long(raw, scope, key) };
        let real = |key| unsafe { double(raw, scope, key) };
        let size = |key| unsafe { off_t(raw, scope, key) };
        Ok(Self {
            url: text(InfoKey::EFFECTIVE_URL)?,
            content_type: text(InfoKey::CONTENT_TYPE)?,
            http_code: int(InfoKey::RESPONSE_CODE)?,
            header_size: int(InfoKey::HEADER_SIZE)?,
            request_size: int(InfoKey::REQUEST_SIZE)?,
            filetime: int(InfoKey::FILETIME)?,
            ssl_verify_result: int(InfoKey::SSL_VERIFYRESULT)?,
            redirect_count: int(InfoKey::REDIRECT_COUNT)?,
            total_time: real(InfoKey::TOTAL_TIME)?,
            namelookup_time: real(InfoKey::NAMELOOKUP_TIME)?,
            connect_time: real(InfoKey::CONNECT_TIME)?,
            pretransfer_time: real(InfoKey::PRETRANSFER_TIME)?,
            size_upload: size(InfoKey::SIZE_UPLOAD)?,
            size_download: size(InfoKey::SIZE_DOWNLOAD)?,
            speed_download: size(InfoKey::SPEED_DOWNLOAD)?,
            speed_upload: size(InfoKey::SPEED_UPLOAD)?,
            download_content_length: size(InfoKey::CONTENT_LENGTH_DOWNLOAD)?,
            upload_content_length: size(InfoKey::CONTENT_LENGTH_UPLOAD)?,
            starttransfer_time: real(InfoKey::STARTTRANSFER_TIME)?,
            redirect_time: real(InfoKey::REDIRECT_TIME)?,
            redirect_url: text(InfoKey::REDIRECT_URL)?,
            primary_ip: text(InfoKey::PRIMARY_IP)?,
            primary_port: int(InfoKey::PRIMARY_PORT)?,
            local_ip: text(InfoKey::LOCAL_IP)?,
            local_port: int(InfoKey::LOCAL_PORT)?,
            http_version: int(InfoKey::HTTP_VERSION)?,
            scheme: text(InfoKey::SCHEME)?,
        })
    }

    /// Look a field up by its information id.
    #[must_use]
    pub fn get(&self, key: InfoKey) -> Option<InfoValue> {
        let value = match key {
            InfoKey::EFFECTIVE_URL => InfoValue::Str(self.url.clone()),
            InfoKey::CONTENT_TYPE => InfoValue::Str(self.content_type.clone()),
            InfoKey::RESPONSE_CODE => InfoValue::Long(self.http_code),
            InfoKey::HEADER_SIZE => InfoValue::Long(self.header_size),
            InfoKey::REQUEST_SIZE => InfoValue::Long(self.request_size),
            InfoKey::FILETIME => InfoValue::Long(self.filetime),
            InfoKey::SSL_VERIFYRESULT => InfoValue::Long(self.ssl_verify_result),
            InfoKey::REDIRECT_COUNT => InfoValue::Long(self.redirect_count),
            InfoKey::TOTAL_TIME => InfoValue::Double(self.total_time),
            InfoKey::NAMELOOKUP_TIME => InfoValue::Double(self.namelookup_time),
            InfoKey::CONNECT_TIME => InfoValue::Double(self.connect_time),
            InfoKey::PRETRANSFER_TIME => InfoValue::Double(self.pretransfer_time),
            InfoKey::SIZE_UPLOAD => InfoValue::OffT(self.size_upload),
            InfoKey::SIZE_DOWNLOAD => InfoValue::OffT(self.size_download),
            InfoKey::SPEED_DOWNLOAD => InfoValue::OffT(self.speed_download),
            InfoKey::SPEED_UPLOAD => InfoValue::OffT(self.speed_upload),
            InfoKey::CONTENT_LENGTH_DOWNLOAD => InfoValue::OffT(self.download_content_length),
            InfoKey::CONTENT_LENGTH_UPLOAD => InfoValue::OffT(self.upload_content_length),
            InfoKey::STARTTRANSFER_TIME => InfoValue::Double(self.starttransfer_time),
            InfoKey::REDIRECT_TIME => InfoValue::Double(self.redirect_time),
            InfoKey::REDIRECT_URL => InfoValue::Str(self.redirect_url.clone()),
            InfoKey::PRIMARY_IP => InfoValue::Str(self.primary_ip.clone()),
            InfoKey::PRIMARY_PORT => InfoValue::Long(self.primary_port),
            InfoKey::LOCAL_IP => InfoValue::Str(self.local_ip.clone()),
            InfoKey::LOCAL_PORT => InfoValue::Long(self.local_port),
            InfoKey::HTTP_VERSION => InfoValue::Long(self.http_version),
            InfoKey::SCHEME => InfoValue::Str(self.scheme.clone()),
            _ => return None,
        };
        Some(value)
    }
}

/// Query one field, dispatching on the id's type bits.
pub(crate) unsafe fn field(raw: RawHandle, scope: &ErrorScope, key: InfoKey) -> Result<InfoValue> {
    unsafe {
        match key.class() {
            STRING => string(raw, scope, key).map(InfoValue::Str),
            LONG => long(raw, scope, key).map(InfoValue::Long),
            DOUBLE => double(raw, scope, key).map(InfoValue::Double),
            OFF_T => off_t(raw, scope, key).map(InfoValue::OffT),
            SLIST if key.returns_list() => list(raw, scope, key).map(InfoValue::List),
            SLIST => Err(Error::warning(format!("{key} points at memory owned by libcurl"))),
            _ => Err(Error::warning(format!("{key} has no supported value type"))),
        }
    }
}

unsafe fn getinfo<T>(raw: RawHandle, key: InfoKey, out: *mut T) -> CURLcode {
    unsafe { curl_sys::curl_easy_getinfo(raw.as_ptr(), raw::info(key.0), out) }
}

unsafe fn string(raw: RawHandle, scope: &ErrorScope, key: InfoKey) -> Result<Option<String>> {
    let mut value: *const c_char = ptr::null();
    scope.check(unsafe { getinfo(raw, key, &raw mut value) })?;
    Ok(unsafe { raw::borrowed_str(value) })
}

unsafe fn long(raw: RawHandle, scope: &ErrorScope, key: InfoKey) -> Result<i64> {
    let mut value: c_long = 0;
    scope.check(unsafe { getinfo(raw, key, &raw mut value) })?;
    Ok(i64::from(value))
}

unsafe fn double(raw: RawHandle, scope: &ErrorScope, key: InfoKey) -> Result<f64> {
    let mut value: c_double = 0.0;
    scope.check(unsafe { getinfo(raw, key, &raw mut value) })?;
    Ok(value)
}

unsafe fn off_t(raw: RawHandle, scope: &ErrorScope, key: InfoKey) -> Result<i64> {
    let mut value: curl_off_t = 0;
    scope.check(unsafe { getinfo(raw, key, &raw mut value) })?;
    Ok(value)
}

unsafe fn list(raw: RawHandle, scope: &ErrorScope, key: InfoKey) -> Result<Vec<String>> {
    let mut value: *mut curl_slist = ptr::null_mut();
    scope.check(unsafe { getinfo(raw, key, &raw mut value) })?;
    // Both list-valued ids hand ownership of the list to the caller.
    let list = unsafe { SList::from_raw(value) };
    Ok(list.to_strings())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_bits() {
        assert_eq!(InfoKey::EFFECTIVE_URL.class(), STRING);
        assert_eq!(InfoKey::RESPONSE_CODE.class(), LONG);
        assert_eq!(InfoKey::TOTAL_TIME.class(), DOUBLE);
        assert_eq!(InfoKey::SIZE_DOWNLOAD.class(), OFF_T);
        assert_eq!(InfoKey::COOKIELIST.class(), SLIST);
        assert_eq!(InfoKey(i32::MIN).class() & 0x70_0000, 0);
    }

    #[test]
    fn only_list_ids_are_lists() {
        assert!(InfoKey::SSL_ENGINES.returns_list());
        assert!(InfoKey::COOKIELIST.returns_list());
        assert!(!InfoKey(SLIST + 34).returns_list());
        assert!(!InfoKey(SLIST + 45).returns_list());
    }

    #[test]
    fn info_value_views() {
        assert_eq!(InfoValue::Str(Some("http".into())).as_str(), Some("http"));
        assert_eq!(InfoValue::Str(None).as_str(), None);
        assert_eq!(InfoValue::OffT(12).as_i64(), Some(12));
        assert_eq!(InfoValue::Double(0.5).as_f64(), Some(0.5));
        assert_eq!(InfoValue::Long(1).as_f64(), None);
    }
}
