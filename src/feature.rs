//! Compile-time features of the linked libcurl (`CURL_VERSION_*` bits).

use std::{fmt, ops::BitOr};

use serde::Serialize;

use crate::version;

/// One or more libcurl feature bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Feature(pub u32);

macro_rules! features {
    ($($name:ident = $bit:literal, $label:literal, $description:literal;)*) => {
        impl Feature {
            $(
                #[doc = $description]
                pub const $name: Self = Self(1 << $bit);
            )*

            /// Every known feature, lowest bit first.
            pub const KNOWN: &'static [Self] = &[$(Self::$name),*];

            /// Union of every known feature.
            pub const ALL: Self = Self($((1 << $bit))|*);

            /// Short lowercase name of a single feature.
            #[must_use]
            pub const fn name(self) -> Option<&'static str> {
                match self {
                    $(Self::$name => Some($label),)*
                    _ => None,
                }
            }

            /// Human readable description of a single feature.
            #[must_use]
            pub const fn description(self) -> Option<&'static str> {
                match self {
                    $(Self::$name => Some($description),)*
                    _ => None,
                }
            }
        }
    };
}

features! {
    IPV6 = 0, "ipv6", "IPv6-enabled";
    KERBEROS4 = 1, "kerberos4", "Kerberos V4 auth is supported";
    SSL = 2, "ssl", "SSL options are present";
    LIBZ = 3, "libz", "libz features are present";
    NTLM = 4, "ntlm", "NTLM auth is supported";
    GSSNEGOTIATE = 5, "gssnegotiate", "Negotiate auth is supported";
    DEBUG = 6, "debug", "Built with debug capabilities";
    ASYNCHDNS = 7, "asynchdns", "Asynchronous DNS resolves";
    SPNEGO = 8, "spnego", "SPNEGO auth is supported";
    LARGEFILE = 9, "largefile", "Supports files larger than 2GB";
    IDN = 10, "idn", "Internationalized Domain Names are supported";
    SSPI = 11, "sspi", "Built against Windows SSPI";
    CONV = 12, "conv", "Character conversions supported";
    CURLDEBUG = 13, "curldebug", "Debug memory tracking supported";
    TLSAUTH_SRP = 14, "tlsauth_srp", "TLS-SRP auth is supported";
    NTLM_WB = 15, "ntlm_wb", "NTLM delegation to winbind helper is supported";
    HTTP2 = 16, "http2", "HTTP2 support built-in";
    GSSAPI = 17, "gssapi", "Built against a GSS-API library";
    KERBEROS5 = 18, "kerberos5", "Kerberos V5 auth is supported";
    UNIX_SOCKETS = 19, "unix_sockets", "Unix domain sockets support";
    PSL = 20, "psl", "Mozilla's Public Suffix List, used for cookie domain verification";
    HTTPS_PROXY = 21, "https_proxy", "HTTPS-proxy support built-in";
    MULTI_SSL = 22, "multi_ssl", "Multiple SSL backends available";
    BROTLI = 23, "brotli", "Brotli features are present";
    ALTSVC = 24, "altsvc", "Alt-Svc handling built-in";
    HTTP3 = 25, "http3", "HTTP3 support built-in";
    ZSTD = 26, "zstd", "zstd features are present";
    UNICODE = 27, "unicode", "Unicode support on Windows";
    HSTS = 28, "hsts", "HSTS is supported";
    GSASL = 29, "gsasl", "libgsasl is supported";
    THREADSAFE = 30, "threadsafe", "libcurl API is thread-safe";
}

impl Feature {
    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `self` is set in `mask`.
    #[must_use]
    pub const fn is_contained_in(self, mask: u32) -> bool {
        mask & self.0 == self.0
    }
}

impl BitOr for Feature {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#x}", self.0),
        }
    }
}

/// Status of one feature in the linked library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureInfo {
    /// Short lowercase name
    pub feature: &'static str,
    /// Human readable description
    pub description: &'static str,
    /// Feature bit
    pub constant: Feature,
    /// Whether the linked libcurl was built with it
    pub present: bool,
}

/// Feature bitmask reported by `curl_version_info`.
#[must_use]
pub fn features() -> u32 {
    let bits: libc::c_int = version::raw_info().map_or(0, |info| info.features);
    u32::from_ne_bytes(bits.to_ne_bytes())
}

/// Whether the linked libcurl has every bit of `feature`.
#[must_use]
pub fn is_present(feature: Feature) -> bool {
    feature.is_contained_in(features())
}

/// Every known feature with its status.
#[must_use]
pub fn list_features() -> Vec<FeatureInfo> {
    let mask = features();
    Feature::KNOWN
        .iter()
        .filter_map(|feature| {
            Some(FeatureInfo {
                feature: feature.name()?,
                description: feature.description()?,
                constant: *feature,
                present: feature.is_contained_in(mask),
            })
        })
        .collect()
}
