//! Version data of the linked libcurl.

use curl::Version;

/// libcurl version, e.g. `8.5.0`.
#[must_use]
pub fn curl_version() -> String {
    Version::get().version().to_owned()
}

/// libcurl version as a 24 bit number (`0xXXYYZZ`).
#[must_use]
pub fn curl_version_number() -> u32 {
    Version::get().version_num()
}

/// Version string of the TLS backend, if any.
#[must_use]
pub fn ssl_version() -> Option<String> {
    Version::get().ssl_version().map(str::to_owned)
}

/// Numeric TLS backend version; zero when libcurl does not report one.
#[must_use]
pub fn ssl_version_number() -> i64 {
    raw_info().map_or(0, |info| i64::from(info.ssl_version_num))
}

/// zlib version string, if built with zlib.
#[must_use]
pub fn libz_version() -> Option<String> {
    Version::get().libz_version().map(str::to_owned)
}

/// Host triple libcurl was built for.
#[must_use]
pub fn host() -> String {
    Version::get().host().to_owned()
}

/// URL schemes the library supports.
#[must_use]
pub fn protocols() -> Vec<String> {
    Version::get().protocols().map(str::to_owned).collect()
}

/// Raw `curl_version_info` record.
pub(crate) fn raw_info() -> Option<&'static curl_sys::curl_version_info_data> {
    curl::init();
    // SAFETY: libcurl returns a pointer to static data, or null.
    unsafe { curl_sys::curl_version_info(curl_sys::CURLVERSION_NOW).as_ref() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_matches_string() {
        let number = curl_version_number();
        let major = number >> 16;
        assert!(curl_version().starts_with(&format!("{major}.")));
    }

    #[test]
    fn protocols_include_http() {
        assert!(protocols().iter().any(|protocol| protocol == "http"));
        assert!(!host().is_empty());
    }
}
