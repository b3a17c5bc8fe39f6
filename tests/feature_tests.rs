//! Tests for feature and version introspection

use curlhandle::{
    Feature,
    feature::{self, is_present, list_features},
    version,
};
use serde_json::Value;

#[test]
fn test_every_feature_is_listed_once() {
    let features = list_features();
    assert_eq!(features.len(), Feature::KNOWN.len());
    for (info, known) in features.iter().zip(Feature::KNOWN) {
        assert_eq!(info.constant, *known);
        assert_eq!(Some(info.feature), known.name());
        assert!(!info.description.is_empty());
    }
}

#[test]
fn test_presence_matches_reported_mask() {
    let mask = feature::features();
    for info in list_features() {
        assert_eq!(info.present, info.constant.is_contained_in(mask));
        assert_eq!(info.present, is_present(info.constant));
    }
}

#[test]
fn test_combined_features_need_every_bit() {
    let mask = feature::features();
    let combined = Feature::IPV6 | Feature::SSL | Feature::LIBZ;
    let expected = Feature::IPV6.is_contained_in(mask)
        && Feature::SSL.is_contained_in(mask)
        && Feature::LIBZ.is_contained_in(mask);
    assert_eq!(is_present(combined), expected);
    assert!(is_present(Feature(0)));
}

#[test]
fn test_feature_list_serializes() {
    let json = serde_json::to_value(list_features()).unwrap();
    let first = &json[0];
    assert_eq!(first["feature"], "ipv6");
    assert_eq!(first["description"], "IPv6-enabled");
    assert_eq!(first["constant"], 1);
    assert!(matches!(first["present"], Value::Bool(_)));
}

#[test]
fn test_version_strings() {
    assert!(!version::curl_version().is_empty());
    assert!(version::curl_version_number() > 0x07_00_00);
    if version::ssl_version().is_none() {
        assert!(!is_present(Feature::SSL));
    }
    let _ = version::ssl_version_number();
    let _ = version::libz_version();
}
