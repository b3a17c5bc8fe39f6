//! Tests for handle factories

use curlhandle::{
    CurlHandleFactory, Error, HandleFactory, Key, Options, Ownership, RawHandle, Source,
};

mod common;
use common::server_uri;

#[test]
fn test_factory_creates_empty_session() {
    let factory = CurlHandleFactory::new();
    let handle = factory.create_handle(Source::Empty).unwrap();
    assert!(handle.is_open());
    assert!(handle.is_owned());

    let handle = factory.create_handle(None::<&str>).unwrap();
    assert!(handle.is_owned());
}

#[test]
fn test_factory_presets_url() {
    let factory = CurlHandleFactory::new();
    let mut handle = factory.create_handle(server_uri("/request")).unwrap();
    handle.set_option(Key::RETURNTRANSFER, true).unwrap();
    assert_eq!(handle.execute().unwrap().unwrap(), b"GET /request");
}

#[test]
fn test_factory_wraps_native_handle() {
    let factory = CurlHandleFactory::new();
    let mut owner = factory.create_handle(Source::Empty).unwrap();
    let raw = unsafe { RawHandle::from_ptr(owner.raw().unwrap()) };

    let wrapped = factory.create_handle(raw).unwrap();
    assert_eq!(wrapped.ownership(), Ownership::Borrowed);
    assert_eq!(wrapped.raw(), owner.raw());
    drop(wrapped);
    assert!(owner.set_option(Key::URL, server_uri("/request")).is_ok());
}

#[test]
fn test_factory_rejects_invalid_sources() {
    let factory = CurlHandleFactory::new();
    let err = factory.create_handle("http://x\0y/").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_defaults_apply_to_new_sessions() {
    let factory = CurlHandleFactory::with_defaults(
        Options::new()
            .set(Key::RETURNTRANSFER, true)
            .set(Key::CUSTOMREQUEST, "PUT"),
    );
    assert_eq!(factory.defaults().len(), 2);

    let mut handle = factory.create_handle(server_uri("/request")).unwrap();
    assert_eq!(handle.execute().unwrap().unwrap(), b"PUT /request");
}

#[test]
fn test_defaults_skip_wrapped_handles() {
    let owner = CurlHandleFactory::new().create_handle(Source::Empty).unwrap();
    let raw = unsafe { RawHandle::from_ptr(owner.raw().unwrap()) };

    let factory = CurlHandleFactory::with_defaults(Options::new().set(Key::URL, ["bad"]));
    let wrapped = factory.create_handle(raw).unwrap();
    assert!(wrapped.is_open());
    assert!(factory.create_handle(Source::Empty).unwrap_err().is_runtime());
}
