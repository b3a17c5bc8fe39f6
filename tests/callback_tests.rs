//! Tests for the callback adapters

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use curlhandle::{
    Handle, HeaderFunction, Key, OptionValue, Ownership, ProgressFunction, RawHandle,
    ReadFunction, WriteFunction,
};

mod common;
use common::server_uri;

fn raw_of(handle: &Handle) -> RawHandle {
    unsafe { RawHandle::from_ptr(handle.raw().unwrap()) }
}

#[test]
fn test_header_adapter_passes_line_through() {
    let owner = Handle::new().unwrap();
    let raw = raw_of(&owner);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let lines = Rc::clone(&seen);
    let function = HeaderFunction::new(move |handle: &mut Handle, line: &[u8]| {
        assert_eq!(handle.ownership(), Ownership::Callback);
        lines.borrow_mut().push(line.to_vec());
        17
    });

    assert_eq!(function.call(raw, b"Content-Type: x\r\n"), 17);
    assert_eq!(seen.borrow().as_slice(), &[b"Content-Type: x\r\n".to_vec()]);
}

#[test]
fn test_progress_adapter_passes_counters_through() {
    let owner = Handle::new().unwrap();
    let raw = raw_of(&owner);
    let function = ProgressFunction::new(
        |_: &mut Handle, download_total: i64, downloaded: i64, upload_total: i64, uploaded: i64| {
            assert_eq!((download_total, downloaded, upload_total, uploaded), (4, 3, 2, 1));
            7
        },
    );
    assert_eq!(function.call(raw, 4, 3, 2, 1), 7);
}

#[test]
fn test_read_adapter_returns_callback_bytes() {
    let owner = Handle::new().unwrap();
    let raw = raw_of(&owner);
    let function = ReadFunction::new(|_: &mut Handle, max_len: usize| {
        assert_eq!(max_len, 16);
        b"chunk".to_vec()
    });
    assert_eq!(function.call(raw, 16), b"chunk");
}

#[test]
fn test_write_adapter_hands_out_the_same_session() {
    let owner = Handle::new().unwrap();
    let ptr = owner.raw().unwrap();
    let detached = Rc::new(Cell::new(None));
    let slot = Rc::clone(&detached);
    let function = WriteFunction::new(move |handle: &mut Handle, data: &[u8]| {
        assert_eq!(handle.raw(), Some(ptr));
        slot.set(handle.detach());
        data.len() + 1
    });

    assert_eq!(function.call(raw_of(&owner), b"payload"), 8);
    assert_eq!(detached.get(), Some(ptr));
    // Detaching the callback's view does not touch the owning wrapper.
    assert!(owner.is_open());
    assert_eq!(owner.escape("a b").unwrap(), "a%20b");
}

#[test]
fn test_close_inside_callback_keeps_session_alive() {
    let mut owner = Handle::with_url(server_uri("/request")).unwrap();
    owner
        .set_option(
            Key::WRITEFUNCTION,
            OptionValue::write(|handle: &mut Handle, data: &[u8]| {
                handle.close();
                assert!(!handle.is_open());
                data.len()
            }),
        )
        .unwrap();
    assert_eq!(owner.execute().unwrap(), None);
    assert!(owner.is_open());
    assert_eq!(owner.information().unwrap().http_code, 200);
}

#[test]
fn test_reentrant_call_is_refused() {
    let owner = Handle::new().unwrap();
    let raw = raw_of(&owner);
    let inner: Rc<RefCell<Option<WriteFunction>>> = Rc::new(RefCell::new(None));
    let lookup = Rc::clone(&inner);
    let function = WriteFunction::new(move |_: &mut Handle, data: &[u8]| {
        let again = lookup.borrow().clone().unwrap();
        again.call(raw, data)
    });
    *inner.borrow_mut() = Some(function.clone());

    assert_eq!(function.call(raw, b"data"), 0);
    // Break the cycle so the closure is freed.
    inner.borrow_mut().take();
}

#[test]
fn test_callbacks_may_configure_their_session() {
    let mut owner = Handle::with_url(server_uri("/request")).unwrap();
    owner.set_option(Key::RETURNTRANSFER, true).unwrap();
    owner
        .set_option(
            Key::HEADERFUNCTION,
            OptionValue::header(|handle: &mut Handle, line: &[u8]| {
                assert!(handle.escape("x y").is_ok());
                line.len()
            }),
        )
        .unwrap();
    let body = owner.execute().unwrap().unwrap();
    assert_eq!(body, b"GET /request");
}
