//! # Object wrapper over the libcurl easy interface
//! curlhandle puts one libcurl easy session behind a [`Handle`]:
//! - Options set by numeric id, one at a time or as an ordered batch
//! - Transfers that return the body, stream it to a callback, or print it
//! - Native warnings escalated into typed errors, scoped to each call
//! - Wrapping, detaching and duplicating native handles
//! - Callbacks that receive a [`Handle`] instead of a raw pointer
//!
//! # Quick start
//! ```rust,no_run
//! # fn example() -> curlhandle::Result<()> {
//! use curlhandle::{Handle, Key};
//! let mut handle = Handle::with_url("https://example.com/")?;
//! handle.set_option(Key::RETURNTRANSFER, true)?;
//! let body = handle.execute()?.unwrap_or_default();
//! println!("{}", String::from_utf8_lossy(&body));
//! # Ok(())
//! # }
//! ```

pub mod callback;
mod error;
pub mod factory;
pub mod feature;
mod handle;
pub mod options;
mod pause;
pub mod version;

pub use callback::{
    HeaderCallback, HeaderFunction, ProgressCallback, ProgressFunction, ReadCallback,
    ReadFunction, WriteCallback, WriteFunction,
};
pub use error::{Error, ErrorKind, Result};
pub use factory::{CurlHandleFactory, HandleFactory};
pub use feature::{Feature, FeatureInfo};
pub use handle::{Handle, InfoKey, InfoValue, Information, Ownership, RawHandle, Source};
pub use options::{Key, KeyClass, OptionValue, Options};
pub use pause::Pause;
