//! Handle construction behind a trait, so callers can swap the factory.

use tracing::debug;

use crate::{
    error::Result,
    handle::{Handle, Source},
    options::Options,
};

/// Creates [`Handle`]s.
pub trait HandleFactory {
    /// Build a handle from `source`: nothing, a URL, or a native handle.
    ///
    /// # Errors
    ///
    /// Same as [`Handle::from_source`], plus any failure applying defaults.
    fn create_handle(&self, source: impl Into<Source>) -> Result<Handle>;
}

/// Default factory, optionally presetting options on every new session.
#[derive(Debug, Clone, Default)]
pub struct CurlHandleFactory {
    defaults: Options,
}

impl CurlHandleFactory {
    /// Factory without defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            defaults: Options::new(),
        }
    }

    /// Factory applying `defaults`, in order, to every session it creates.
    ///
    /// Wrapped native handles are left untouched.
    #[must_use]
    pub const fn with_defaults(defaults: Options) -> Self {
        Self { defaults }
    }

    /// Options applied to new sessions.
    #[must_use]
    pub const fn defaults(&self) -> &Options {
        &self.defaults
    }
}

impl HandleFactory for CurlHandleFactory {
    fn create_handle(&self, source: impl Into<Source>) -> Result<Handle> {
        let source = source.into();
        let fresh = !matches!(source, Source::Raw(_));
        let mut handle = Handle::from_source(source)?;
        if fresh && !self.defaults.is_empty() {
            debug!(count = self.defaults.len(), "applying default options");
            handle.set_options(self.defaults.clone())?;
        }
        Ok(handle)
    }
}
