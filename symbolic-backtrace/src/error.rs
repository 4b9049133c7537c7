use std::io;

use thiserror::Error;

/// An error that prevented an object from being loaded into the chain at all.
///
/// This is the "reported-and-skipped-this-object" severity: the object is dropped, but any
/// sibling objects already in the chain (or loaded afterwards) are unaffected.
#[derive(Debug, Error)]
pub enum LoadObjectError {
    /// The file could not be opened or mapped.
    #[error("failed to open object file")]
    Io(#[from] io::Error),

    /// The buffer does not look like a supported object container.
    #[error("failed to parse object file")]
    Parse(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// An error returned by [`Backtrace::init`](crate::Backtrace::init) when no object at all could
/// be located for the requested executable.
///
/// This is the "reported-and-returned" severity of spec §7: unlike [`LoadObjectError`], which
/// drops a single object and continues, this aborts the whole initialization.
#[derive(Debug, Error)]
#[error("could not locate any object for '{path}'")]
pub struct InitError {
    pub(crate) path: String,
    #[source]
    pub(crate) source: LoadObjectError,
}

/// Sink for the free-form diagnostics the core may emit while still producing a usable (if
/// degraded) result.
///
/// Mirrors the C `on_error(msg, errnum, user_data)` callback: `errnum` is an OS `errno`-like value
/// when one is available, and `-1` otherwise. Receiving a call on this sink never implies that the
/// lookup that triggered it failed outright; see spec §7.
pub trait OnError {
    /// Reports a diagnostic message.
    fn report(&mut self, message: &str, errnum: i32);
}

impl<F> OnError for F
where
    F: FnMut(&str, i32),
{
    fn report(&mut self, message: &str, errnum: i32) {
        self(message, errnum)
    }
}

/// An `OnError` sink that discards every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreErrors;

impl OnError for IgnoreErrors {
    fn report(&mut self, _message: &str, _errnum: i32) {}
}

/// Forwards diagnostics to `tracing`, at `warn` level, the way the façade's own internals do.
///
/// Grounded on the teacher's `examples/` binaries, which initialize `tracing-subscriber` and let
/// library errors surface as structured log events rather than ad-hoc `eprintln!`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrors;

impl OnError for TracingErrors {
    fn report(&mut self, message: &str, errnum: i32) {
        if errnum >= 0 {
            tracing::warn!(errnum, "{message}");
        } else {
            tracing::warn!("{message}");
        }
    }
}
