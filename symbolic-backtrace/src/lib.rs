//! Offline symbolication of instruction-pointer addresses against ELF and Mach-O debug
//! information.
//!
//! This crate ties together [`symbolic_debuginfo`]'s object and DWARF readers into the four
//! operations a crash reporter actually needs: load every object mapped into a process
//! ([`Backtrace::init`]), and then repeatedly translate an address into a file/line and (possibly
//! inlined) function name ([`Backtrace::get_file_line`]), or just the enclosing symbol
//! ([`Backtrace::get_syminfo`]).
//!
//! Unlike the lower-level crates, which surface every failure through a `Result`,
//! `symbolic-backtrace` follows the "never fail the whole lookup over one bad section" model: a
//! missing `.gnu_debuglink` target, a malformed DWARF unit, or an unreadable alt-link file is
//! reported through the [`OnError`] sink and otherwise ignored, so a caller always gets the best
//! answer available rather than an error for what is usually a minor, recoverable problem. See
//! `DESIGN.md` for where this crate's behavior was deliberately tightened relative to that model.
//!
//! ```no_run
//! use symbolic_backtrace::{Backtrace, IgnoreErrors};
//!
//! let mut backtrace = Backtrace::init("/usr/bin/myapp", &mut IgnoreErrors).unwrap();
//!
//! backtrace.get_file_line(0x401234, &mut |frame| {
//!     println!("{:?}", frame);
//! }, &mut IgnoreErrors);
//! ```

mod chain;
mod error;
mod image;
mod lookup;
mod platform;
mod resolve;

use std::path::Path;

pub use crate::error::{IgnoreErrors, InitError, LoadObjectError, OnError, TracingErrors};
pub use crate::lookup::{FileLine, OnFileLine, OnSymInfo, SymInfo};
pub use crate::platform::{enumerate_mapped_images, MappedImage};

use crate::chain::Chain;

/// The symbolication core: an append-only chain of loaded objects, initialized once and then
/// queried many times.
///
/// A `Backtrace` owns its chain independently of any other instance -- there is no process-global
/// state here, unlike the reference implementation's single static chain. See `DESIGN.md` for why
/// that doesn't compromise the "append-only, walked front-to-back" guarantee spec §4.12/§5 need.
pub struct Backtrace {
    chain: Chain,
}

impl Backtrace {
    /// Loads the main executable at `path`, together with every other object currently mapped
    /// into this process (via [`enumerate_mapped_images`]), and resolves separate debug
    /// companions for each.
    ///
    /// Corresponds to spec §6's `init(filename, fd, on_error)`. Failing to load `path` itself is
    /// the one unrecoverable error; failures loading any of the other mapped images, or any of
    /// their debug companions, are reported through `on_error` and otherwise skipped.
    pub fn init(path: impl AsRef<Path>, on_error: &mut dyn OnError) -> Result<Self, InitError> {
        let path = path.as_ref();
        let chain = Chain::new();
        chain.load_executable(path, 0, on_error)?;

        for image in platform::enumerate_mapped_images() {
            if image.path == path {
                continue;
            }

            if let Err(error) = chain.load_executable(&image.path, image.base_address, on_error) {
                on_error.report(&error.to_string(), -1);
            }
        }

        Ok(Backtrace { chain })
    }

    /// Builds a resolver over an explicit list of images instead of the current process' own
    /// memory map.
    ///
    /// This is the seam tests (and embedders symbolicating a foreign process, e.g. from a
    /// minidump) use in place of [`Backtrace::init`]'s platform-specific enumeration.
    pub fn from_images<I>(images: I, on_error: &mut dyn OnError) -> Result<Self, InitError>
    where
        I: IntoIterator<Item = MappedImage>,
    {
        let chain = Chain::new();
        let mut loaded_any = false;
        let mut last_error = None;

        for image in images {
            match chain.load_executable(&image.path, image.base_address, on_error) {
                Ok(_) => loaded_any = true,
                Err(error) => last_error = Some(error),
            }
        }

        if loaded_any {
            Ok(Backtrace { chain })
        } else {
            Err(last_error.unwrap_or_else(|| InitError {
                path: String::new(),
                source: LoadObjectError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no images provided",
                )),
            }))
        }
    }

    /// Resolves `pc` to a file, line, and (possibly inlined) function name, per spec §4.12.
    ///
    /// `on_file_line` may be invoked more than once for a single call: once per inlined frame,
    /// deepest first, followed by the enclosing non-inlined function. If nothing at all is found,
    /// it is invoked exactly once with every field empty.
    pub fn get_file_line(
        &self,
        pc: u64,
        on_file_line: &mut dyn OnFileLine,
        on_error: &mut dyn OnError,
    ) {
        lookup::get_file_line(&self.chain, pc, on_file_line, on_error)
    }

    /// Resolves `pc` against the public symbol table only, ignoring debug information entirely.
    ///
    /// `on_syminfo` is invoked exactly once.
    pub fn get_syminfo(&self, pc: u64, on_syminfo: &mut dyn OnSymInfo, on_error: &mut dyn OnError) {
        lookup::get_syminfo(&self.chain, pc, on_syminfo, on_error)
    }
}
