//! Building the append-only chain of loaded objects for one executable.
//!
//! Spec §4.12 describes a process-lifetime, append-only list of loaded objects that is walked in
//! order on every lookup, with new objects only ever appended, never reordered or removed. The
//! reference implementation keeps this as a global linked list guarded by a spinlock; we instead
//! scope the chain to a [`crate::Backtrace`] instance and hold it behind an `Arc<RwLock<Vec<_>>>`.
//! This sidesteps a process-global `static` (which in Rust would need `unsafe` `OnceLock`
//! shenanigans to become mutable at all) without giving up any of the guarantee the spec actually
//! cares about: entries are pushed once and read many times, and a reference handed out from a
//! lookup stays valid because the backing `Arc` is never dropped out from under it. See
//! `DESIGN.md` for the full rationale.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use symbolic_common::ByteView;
use symbolic_debuginfo::Object;

use crate::error::{InitError, LoadObjectError, OnError};
use crate::image::LoadedImage;
use crate::resolve;

/// The append-only sequence of objects backing one executable's lookups: the main binary first,
/// then any debug companions resolved for it (build-id/debuglink/debugaltlink/dSYM), in the order
/// spec §4.12 step 3 searches them.
#[derive(Default)]
pub(crate) struct Chain {
    images: RwLock<Vec<Arc<LoadedImage>>>,
}

impl Chain {
    pub(crate) fn new() -> Self {
        Chain {
            images: RwLock::new(Vec::new()),
        }
    }

    fn push(&self, image: LoadedImage) -> Arc<LoadedImage> {
        let image = Arc::new(image);
        self.images.write().unwrap().push(Arc::clone(&image));
        image
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<LoadedImage>> {
        self.images.read().unwrap().clone()
    }

    /// Loads `path` as the main object for one executable/library, then resolves and appends
    /// whatever separate debug companions it points to.
    ///
    /// Returns the primary image's handle; diagnostics for companions that fail to resolve are
    /// reported-and-continued via `on_error` rather than failing the whole call, per spec §7.
    /// Failure to load the primary object itself is the one case that aborts, surfaced as
    /// [`InitError`].
    pub(crate) fn load_executable(
        &self,
        path: &Path,
        base_address: u64,
        on_error: &mut dyn OnError,
    ) -> Result<Arc<LoadedImage>, InitError> {
        let primary = self
            .load_image(path, base_address)
            .map_err(|source| InitError {
                path: path.display().to_string(),
                source,
            })?;

        if !primary.has_debug_info() {
            self.resolve_companions(path, base_address, &primary, on_error);
        }

        Ok(primary)
    }

    fn load_image(&self, path: &Path, base_address: u64) -> Result<Arc<LoadedImage>, LoadObjectError> {
        let view = ByteView::open(path).map_err(resolve::io_error)?;
        let image = LoadedImage::new(path.to_path_buf(), base_address, view)
            .map_err(|error| LoadObjectError::Parse(Box::new(error)))?;
        Ok(self.push(image))
    }

    fn load_bytes(
        &self,
        path: PathBuf,
        base_address: u64,
        view: ByteView<'static>,
    ) -> Result<Arc<LoadedImage>, LoadObjectError> {
        let image = LoadedImage::new(path, base_address, view)
            .map_err(|error| LoadObjectError::Parse(Box::new(error)))?;
        Ok(self.push(image))
    }

    /// Resolves and appends whatever separate debug file(s) `primary` points to: ELF build-id,
    /// `.gnu_debuglink`, `.gnu_debugaltlink`, or a Mach-O dSYM bundle, per spec §6.
    fn resolve_companions(
        &self,
        path: &Path,
        base_address: u64,
        primary: &LoadedImage,
        on_error: &mut dyn OnError,
    ) {
        match primary.object() {
            Object::Elf(elf) => self.resolve_elf_companions(path, base_address, elf, on_error),
            Object::MachO(_) => {
                if let Some(view) = resolve::resolve_dsym(path) {
                    let dsym_path = resolve::dsym_path(path).expect("dsym_path succeeded above");
                    let expected_uuid = primary.code_id();
                    match self.load_bytes(dsym_path.clone(), base_address, view) {
                        Ok(companion) => {
                            if expected_uuid.is_some() && companion.code_id() != expected_uuid {
                                on_error.report(
                                    &format!(
                                        "{}: dSYM UUID does not match {}'s LC_UUID",
                                        dsym_path.display(),
                                        path.display()
                                    ),
                                    -1,
                                );
                            }
                        }
                        Err(error) => {
                            on_error.report(
                                &format!("{}: failed to load dSYM companion: {error}", dsym_path.display()),
                                -1,
                            );
                        }
                    }
                }
            }
        }
    }

    fn resolve_elf_companions(
        &self,
        path: &Path,
        base_address: u64,
        elf: &symbolic_debuginfo::elf::ElfObject<'_>,
        on_error: &mut dyn OnError,
    ) {
        let debug_root = Path::new("/usr/lib/debug");
        let mut companion = None;

        if let Some(code_id) = elf.code_id() {
            if let Some(view) = resolve::resolve_by_build_id(debug_root, &code_id.to_string()) {
                companion = Some((debug_root.join(".build-id"), view));
            }
        }

        if companion.is_none() {
            match elf.debug_link() {
                Ok(Some(link)) => {
                    if let Some(view) =
                        resolve::resolve_debuglink(path, link.filename(), link.crc(), on_error)
                    {
                        companion = Some((path.to_path_buf(), view));
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    on_error.report(&format!("{}: malformed .gnu_debuglink: {error}", path.display()), -1);
                }
            }
        }

        if let Some((companion_path, view)) = companion {
            match self.load_bytes(companion_path.clone(), base_address, view) {
                Ok(companion) => {
                    if let Object::Elf(companion_elf) = companion.object() {
                        self.resolve_debugaltlink(path, base_address, companion_elf, on_error);
                    }
                }
                Err(error) => {
                    on_error.report(
                        &format!("{}: failed to load debug companion: {error}", companion_path.display()),
                        -1,
                    );
                }
            }
        } else {
            self.resolve_debugaltlink(path, base_address, elf, on_error);
        }
    }

    /// Resolves a `.gnu_debugaltlink` target, if present, and appends it to the chain.
    ///
    /// A build-id mismatch between the link and the target file is reported but not fatal: per the
    /// Open Question resolved in `DESIGN.md`, a stale or re-stripped alt file is still far more
    /// useful appended (it may still resolve most cross-references) than dropped outright.
    fn resolve_debugaltlink(
        &self,
        path: &Path,
        base_address: u64,
        elf: &symbolic_debuginfo::elf::ElfObject<'_>,
        on_error: &mut dyn OnError,
    ) {
        let Some(alt_link) = elf.debug_alt_link() else {
            return;
        };

        let Some(view) = resolve::resolve_debugaltlink(path, alt_link.filename()) else {
            on_error.report(
                &format!(
                    "{}: .gnu_debugaltlink target '{}' could not be found",
                    path.display(),
                    alt_link.filename().to_string_lossy()
                ),
                -1,
            );
            return;
        };

        let expected_build_id = format_build_id(alt_link.build_id());
        let alt_path = path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(alt_link.filename().to_string_lossy().as_ref());

        match self.load_bytes(alt_path.clone(), base_address, view) {
            Ok(companion) => {
                let matches = companion
                    .code_id()
                    .is_some_and(|id| id.to_string().eq_ignore_ascii_case(&expected_build_id));
                if !matches {
                    on_error.report(
                        &format!(
                            "{}: .gnu_debugaltlink target build-id does not match",
                            alt_path.display()
                        ),
                        -1,
                    );
                }
            }
            Err(error) => {
                on_error.report(
                    &format!("{}: failed to load .gnu_debugaltlink target: {error}", alt_path.display()),
                    -1,
                );
            }
        }
    }
}

fn format_build_id(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
