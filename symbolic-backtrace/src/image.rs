//! A single loaded object, plus the lazily-built lookup tables the façade queries.
//!
//! Grounded on spec §3's `Unit`/`UnitAddrs` model and §4.12's lazy per-unit initialisation, but
//! built on top of what `symbolic_debuginfo::ObjectDebugSession` already gives us: that session
//! performs its own per-compilation-unit laziness internally (`dwarf.rs`'s `LazyCell<Unit>`
//! entries). What this module adds on top is the *per-object* address index (spec's
//! `unit_addrs`/`function_addrs` flattened across all units of one object) and the one-time cost
//! of building it, guarded by a [`once_cell::sync::OnceCell`] rather than a hand-rolled
//! uninit/ok/failed tri-state: losing a race to initialise simply drops the redundant work instead
//! of leaking it, which is a deliberate tightening over the C original (see DESIGN.md).

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use symbolic_common::{ByteView, CodeId, Name, SelfCell};
use symbolic_debuginfo::{Function, Object, ObjectDebugSession, ObjectLike, SymbolMap};

use crate::error::OnError;

/// One function's address range, as placed in the per-object, address-sorted index.
///
/// Mirrors spec §3's `UnitAddrs`/function-address entries: sorted ascending by `low`, with ties
/// broken by descending `high` so that (in principle) a narrower nested entry would sort after a
/// wider enclosing one; in practice the top-level function list produced by
/// `ObjectDebugSession::functions` is already disjoint, since inlined callees live in
/// [`Function::inlinees`] rather than as separate top-level entries.
pub(crate) struct IndexedFunction {
    low: u64,
    high: u64,
    pub(crate) function: Function<'static>,
}

/// A sentinel whose `low`/`high` exceed every real address, so a binary search can always probe
/// `entry + 1` without a bounds check (spec §3 invariant).
fn sentinel() -> IndexedFunction {
    IndexedFunction {
        low: u64::MAX,
        high: u64::MAX,
        function: Function {
            address: u64::MAX,
            size: 0,
            name: Name::new(""),
            compilation_dir: b"",
            lines: Vec::new(),
            inlinees: Vec::new(),
            inline: false,
        },
    }
}

fn build_function_index(functions: Vec<Function<'static>>) -> Vec<IndexedFunction> {
    let mut entries: Vec<_> = functions
        .into_iter()
        .map(|function| IndexedFunction {
            low: function.address,
            high: function.end_address(),
            function,
        })
        .collect();

    entries.sort_by(|a, b| a.low.cmp(&b.low).then(b.high.cmp(&a.high)));
    entries.push(sentinel());
    entries
}

/// Binary-searches a function-address index for the entry covering `pc`.
///
/// Finds the last entry whose `low <= pc`, then checks that `pc` actually falls before its `high`
/// -- the half-open `[low, high)` interval from spec §3.
pub(crate) fn lookup_function(entries: &[IndexedFunction], pc: u64) -> Option<&Function<'static>> {
    let idx = entries.partition_point(|entry| entry.low <= pc);
    if idx == 0 {
        return None;
    }

    let candidate = &entries[idx - 1];
    if pc < candidate.high {
        Some(&candidate.function)
    } else {
        None
    }
}

/// One object loaded into the resolver's chain: the main binary, a separate debug companion
/// resolved via build-id/debuglink, a `.gnu_debugaltlink` target, or a dSYM bundle.
pub(crate) struct LoadedImage {
    /// Path this image was loaded from, used only for diagnostics.
    pub(crate) path: PathBuf,
    /// The address at which this image is mapped into the process, added to every relative
    /// address read out of its debug/symbol tables before it is handed to a caller.
    pub(crate) base_address: u64,
    object: SelfCell<ByteView<'static>, Object<'static>>,
    session: OnceCell<Option<ObjectDebugSession<'static>>>,
    functions: OnceCell<Vec<IndexedFunction>>,
    symbols: OnceCell<SymbolMap<'static>>,
    /// The decompressed `.gnu_debugdata` mini-debuginfo ELF, parsed lazily the first time the
    /// object's own symbol table turns out to be empty (spec §6, scenario 5).
    mini_debuginfo: OnceCell<Option<SelfCell<Vec<u8>, symbolic_debuginfo::elf::ElfObject<'static>>>>,
}

impl LoadedImage {
    pub(crate) fn new(path: PathBuf, base_address: u64, view: ByteView<'static>) -> Result<Self, symbolic_debuginfo::ObjectError> {
        let object = SelfCell::try_new(view, |data| Object::parse(unsafe { &*data }))?;

        Ok(LoadedImage {
            path,
            base_address,
            object,
            session: OnceCell::new(),
            functions: OnceCell::new(),
            symbols: OnceCell::new(),
            mini_debuginfo: OnceCell::new(),
        })
    }

    pub(crate) fn object(&self) -> &Object<'static> {
        self.object.get()
    }

    pub(crate) fn code_id(&self) -> Option<CodeId> {
        self.object().code_id()
    }

    pub(crate) fn has_debug_info(&self) -> bool {
        self.object().has_debug_info()
    }

    fn session(&self, on_error: &mut dyn OnError) -> Option<&ObjectDebugSession<'static>> {
        self.session
            .get_or_init(|| match self.object().debug_session() {
                Ok(session) => Some(session),
                Err(error) => {
                    on_error.report(
                        &format!("{}: failed to build debug session: {error}", self.path.display()),
                        -1,
                    );
                    None
                }
            })
            .as_ref()
    }

    /// Returns the address-sorted function index, building it on first use.
    ///
    /// # Safety note
    ///
    /// `ObjectDebugSession::functions` yields `Function<'_>` tied to the session's own borrow
    /// rather than to the object's underlying byte data, even though every slice the `Function`
    /// actually holds points into that (process-lifetime) byte data. Once the session is parked
    /// in `self.session` -- itself owned by an `Arc<LoadedImage>` that the chain never drops --
    /// that borrow is valid for as long as `self` is, which is `'static` in practice. We assert
    /// that by transmuting the collected `Vec<Function<'_>>` to `Vec<Function<'static>>`, the same
    /// technique `symbolic_common::SelfCell` uses internally for the analogous problem.
    pub(crate) fn function_index(&self, on_error: &mut dyn OnError) -> &[IndexedFunction] {
        self.functions.get_or_init(|| {
            let Some(session) = self.session(on_error) else {
                return Vec::new();
            };

            let functions: Vec<Function<'_>> = session
                .functions()
                .filter_map(|result| match result {
                    Ok(function) => Some(function),
                    Err(error) => {
                        on_error.report(
                            &format!("{}: malformed function entry: {error}", self.path.display()),
                            -1,
                        );
                        None
                    }
                })
                .collect();

            // SAFETY: see doc comment above.
            let functions: Vec<Function<'static>> =
                unsafe { std::mem::transmute::<Vec<Function<'_>>, Vec<Function<'static>>>(functions) };

            build_function_index(functions)
        })
    }

    /// Returns the object's symbol table, falling back to the decompressed `.gnu_debugdata`
    /// mini-debuginfo symbol table when the object's own is empty (e.g. a fully stripped binary
    /// that still carries mini-debuginfo).
    pub(crate) fn symbol_map(&self) -> &SymbolMap<'static> {
        self.symbols.get_or_init(|| {
            let primary = self.object().symbol_map();
            if !primary.is_empty() {
                return primary;
            }

            match self.mini_debuginfo_object() {
                Some(elf) => elf.symbol_map(),
                None => primary,
            }
        })
    }

    /// Decompresses and parses `.gnu_debugdata`, if present, memoizing the result.
    ///
    /// A parse failure is treated the same as "no mini-debuginfo": the caller falls back to
    /// whatever symbol table (possibly empty) the primary object already has.
    fn mini_debuginfo_object(&self) -> Option<&symbolic_debuginfo::elf::ElfObject<'static>> {
        self.mini_debuginfo
            .get_or_init(|| {
                let Object::Elf(elf) = self.object() else {
                    return None;
                };
                let bytes = elf.gnu_debugdata()?;
                SelfCell::try_new(bytes, |data| {
                    symbolic_debuginfo::elf::ElfObject::parse(unsafe { &*data })
                })
                .ok()
            })
            .as_ref()
            .map(|cell| {
                // SAFETY: same reasoning as `function_index` above -- `cell` is parked in
                // `self.mini_debuginfo`, owned by an `Arc<LoadedImage>` the chain never drops, so
                // its borrow is valid for as long as `self` is, which is `'static` in practice.
                let elf: &symbolic_debuginfo::elf::ElfObject<'_> = cell.get();
                unsafe {
                    std::mem::transmute::<
                        &symbolic_debuginfo::elf::ElfObject<'_>,
                        &symbolic_debuginfo::elf::ElfObject<'static>,
                    >(elf)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(address: u64, size: u64, name: &'static str) -> Function<'static> {
        Function {
            address,
            size,
            name: Name::new(name),
            compilation_dir: b"",
            lines: Vec::new(),
            inlinees: Vec::new(),
            inline: false,
        }
    }

    #[test]
    fn finds_entry_covering_pc() {
        let entries = build_function_index(vec![
            function(0x1000, 0x100, "first"),
            function(0x2000, 0x50, "second"),
        ]);

        assert_eq!(lookup_function(&entries, 0x1050).unwrap().name.as_str(), "first");
        assert_eq!(lookup_function(&entries, 0x2010).unwrap().name.as_str(), "second");
    }

    #[test]
    fn misses_between_and_outside_functions() {
        let entries = build_function_index(vec![
            function(0x1000, 0x100, "first"),
            function(0x2000, 0x50, "second"),
        ]);

        // Gap between the two functions.
        assert!(lookup_function(&entries, 0x1900).is_none());
        // Exactly at a function's end (half-open range) is not covered.
        assert!(lookup_function(&entries, 0x1100).is_none());
        // Before the first function and past the last.
        assert!(lookup_function(&entries, 0x500).is_none());
        assert!(lookup_function(&entries, 0x9000).is_none());
    }

    #[test]
    fn sentinel_never_matches() {
        let entries = build_function_index(vec![function(0x1000, 0x100, "only")]);
        assert!(lookup_function(&entries, u64::MAX).is_none());
    }

    #[test]
    fn sorts_wider_range_before_narrower_nested_one() {
        // Same `low`, different `high`: spec §3 wants the wider (enclosing) range first so a
        // binary search landing on either still resolves consistently.
        let entries = build_function_index(vec![
            function(0x1000, 0x10, "narrow"),
            function(0x1000, 0x100, "wide"),
        ]);
        assert_eq!(entries[0].function.name.as_str(), "wide");
        assert_eq!(entries[1].function.name.as_str(), "narrow");
    }
}
