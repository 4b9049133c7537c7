//! Locating separate debug files for an already-loaded object.
//!
//! This mirrors the ELF debug-link / build-id resolution order and the Mach-O dSYM bundle
//! convention from spec §6, grounded on the `DebugLink`/`DebugAltLink` readers in
//! `symbolic_debuginfo::elf` (themselves resolved, never the section parsers: path construction
//! and filesystem probing live here, one layer up).

use std::ffi::CStr;
use std::path::{Path, PathBuf};

use symbolic_common::ByteView;

use crate::error::{LoadObjectError, OnError};

const SYSTEM_DEBUG_ROOT: &str = "/usr/lib/debug";

/// Splits a build-id's hex representation into the `.build-id/XX/YYYY…YY` components.
///
/// `hex` is expected to be the lowercase hex rendering of the build-id, as produced by
/// [`symbolic_common::CodeId`]'s `Display` impl.
fn build_id_path(debug_root: &Path, hex: &str) -> Option<PathBuf> {
    if hex.len() < 3 {
        return None;
    }
    let (prefix, rest) = hex.split_at(2);
    let mut path = debug_root.join(".build-id").join(prefix);
    path.push(format!("{rest}.debug"));
    Some(path)
}

/// Joins a (possibly absolute) directory onto `root`, the way `/usr/lib/debug/<dirname(exe)>`
/// is built: an absolute `dir` is treated as relative to `root`, not as replacing it.
fn join_under_root(root: &Path, dir: &Path) -> PathBuf {
    let relative = dir.strip_prefix("/").unwrap_or(dir);
    root.join(relative)
}

/// Build-id resolution: `/usr/lib/debug/.build-id/XX/YYYY….debug`.
pub(crate) fn resolve_by_build_id(
    debug_root: &Path,
    build_id_hex: &str,
) -> Option<ByteView<'static>> {
    let path = build_id_path(debug_root, build_id_hex)?;
    ByteView::open(&path).ok()
}

/// The three search paths gdb tries for a `.gnu_debuglink`, in order, per spec §6.
pub(crate) fn debuglink_candidates(exe_path: &Path, link_name: &CStr) -> Vec<PathBuf> {
    let link_name = link_name.to_string_lossy();
    let dir = exe_path.parent().unwrap_or_else(|| Path::new(""));

    vec![
        dir.join(link_name.as_ref()),
        dir.join(".debug").join(link_name.as_ref()),
        join_under_root(Path::new(SYSTEM_DEBUG_ROOT), dir).join(link_name.as_ref()),
    ]
}

/// Opens the first candidate that exists and, if `expected_crc` is given, matches its CRC32.
///
/// A CRC mismatch is reported-and-continued (spec §7): the file is still used, since a stale CRC
/// is far more likely than a genuinely unrelated file of the same name turning up on the search
/// path.
pub(crate) fn resolve_debuglink(
    exe_path: &Path,
    link_name: &CStr,
    expected_crc: u32,
    on_error: &mut dyn OnError,
) -> Option<ByteView<'static>> {
    for candidate in debuglink_candidates(exe_path, link_name) {
        let Ok(view) = ByteView::open(&candidate) else {
            continue;
        };

        let actual_crc = crc32fast::hash(&view);
        if actual_crc != expected_crc {
            on_error.report(
                &format!(
                    "debug link '{}' has CRC {:#x}, expected {:#x}",
                    candidate.display(),
                    actual_crc,
                    expected_crc
                ),
                -1,
            );
        }

        return Some(view);
    }

    None
}

/// Resolves a `.gnu_debugaltlink` target relative to the binary's own directory.
///
/// The caller is expected to compare the returned file's own build-id against
/// [`symbolic_debuginfo::elf::DebugAltLink::build_id`] and report (but not reject) a mismatch, per
/// the Open Question in spec §9 resolved in DESIGN.md.
pub(crate) fn resolve_debugaltlink(exe_path: &Path, filename: &CStr) -> Option<ByteView<'static>> {
    let filename = filename.to_string_lossy();
    let path = Path::new(filename.as_ref());

    let candidate = if path.is_absolute() {
        path.to_path_buf()
    } else {
        exe_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(path)
    };

    ByteView::open(&candidate).ok()
}

/// Builds the dSYM bundle path for a Mach-O executable: `<exe>.dSYM/Contents/Resources/DWARF/<basename(exe)>`.
pub(crate) fn dsym_path(exe_path: &Path) -> Option<PathBuf> {
    let file_name = exe_path.file_name()?;
    let mut dsym = exe_path.as_os_str().to_owned();
    dsym.push(".dSYM");

    let mut path = PathBuf::from(dsym);
    path.push("Contents/Resources/DWARF");
    path.push(file_name);
    Some(path)
}

pub(crate) fn resolve_dsym(exe_path: &Path) -> Option<ByteView<'static>> {
    let path = dsym_path(exe_path)?;
    ByteView::open(&path).ok()
}

/// Wraps an `io::Error`/parse error from opening a supplementary file for the [`LoadObjectError`]
/// severity used when the *primary* object fails to load (not when a supplementary lookup simply
/// comes up empty, which is not an error at all).
pub(crate) fn io_error(err: std::io::Error) -> LoadObjectError {
    LoadObjectError::Io(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_id_path_splits_first_byte() {
        let path = build_id_path(Path::new("/usr/lib/debug"), "abcdef0123").unwrap();
        assert_eq!(
            path,
            Path::new("/usr/lib/debug/.build-id/ab/cdef0123.debug")
        );
    }

    #[test]
    fn build_id_path_rejects_short_hex() {
        assert!(build_id_path(Path::new("/usr/lib/debug"), "a").is_none());
    }

    #[test]
    fn debuglink_candidates_try_three_locations() {
        let exe = Path::new("/home/user/bin/app");
        let name = CStr::from_bytes_with_nul(b"app.debug\0").unwrap();
        let candidates = debuglink_candidates(exe, name);

        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/home/user/bin/app.debug"),
                PathBuf::from("/home/user/bin/.debug/app.debug"),
                PathBuf::from("/usr/lib/debug/home/user/bin/app.debug"),
            ]
        );
    }

    #[test]
    fn dsym_path_follows_apple_convention() {
        let path = dsym_path(Path::new("/Users/me/build/App")).unwrap();
        assert_eq!(
            path,
            Path::new("/Users/me/build/App.dSYM/Contents/Resources/DWARF/App")
        );
    }
}
