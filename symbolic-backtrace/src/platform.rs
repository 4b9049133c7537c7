//! Enumerating the objects mapped into the current process.
//!
//! Grounded on the `native_libraries()` functions of `examples/other_examples`'s backtrace-rs
//! ports: `dl_iterate_phdr` on Linux, the `_dyld_*` family on macOS. Unlike those, we don't need
//! the per-segment layout -- only a path and a base address, since the object itself is reopened
//! from disk and its own `load_address()` is subtracted back out when matching an absolute PC.

use std::path::PathBuf;

/// One object mapped into the current process: its on-disk path and the address its first
/// segment is loaded at.
#[derive(Debug, Clone)]
pub struct MappedImage {
    pub path: PathBuf,
    pub base_address: u64,
}

/// Enumerates the objects currently mapped into this process, including the main executable.
///
/// This is the platform seam [`crate::Backtrace::init`] uses by default; tests and embedders that
/// want to symbolicate a foreign process' addresses should use
/// [`crate::Backtrace::from_images`](crate::Backtrace::from_images) instead.
pub fn enumerate_mapped_images() -> Vec<MappedImage> {
    imp::enumerate()
}

#[cfg(target_os = "linux")]
mod imp {
    use super::MappedImage;
    use std::ffi::CStr;
    use std::os::raw::{c_int, c_void};
    use std::path::PathBuf;

    pub(super) fn enumerate() -> Vec<MappedImage> {
        let mut images = Vec::new();
        unsafe {
            libc::dl_iterate_phdr(Some(callback), &mut images as *mut _ as *mut c_void);
        }
        images
    }

    unsafe extern "C" fn callback(
        info: *mut libc::dl_phdr_info,
        _size: libc::size_t,
        data: *mut c_void,
    ) -> c_int {
        let images = &mut *(data as *mut Vec<MappedImage>);

        let name = if (*info).dlpi_name.is_null() || *(*info).dlpi_name == 0 {
            // The main executable is reported with an empty name.
            match std::env::current_exe() {
                Ok(path) => path,
                Err(_) => return 0,
            }
        } else {
            PathBuf::from(CStr::from_ptr((*info).dlpi_name).to_string_lossy().into_owned())
        };

        images.push(MappedImage {
            path: name,
            base_address: (*info).dlpi_addr as u64,
        });

        0
    }
}

#[cfg(target_os = "macos")]
mod imp {
    use super::MappedImage;
    use std::ffi::CStr;
    use std::path::PathBuf;

    pub(super) fn enumerate() -> Vec<MappedImage> {
        let mut images = Vec::new();
        unsafe {
            let count = libc::_dyld_image_count();
            for index in 0..count {
                let name = libc::_dyld_get_image_name(index);
                if name.is_null() {
                    continue;
                }

                let path = PathBuf::from(CStr::from_ptr(name).to_string_lossy().into_owned());
                let base_address = libc::_dyld_get_image_vmaddr_slide(index) as u64;
                images.push(MappedImage { path, base_address });
            }
        }
        images
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod imp {
    use super::MappedImage;

    pub(super) fn enumerate() -> Vec<MappedImage> {
        Vec::new()
    }
}
