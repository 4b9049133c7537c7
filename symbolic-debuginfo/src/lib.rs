//! Abstractions for dealing with object files and debug information.
//!
//! This module defines the [`Object`] type, which is an abstraction over the ELF and Mach-O
//! object file formats used on POSIX platforms. Also, since executables on macOS might contain
//! multiple object files (called a _"Fat MachO"_), there is an [`Archive`] type, that provides a
//! uniform interface with access to an objects iterator on both platforms.
//!
//! Most processing of object files will happen on the `Object` type or its concrete
//! implementation for one platform. To allow abstraction over this, there is the [`ObjectLike`]
//! trait. It defines common attributes and gives access to a [`DebugSession`], which can be used
//! to perform more stateful handling of debug information.
//!
//! See [`Object`] for the full API, or use one of the modules for direct access to the
//! platform-dependent data.
//!
//! # Background
//!
//! The functionality of `symbolic::debuginfo` is conceptionally similar to the [`object`] crate.
//! However, there are key differences that warranted a separate implementation:
//!
//!  - `object` contains far more generic access to the data within objects at the cost of
//!    performance. `symbolic` tries to optimize for debugging scenarios at the cost of generic
//!    usage.
//!  - `symbolic` contains an abstraction for multi-object files ([`Archive`]), which is not easily
//!    possible in `object` due to the use of lifetimes on the `object::Object` trait.
//!
//! [`Object`]: enum.Object.html
//! [`Archive`]: enum.Archive.html
//! [`ObjectLike`]: trait.ObjectLike.html
//! [`DebugSession`]: trait.DebugSession.html
//! [`object`]: https://docs.rs/object

#![warn(missing_docs)]

mod base;
#[cfg(all(feature = "dwarf", feature = "elf", feature = "macho"))]
mod object;

#[cfg(feature = "dwarf")]
pub mod dwarf;
#[cfg(feature = "elf")]
pub mod elf;
#[cfg(feature = "dwarf")]
pub mod function_builder;
#[cfg(feature = "macho")]
pub mod macho;

pub use crate::base::*;
#[cfg(all(feature = "dwarf", feature = "elf", feature = "macho"))]
pub use crate::object::*;
