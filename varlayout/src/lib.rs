//! # `varlayout`
//! Address arithmetic for one allocation that holds several variable-length arrays.
//!
//! 1. [Summary](#summary)
//! 1. [Motivation](#motivation)
//! 1. [Examples](#examples)
//! 1. [Overview of types](#overview-of-types)
//! 1. [Feature flags](#feature-flags)
//!
//! # Summary
//!
//! A [`LayoutSpec`] is an ordered list of fields. Each field is an array of
//! elements of one type, whose count is only known at runtime. A
//! [`Descriptor`] combines a spec with the counts and answers, for a buffer
//! it does not own: where does each field start, how big is the whole thing,
//! and how strictly must it be aligned.
//!
//! Fields are laid out in declaration order, each starting at the first
//! offset after its predecessor that satisfies its alignment. The buffer's
//! alignment is the strictest alignment of any field.
//!
//! # Motivation
//!
//! A message header followed by a variable number of payload entries is
//! usually stored as two allocations, or packed by hand with error-prone
//! offset arithmetic. Storing them in one allocation:
//!
//! ```text
//! LayoutSpec [u32 "len", f32 "xs", f32 "ys"], counts (1, 3, 3)
//!
//! 0         4                             16                            28
//! +---------+---------+---------+---------+---------+---------+---------+
//! | len: 3  |  xs[0]  |  xs[1]  |  xs[2]  |  ys[0]  |  ys[1]  |  ys[2]  |
//! +---------+---------+---------+---------+---------+---------+---------+
//! ```
//!
//! A reader that receives such a buffer does not know the array counts up
//! front. It builds a *partial* descriptor from the counts it does know (here,
//! just that there is one `len`), which is enough to locate the next field.
//! Once it has read `len` it builds the full descriptor.
//!
//! # Examples
//!
//! ```
//! use varlayout::{AlignedBuf, ElementSpec, LayoutSpec};
//!
//! let spec = LayoutSpec::new([
//!     ElementSpec::of::<u32>().with_key("len"),
//!     ElementSpec::of::<f32>().with_key("xs"),
//!     ElementSpec::of::<f32>().with_key("ys"),
//! ]).unwrap();
//!
//! // The writer knows every count.
//! let layout = spec.full(&[1, 3, 3]).unwrap();
//! assert_eq!(layout.alloc_size(), Ok(28));
//! let mut buf = AlignedBuf::for_layout(&layout).unwrap();
//! layout.slice_mut::<u32>("len", &mut buf).unwrap()[0] = 3;
//! layout.slice_mut::<f32>("xs", &mut buf).unwrap().copy_from_slice(&[1.0, 2.0, 3.0]);
//!
//! // The reader first reads the header through a partial descriptor...
//! let header = spec.partial(&[1]).unwrap();
//! let n = header.slice::<u32>("len", &buf).unwrap()[0] as usize;
//!
//! // ...then everything else.
//! let layout = spec.full(&[1, n, n]).unwrap();
//! assert_eq!(layout.slice::<f32>("xs", &buf).unwrap(), &[1.0, 2.0, 3.0]);
//! assert_eq!(layout.offset("ys"), Ok(16));
//! ```
//!
//! With the `macro` feature, the field list can be fixed at compile time and
//! accessed through typed views:
//!
//! ```
//! # #[cfg(feature = "macro")]
//! # mod using_macro {
//! use varlayout::{define_layout, AlignedBuf, Schema};
//!
//! #[define_layout]
//! pub struct Points {
//!     len: u32,
//!     xs: [f32],
//!     ys: [f32],
//! }
//!
//! # pub fn example() {
//! let spec = Points::spec().unwrap();
//! let layout = points::Counts { xs: 2, ys: 2 }.descriptor(&spec).unwrap();
//! let mut buf = AlignedBuf::for_layout(&layout).unwrap();
//! let muts = Points::muts(&layout, &mut buf).unwrap();
//! *muts.len = 2;
//! muts.xs.copy_from_slice(&[0.5, 1.5]);
//!
//! let n = *Points::read_header(&spec, &buf).unwrap().len as usize;
//! let layout = points::Counts { xs: n, ys: n }.descriptor(&spec).unwrap();
//! assert_eq!(Points::refs(&layout, &buf).unwrap().xs, &[0.5, 1.5]);
//! # }
//! # }
//! # fn main() {
//! #   #[cfg(feature = "macro")]
//! #   using_macro::example();
//! # }
//! ```
//!
//! # Overview of types
//!
//! | Type                                | Role                                                                 |
//! |-------------------------------------|----------------------------------------------------------------------|
//! | [`ElementSpec`]                     | Size, alignment, optional type identity and key of one field         |
//! | [`LayoutSpec`]                      | Validated, immutable list of fields; shared by every descriptor      |
//! | [`Descriptor`]                      | A spec plus a prefix of counts: offsets, sizes, total size           |
//! | [`FieldSelector`]                   | Names a field by index, by [`Kind`], or by key                       |
//! | [`BasePtr`]                         | `*const u8` or `*mut u8`; field pointers keep its mutability         |
//! | [`PaddingFence`]                    | Receives the padding regions of a buffer                             |
//! | [`AlignedBuf`]                      | Zeroed heap bytes with the alignment a descriptor asks for           |
//! | [`Schema`]                          | A field list fixed at compile time, usually generated by a macro     |
//! | [`LayoutError`]                     | Every failure the above can report                                   |
//!
//! # Feature flags
//!
//! The following feature flags exist, which can turn on some dependencies.
//!
//! * `bumpalo`. Enables [`arena::for_layout`], for allocating a buffer in a `bumpalo::Bump` arena. Adds a dependency on `bumpalo`.
//! * `macro`. Enables procedural macro support, for defining layouts using [`#[define_layout]`][crate::define_layout]. Adds a dependency on `varlayout_macro`, `syn` and `quote`.
//!

#![no_std]
extern crate alloc;

#[cfg(feature = "bumpalo")]
pub mod arena;
pub mod buf;
mod debug;
pub mod descriptor;
pub mod error;
pub mod fence;
#[doc(hidden)]
pub mod macro_support;
pub mod prelude;
pub mod ptr;
pub mod schema;
pub mod spec;

pub use buf::AlignedBuf;
pub use descriptor::Descriptor;
pub use error::{LayoutError, SpecProblem};
pub use fence::{LogFence, NoFence, PaddingFence};
pub use ptr::BasePtr;
pub use schema::Schema;
pub use spec::{ElementSpec, FieldSelector, Kind, LayoutSpec};
#[cfg(feature = "macro")]
pub use varlayout_macro::define_layout;
