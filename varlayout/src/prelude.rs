//! Single module with almost all `varlayout` exports
//!
//! # Examples
//!
//! Import all into current scope:
//!
//! ```
//! use varlayout::prelude::*;
//! let spec = LayoutSpec::new([ElementSpec::of::<u8>()]).unwrap();
//! assert_eq!(spec.partial(&[]).unwrap().offsets(), &[0]);
//! ```

pub use crate::buf::AlignedBuf;
#[cfg(feature = "macro")]
pub use crate::define_layout;
pub use crate::descriptor::Descriptor;
pub use crate::error::{LayoutError, SpecProblem};
pub use crate::fence::{LogFence, NoFence, PaddingFence};
pub use crate::ptr::BasePtr;
pub use crate::schema::Schema;
pub use crate::spec::{ElementSpec, FieldSelector, Kind, LayoutSpec};
