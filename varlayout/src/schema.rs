//! Layouts whose fields are known at compile time.
//!
//! A [`Schema`] is normally generated by
//! [`#[define_layout]`][crate::define_layout]: the field list, and therefore
//! which field holds which type, is fixed by the struct definition. Only the
//! counts of array fields are supplied at runtime.

use crate::error::LayoutError;
use crate::spec::{ElementSpec, LayoutSpec};
use alloc::vec::Vec;

/// A fixed list of fields.
///
/// # Examples
///
/// Implementing by hand:
///
/// ```
/// use varlayout::{ElementSpec, Schema};
///
/// enum Pascal {}
///
/// impl Schema for Pascal {
///     const NUM_FIELDS: usize = 2;
///     const ALIGN: usize = core::mem::align_of::<u32>();
///     fn elements() -> Vec<ElementSpec> {
///         vec![
///             ElementSpec::of::<u32>().with_key("len"),
///             ElementSpec::of::<u8>().with_key("chars"),
///         ]
///     }
/// }
///
/// let spec = Pascal::spec().unwrap();
/// let layout = spec.full(&[1, 5]).unwrap();
/// assert_eq!(layout.offset("chars"), Ok(4));
/// assert_eq!(layout.alloc_size(), Ok(9));
/// ```
pub trait Schema {
    /// Number of fields.
    const NUM_FIELDS: usize;
    /// Alignment of every layout of this schema.
    const ALIGN: usize;

    /// The fields, in order.
    fn elements() -> Vec<ElementSpec>;

    /// Builds and validates the runtime spec.
    fn spec() -> Result<LayoutSpec, LayoutError> {
        LayoutSpec::new(Self::elements())
    }
}
