//! Errors reported by layout specs and descriptors.
//!
//! Every error is a deterministic consequence of the caller's arguments:
//! retrying the same call reproduces the same error.

use alloc::string::String;
use thiserror::Error;

/// Why a [`LayoutSpec`][crate::LayoutSpec] could not be built.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecProblem {
    /// A layout needs at least one field.
    #[error("a layout needs at least one field")]
    Empty,

    /// The effective alignment of a field is not a power of two.
    #[error("alignment {align} of field {index} is not a power of two")]
    NotPowerOfTwo {
        /// Index of the offending field.
        index: usize,
        /// The rejected alignment.
        align: usize,
    },

    /// An alignment override is weaker than the element's own alignment.
    #[error("field {index} asks for alignment {requested}, below its natural alignment {natural}")]
    OverrideBelowNatural {
        /// Index of the offending field.
        index: usize,
        /// Alignment the element type requires.
        natural: usize,
        /// Alignment the caller asked for.
        requested: usize,
    },

    /// Two fields carry the same key.
    #[error("key `{key}` names fields {first} and {second}")]
    DuplicateKey {
        /// The repeated key.
        key: &'static str,
        /// Index of the first field with this key.
        first: usize,
        /// Index of the second field with this key.
        second: usize,
    },
}

/// The error type of this crate.
///
/// # Error Categories
///
/// ## Construction
/// - [`LayoutError::InvalidSpec`] - the field list itself is unusable
/// - [`LayoutError::TooManyCounts`] - more counts than fields
/// - [`LayoutError::Overflow`] - the known prefix does not fit in the address space
///
/// ## Queries
/// - [`LayoutError::IndexOutOfRange`], [`LayoutError::KindNotFound`], [`LayoutError::AmbiguousKind`]
/// - [`LayoutError::CountUnknown`], [`LayoutError::IncompleteCounts`]
///
/// ## Addressing a buffer
/// - [`LayoutError::MisalignedBase`], [`LayoutError::BufferTooSmall`], [`LayoutError::ElementMismatch`]
///
/// # Examples
///
/// ```
/// use varlayout::{ElementSpec, LayoutError, LayoutSpec};
///
/// let spec = LayoutSpec::new([ElementSpec::of::<u8>(), ElementSpec::of::<u32>()]).unwrap();
/// let partial = spec.partial(&[3]).unwrap();
/// assert_eq!(partial.offset(1), Ok(4));
/// assert_eq!(
///     partial.alloc_size(),
///     Err(LayoutError::IncompleteCounts { known: 1, fields: 2 }),
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The field list was rejected at construction.
    #[error("invalid layout spec: {0}")]
    InvalidSpec(#[from] SpecProblem),

    /// More counts were supplied than the spec has fields.
    #[error("{given} counts supplied for a layout of {fields} fields")]
    TooManyCounts {
        /// Number of counts supplied.
        given: usize,
        /// Number of fields in the spec.
        fields: usize,
    },

    /// The requested field's offset cannot be derived from the known counts.
    #[error("field {index} is out of range, only {resolvable} offsets are resolvable")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of fields whose offsets are known.
        resolvable: usize,
    },

    /// No field matches the requested type or key.
    #[error("no field matches {0}")]
    KindNotFound(String),

    /// More than one field matches the requested type.
    #[error("more than one field matches {0}")]
    AmbiguousKind(String),

    /// The requested field's element count was not supplied.
    #[error("count of field {index} is unknown, only {known} counts are known")]
    CountUnknown {
        /// The requested index.
        index: usize,
        /// Number of known counts.
        known: usize,
    },

    /// The total size needs every count.
    #[error("allocation size needs all {fields} counts, only {known} are known")]
    IncompleteCounts {
        /// Number of known counts.
        known: usize,
        /// Number of fields in the spec.
        fields: usize,
    },

    /// The base address does not satisfy the layout's alignment.
    #[error("base address {addr:#x} is not aligned to {align}")]
    MisalignedBase {
        /// The rejected address.
        addr: usize,
        /// The layout's alignment.
        align: usize,
    },

    /// A buffer ends before the bytes a view needs.
    #[error("buffer of {len} bytes is too small, {required} bytes are needed")]
    BufferTooSmall {
        /// Length of the supplied buffer.
        len: usize,
        /// Bytes the request needs.
        required: usize,
    },

    /// The requested element type does not describe the field.
    #[error("`{requested}` does not match the element type of field {index}")]
    ElementMismatch {
        /// The field index.
        index: usize,
        /// Name of the requested type.
        requested: &'static str,
    },

    /// A scalar view was requested for a field that does not hold one element.
    #[error("field {index} holds {count} elements, not one")]
    NotScalar {
        /// The field index.
        index: usize,
        /// The field's element count.
        count: usize,
    },

    /// A descriptor was built from a different spec than the schema expects.
    #[error("field {index} of the descriptor's spec differs from the schema")]
    SchemaMismatch {
        /// First differing field.
        index: usize,
    },

    /// Offset or size arithmetic overflowed `usize`.
    #[error("layout size overflows usize")]
    Overflow,
}
