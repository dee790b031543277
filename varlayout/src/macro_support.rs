//! Offset arithmetic shared by [`crate::Descriptor`] and by the code that
//! `#[define_layout]` generates.
//!
//! Everything here is `const fn` where the compiler allows it, so generated
//! schemas can evaluate alignments and validity checks at compile time.

use crate::error::LayoutError;
use crate::schema::Schema;
use crate::spec::LayoutSpec;
use crate::Descriptor;
pub use alloc::vec::Vec;
use bytemuck::Pod;

/// Rounds `size` up to the next multiple of `align`, or `None` on overflow.
///
/// `align` must be a power of two.
#[inline(always)]
pub const fn round_up(size: usize, align: usize) -> Option<usize> {
    let size_up = match size.checked_add(align - 1) {
        Some(size_up) => size_up,
        None => return None,
    };
    Some(size_up & (0usize.wrapping_sub(align)))
}

/// End of an array of `count` elements of `elem_size` bytes starting at `offset`.
#[inline(always)]
pub const fn cat_array(offset: usize, elem_size: usize, count: usize) -> Option<usize> {
    let array_size = match elem_size.checked_mul(count) {
        Some(x) => x,
        None => return None,
    };
    offset.checked_add(array_size)
}

/// Start of the field following an array, given the following field's alignment.
#[inline(always)]
pub const fn next_offset(
    offset: usize,
    elem_size: usize,
    count: usize,
    next_align: usize,
) -> Option<usize> {
    match cat_array(offset, elem_size, count) {
        Some(end) => round_up(end, next_align),
        None => None,
    }
}

#[inline(always)]
pub const fn array_max(arr: &[usize]) -> usize {
    let mut i = 0;
    let mut r = 1;
    while i < arr.len() {
        let v = arr[i];
        r = if r > v { r } else { v };
        i += 1;
    }
    r
}

/// Whether `requested` may override the alignment `natural` of some element.
#[inline(always)]
pub const fn is_valid_override(natural: usize, requested: usize) -> bool {
    requested.is_power_of_two() && requested >= natural
}

/// Fails to compile unless `T` may be viewed from arbitrary bytes.
#[inline(always)]
pub const fn assert_pod<T: Pod>() {}

/// Checks that `spec` lists the fields of schema `S`.
pub fn check_spec<S: Schema>(spec: &LayoutSpec) -> Result<(), LayoutError> {
    let expected = S::elements();
    let actual = spec.elements();
    if expected.len() != actual.len() {
        return Err(LayoutError::SchemaMismatch {
            index: expected.len().min(actual.len()),
        });
    }
    match expected.iter().zip(actual).position(|(e, a)| e != a) {
        Some(index) => Err(LayoutError::SchemaMismatch { index }),
        None => Ok(()),
    }
}

/// Checks that `layout` is a full layout of schema `S`.
pub fn check_schema<S: Schema>(layout: &Descriptor<'_>) -> Result<(), LayoutError> {
    check_spec::<S>(layout.spec())?;
    if !layout.is_full() {
        return Err(LayoutError::IncompleteCounts {
            known: layout.num_known_counts(),
            fields: layout.num_fields(),
        });
    }
    Ok(())
}

#[inline]
pub fn ref_array<'b, T: Pod>(
    layout: &Descriptor<'_>,
    index: usize,
    buf: &'b [u8],
) -> Result<&'b [T], LayoutError> {
    layout.slice::<T>(index, buf)
}

#[inline]
pub fn ref_scalar<'b, T: Pod>(
    layout: &Descriptor<'_>,
    index: usize,
    buf: &'b [u8],
) -> Result<&'b T, LayoutError> {
    match layout.slice::<T>(index, buf)? {
        [x] => Ok(x),
        other => Err(LayoutError::NotScalar {
            index,
            count: other.len(),
        }),
    }
}

/// Splits `buf` into one mutable byte range per field of a fully known layout.
#[inline]
pub fn split_fields<'b>(
    layout: &Descriptor<'_>,
    buf: &'b mut [u8],
) -> Result<alloc::vec::IntoIter<&'b mut [u8]>, LayoutError> {
    let fields: Vec<&'b mut [u8]> = layout.slices_mut(buf)?;
    Ok(fields.into_iter())
}

#[inline]
pub fn mut_array<'b, T: Pod>(
    layout: &Descriptor<'_>,
    index: usize,
    bytes: Option<&'b mut [u8]>,
) -> Result<&'b mut [T], LayoutError> {
    let bytes = bytes.ok_or(LayoutError::CountUnknown {
        index,
        known: layout.num_known_counts(),
    })?;
    crate::ptr::cast_field_mut::<T>(layout, index, bytes)
}

#[inline]
pub fn mut_scalar<'b, T: Pod>(
    layout: &Descriptor<'_>,
    index: usize,
    bytes: Option<&'b mut [u8]>,
) -> Result<&'b mut T, LayoutError> {
    let array = mut_array::<T>(layout, index, bytes)?;
    if array.len() != 1 {
        return Err(LayoutError::NotScalar {
            index,
            count: array.len(),
        });
    }
    Ok(&mut array[0])
}
