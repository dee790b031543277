//! Descriptors: a [`LayoutSpec`] plus the element counts of a prefix of its fields.
//!
//! Knowing the counts of the first `k` fields fixes the start of the first
//! `k + 1` fields: field `k` starts right after field `k - 1` ends (rounded up
//! to its alignment), even though its own end is still unknown.
//!
//! ```text
//! LayoutSpec [u8, i32, f64], counts (3, 2)
//!
//! offset 0          4                   12      16
//! +-----+-----+-----+---------+---------+-------+--------------
//! | u8  | u8  | u8  |   i32   |   i32   |  pad  | f64 ... (count unknown)
//! +-----+-----+-----+---------+---------+-------+--------------
//!                 ^ pad
//! ```
//!
//! All offsets that the known counts determine are computed once, when the
//! descriptor is built, so every later query is a table lookup.

use crate::error::LayoutError;
use crate::macro_support::{cat_array, next_offset};
use crate::spec::{FieldSelector, Kind, LayoutSpec};
use alloc::vec::Vec;
use core::ops::Range;

/// The layout of one allocation: offsets of every field whose start is
/// derivable from the known counts, and the total size once all counts are
/// known.
///
/// A descriptor never owns or allocates memory. It is immutable, and may be
/// shared between threads freely.
///
/// # Examples
///
/// ```
/// use varlayout::{ElementSpec, LayoutSpec};
///
/// // u8[3], 1 byte of padding, i32[2], 4 bytes of padding, f64[4].
/// let spec = LayoutSpec::new([
///     ElementSpec::raw(1, 1),
///     ElementSpec::raw(4, 4),
///     ElementSpec::raw(8, 8),
/// ]).unwrap();
/// let layout = spec.full(&[3, 2, 4]).unwrap();
/// assert_eq!(layout.offsets(), &[0, 4, 16]);
/// assert_eq!(layout.alloc_size(), Ok(48));
/// assert_eq!(layout.alignment(), 8);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor<'s> {
    spec: &'s LayoutSpec,
    counts: Vec<usize>,
    offsets: Vec<usize>,
}

impl LayoutSpec {
    /// A descriptor that knows the counts of the first `counts.len()` fields.
    ///
    /// Any number of counts from zero up to the number of fields is accepted.
    ///
    /// # Examples
    ///
    /// ```
    /// use varlayout::{ElementSpec, LayoutSpec};
    ///
    /// // i32[3] followed by 4 bytes of padding and an unknown number of f64s.
    /// let spec = LayoutSpec::new([ElementSpec::raw(4, 4), ElementSpec::raw(8, 8)]).unwrap();
    /// let partial = spec.partial(&[3]).unwrap();
    /// assert_eq!(partial.offset(1), Ok(16));
    /// ```
    pub fn partial(&self, counts: &[usize]) -> Result<Descriptor<'_>, LayoutError> {
        Descriptor::new(self, counts)
    }

    /// A descriptor that knows the count of every field.
    ///
    /// Equivalent to [`LayoutSpec::partial`] called with exactly
    /// [`LayoutSpec::num_fields`] counts.
    pub fn full(&self, counts: &[usize]) -> Result<Descriptor<'_>, LayoutError> {
        if counts.len() < self.num_fields() {
            return Err(LayoutError::IncompleteCounts {
                known: counts.len(),
                fields: self.num_fields(),
            });
        }
        Descriptor::new(self, counts)
    }
}

impl<'s> Descriptor<'s> {
    /// Computes the offsets `counts` determines within `spec`.
    ///
    /// Count values are not validated: zero is legal, and so is any value
    /// whose offsets fit in `usize`.
    pub fn new(spec: &'s LayoutSpec, counts: &[usize]) -> Result<Self, LayoutError> {
        let fields = spec.num_fields();
        if counts.len() > fields {
            return Err(LayoutError::TooManyCounts {
                given: counts.len(),
                fields,
            });
        }
        let elements = spec.elements();
        let resolvable = fields.min(counts.len() + 1);
        let mut offsets = Vec::with_capacity(resolvable);
        offsets.push(0);
        for i in 1..resolvable {
            let prev = &elements[i - 1];
            let offset = next_offset(
                offsets[i - 1],
                prev.size(),
                counts[i - 1],
                elements[i].effective_align(),
            )
            .ok_or(LayoutError::Overflow)?;
            offsets.push(offset);
        }
        if counts.len() == fields {
            let last = fields - 1;
            cat_array(offsets[last], elements[last].size(), counts[last])
                .ok_or(LayoutError::Overflow)?;
        }
        Ok(Descriptor {
            spec,
            counts: counts.to_vec(),
            offsets,
        })
    }

    pub fn spec(&self) -> &'s LayoutSpec {
        self.spec
    }

    pub fn num_fields(&self) -> usize {
        self.spec.num_fields()
    }

    pub fn num_known_counts(&self) -> usize {
        self.counts.len()
    }

    /// `min(num_fields, num_known_counts + 1)`.
    pub fn num_resolvable_offsets(&self) -> usize {
        self.offsets.len()
    }

    /// Whether every count is known.
    pub fn is_full(&self) -> bool {
        self.counts.len() == self.spec.num_fields()
    }

    /// The alignment every base address passed to this descriptor must have.
    pub fn alignment(&self) -> usize {
        self.spec.alignment()
    }

    /// Byte offset of the selected field.
    ///
    /// # Examples
    ///
    /// ```
    /// use varlayout::{ElementSpec, LayoutError, LayoutSpec};
    ///
    /// let spec = LayoutSpec::new([
    ///     ElementSpec::of::<u16>(),
    ///     ElementSpec::of::<u8>().with_key("tail"),
    ///     ElementSpec::of::<u32>(),
    /// ]).unwrap();
    /// let partial = spec.partial(&[5]).unwrap();
    /// assert_eq!(partial.offset("tail"), Ok(10));
    /// assert_eq!(partial.offset_of::<u16>(), Ok(0));
    /// assert_eq!(
    ///     partial.offset(2),
    ///     Err(LayoutError::IndexOutOfRange { index: 2, resolvable: 2 }),
    /// );
    /// ```
    pub fn offset<S: FieldSelector>(&self, selector: S) -> Result<usize, LayoutError> {
        let index = self.spec.resolve(selector)?;
        self.offset_at(index)
    }

    /// Byte offset of the only field whose elements are `T`s.
    pub fn offset_of<T: 'static>(&self) -> Result<usize, LayoutError> {
        self.offset(Kind::of::<T>())
    }

    /// Element count of the selected field.
    pub fn size<S: FieldSelector>(&self, selector: S) -> Result<usize, LayoutError> {
        let index = self.spec.resolve(selector)?;
        self.count_at(index)
    }

    /// Element count of the only field whose elements are `T`s.
    pub fn size_of<T: 'static>(&self) -> Result<usize, LayoutError> {
        self.size(Kind::of::<T>())
    }

    /// Offsets of all resolvable fields, in field order.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Counts of all fields whose counts are known, in field order.
    pub fn sizes(&self) -> &[usize] {
        &self.counts
    }

    /// Bytes needed to hold every field. Needs all counts.
    pub fn alloc_size(&self) -> Result<usize, LayoutError> {
        if !self.is_full() {
            return Err(LayoutError::IncompleteCounts {
                known: self.counts.len(),
                fields: self.num_fields(),
            });
        }
        Ok(self.field_end(self.num_fields() - 1))
    }

    /// Byte range occupied by the elements of the selected field.
    ///
    /// # Examples
    ///
    /// ```
    /// use varlayout::{ElementSpec, LayoutSpec};
    ///
    /// let spec = LayoutSpec::new([ElementSpec::raw(1, 1), ElementSpec::raw(4, 4)]).unwrap();
    /// let layout = spec.full(&[3, 2]).unwrap();
    /// assert_eq!(layout.field_range(1), Ok(4..12));
    /// ```
    pub fn field_range<S: FieldSelector>(&self, selector: S) -> Result<Range<usize>, LayoutError> {
        let index = self.spec.resolve(selector)?;
        self.range_at(index)
    }

    /// The gaps between consecutive resolvable fields, in field order.
    /// Empty gaps are skipped.
    pub fn padding(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (1..self.offsets.len()).filter_map(move |i| {
            let end = self.field_end(i - 1);
            let start = self.offsets[i];
            if start > end {
                Some(end..start)
            } else {
                None
            }
        })
    }

    pub(crate) fn offset_at(&self, index: usize) -> Result<usize, LayoutError> {
        self.offsets
            .get(index)
            .copied()
            .ok_or(LayoutError::IndexOutOfRange {
                index,
                resolvable: self.offsets.len(),
            })
    }

    pub(crate) fn count_at(&self, index: usize) -> Result<usize, LayoutError> {
        if index >= self.offsets.len() {
            return Err(LayoutError::IndexOutOfRange {
                index,
                resolvable: self.offsets.len(),
            });
        }
        self.counts
            .get(index)
            .copied()
            .ok_or(LayoutError::CountUnknown {
                index,
                known: self.counts.len(),
            })
    }

    pub(crate) fn range_at(&self, index: usize) -> Result<Range<usize>, LayoutError> {
        self.count_at(index)?;
        Ok(self.offsets[index]..self.field_end(index))
    }

    /// End of a field with a known count. `new` has checked that this does
    /// not overflow.
    fn field_end(&self, index: usize) -> usize {
        self.offsets[index] + self.spec.elements()[index].size() * self.counts[index]
    }
}
