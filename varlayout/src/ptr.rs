//! Typed pointers and bounded slices into a caller-supplied buffer.
//!
//! Raw pointers come out with the mutability of the base pointer that went
//! in: a `*const u8` base yields `*const T` fields, a `*mut u8` base yields
//! `*mut T` fields. Computing a pointer is safe; dereferencing it is the
//! caller's business.
//!
//! The slice accessors are safe: they check alignment and bounds of the
//! buffer and only hand out element types for which every bit pattern is a
//! valid value ([`bytemuck::Pod`]).
//!
//! # Examples
//!
//! ```
//! use varlayout::{AlignedBuf, ElementSpec, LayoutSpec};
//!
//! // i32[3], 4 bytes of padding, f64[4].
//! let spec = LayoutSpec::new([ElementSpec::of::<i32>(), ElementSpec::of::<f64>()]).unwrap();
//! let layout = spec.full(&[3, 4]).unwrap();
//! let mut buf = AlignedBuf::for_layout(&layout).unwrap();
//!
//! layout.slice_mut_of::<i32>(&mut buf).unwrap().copy_from_slice(&[1, 2, 3]);
//! layout.slice_mut_of::<f64>(&mut buf).unwrap()[3] = 0.5;
//!
//! assert_eq!(layout.slice_of::<i32>(&buf).unwrap(), &[1, 2, 3]);
//! assert_eq!(layout.slice_of::<f64>(&buf).unwrap(), &[0.0, 0.0, 0.0, 0.5]);
//!
//! let doubles: *const f64 = layout.pointer_of::<f64, _>(buf.as_ptr()).unwrap();
//! assert_eq!(unsafe { *doubles.add(3) }, 0.5);
//! ```

use crate::descriptor::Descriptor;
use crate::error::LayoutError;
use crate::spec::{FieldSelector, Kind, LayoutSpec};
use alloc::vec::Vec;
use bytemuck::{Pod, Zeroable};
use core::mem;

/// A base address that field pointers are computed from.
///
/// Implemented for `*const u8` and `*mut u8`; the field pointer type keeps
/// the constness of the base.
pub trait BasePtr: Copy + private::Sealed {
    /// Pointer to a `T` with the same mutability as `Self`.
    type Cast<T>: Copy;

    /// The numeric address.
    fn addr(self) -> usize;

    /// `self + offset` bytes, reinterpreted as a pointer to `T`.
    fn byte_add_cast<T>(self, offset: usize) -> Self::Cast<T>;
}

impl BasePtr for *const u8 {
    type Cast<T> = *const T;

    #[inline(always)]
    fn addr(self) -> usize {
        self as usize
    }

    #[inline(always)]
    fn byte_add_cast<T>(self, offset: usize) -> *const T {
        self.wrapping_add(offset) as *const T
    }
}

impl BasePtr for *mut u8 {
    type Cast<T> = *mut T;

    #[inline(always)]
    fn addr(self) -> usize {
        self as usize
    }

    #[inline(always)]
    fn byte_add_cast<T>(self, offset: usize) -> *mut T {
        self.wrapping_add(offset) as *mut T
    }
}

mod private {
    pub trait Sealed {}

    impl Sealed for *const u8 {}
    impl Sealed for *mut u8 {}
}

impl<'s> Descriptor<'s> {
    /// Pointer to the first element of the selected field.
    ///
    /// Fails with [`LayoutError::MisalignedBase`] unless `base` is aligned to
    /// [`Descriptor::alignment`], and with [`LayoutError::ElementMismatch`]
    /// unless the field holds `T`s.
    pub fn pointer<T: 'static, P: BasePtr>(
        &self,
        selector: impl FieldSelector,
        base: P,
    ) -> Result<P::Cast<T>, LayoutError> {
        let index = self.spec().resolve(selector)?;
        check_element::<T>(self.spec(), index)?;
        self.check_base(base.addr())?;
        let offset = self.offset_at(index)?;
        Ok(base.byte_add_cast(offset))
    }

    /// Pointer to the first element of the only field of `T`s.
    pub fn pointer_of<T: 'static, P: BasePtr>(&self, base: P) -> Result<P::Cast<T>, LayoutError> {
        self.pointer::<T, P>(Kind::of::<T>(), base)
    }

    /// Byte pointers to every resolvable field, in field order.
    pub fn pointers<P: BasePtr>(&self, base: P) -> Result<Vec<P::Cast<u8>>, LayoutError> {
        self.check_base(base.addr())?;
        Ok(self
            .offsets()
            .iter()
            .map(|&offset| base.byte_add_cast::<u8>(offset))
            .collect())
    }

    /// The elements of the selected field, viewed inside `buf`.
    ///
    /// `buf` must start at an address aligned to [`Descriptor::alignment`]
    /// and be long enough to hold the field.
    pub fn slice<'b, T: Pod>(
        &self,
        selector: impl FieldSelector,
        buf: &'b [u8],
    ) -> Result<&'b [T], LayoutError> {
        let index = self.spec().resolve(selector)?;
        check_element::<T>(self.spec(), index)?;
        let range = self.range_at(index)?;
        self.check_buf(buf.as_ptr() as usize, buf.len(), range.end)?;
        cast_field::<T>(self, index, &buf[range])
    }

    /// Mutable view of the elements of the selected field inside `buf`.
    pub fn slice_mut<'b, T: Pod>(
        &self,
        selector: impl FieldSelector,
        buf: &'b mut [u8],
    ) -> Result<&'b mut [T], LayoutError> {
        let index = self.spec().resolve(selector)?;
        let range = self.range_at(index)?;
        self.check_buf(buf.as_ptr() as usize, buf.len(), range.end)?;
        cast_field_mut::<T>(self, index, &mut buf[range])
    }

    /// View of the only field of `T`s.
    pub fn slice_of<'b, T: Pod>(&self, buf: &'b [u8]) -> Result<&'b [T], LayoutError> {
        self.slice::<T>(Kind::of::<T>(), buf)
    }

    /// Mutable view of the only field of `T`s.
    pub fn slice_mut_of<'b, T: Pod>(&self, buf: &'b mut [u8]) -> Result<&'b mut [T], LayoutError> {
        self.slice_mut::<T>(Kind::of::<T>(), buf)
    }

    /// The bytes of every field with a known count, in field order.
    pub fn slices<'b>(&self, buf: &'b [u8]) -> Result<Vec<&'b [u8]>, LayoutError> {
        self.check_buf(buf.as_ptr() as usize, buf.len(), self.known_end())?;
        (0..self.num_known_counts())
            .map(|index| Ok(&buf[self.range_at(index)?]))
            .collect()
    }

    /// The bytes of every field with a known count, as disjoint mutable
    /// slices. Distinct fields may be handed to distinct threads.
    ///
    /// # Examples
    ///
    /// ```
    /// use varlayout::{AlignedBuf, ElementSpec, LayoutSpec};
    ///
    /// let spec = LayoutSpec::new([ElementSpec::of::<u8>(), ElementSpec::of::<u32>()]).unwrap();
    /// let layout = spec.full(&[3, 2]).unwrap();
    /// let mut buf = AlignedBuf::for_layout(&layout).unwrap();
    /// let mut fields = layout.slices_mut(&mut buf).unwrap();
    /// assert_eq!(fields.len(), 2);
    /// assert_eq!(fields[0].len(), 3);
    /// assert_eq!(fields[1].len(), 8);
    /// fields[0].fill(7);
    /// drop(fields);
    /// assert_eq!(&buf[..4], &[7, 7, 7, 0]);
    /// ```
    pub fn slices_mut<'b>(&self, buf: &'b mut [u8]) -> Result<Vec<&'b mut [u8]>, LayoutError> {
        self.check_buf(buf.as_ptr() as usize, buf.len(), self.known_end())?;
        let mut fields = Vec::with_capacity(self.num_known_counts());
        let mut rest = buf;
        let mut consumed = 0;
        for index in 0..self.num_known_counts() {
            let range = self.range_at(index)?;
            let (_, tail) = core::mem::take(&mut rest).split_at_mut(range.start - consumed);
            let (field, tail) = tail.split_at_mut(range.len());
            fields.push(field);
            rest = tail;
            consumed = range.end;
        }
        Ok(fields)
    }

    pub(crate) fn check_base(&self, addr: usize) -> Result<(), LayoutError> {
        let align = self.alignment();
        if addr % align != 0 {
            return Err(LayoutError::MisalignedBase { addr, align });
        }
        Ok(())
    }

    fn check_buf(&self, addr: usize, len: usize, required: usize) -> Result<(), LayoutError> {
        self.check_base(addr)?;
        if len < required {
            return Err(LayoutError::BufferTooSmall { len, required });
        }
        Ok(())
    }

    /// End of the last field with a known count.
    fn known_end(&self) -> usize {
        match self.num_known_counts() {
            0 => 0,
            known => self.range_at(known - 1).map_or(0, |range| range.end),
        }
    }
}

fn check_element<T: 'static>(spec: &LayoutSpec, index: usize) -> Result<(), LayoutError> {
    match spec.element(index) {
        Some(element) if !element.accepts::<T>() => Err(element_mismatch::<T>(index)),
        _ => Ok(()),
    }
}

fn element_mismatch<T>(index: usize) -> LayoutError {
    LayoutError::ElementMismatch {
        index,
        requested: core::any::type_name::<T>(),
    }
}

/// Views `bytes`, the byte range of field `index`, as that field's elements.
fn cast_field<'b, T: Pod>(
    layout: &Descriptor<'_>,
    index: usize,
    bytes: &'b [u8],
) -> Result<&'b [T], LayoutError> {
    if mem::size_of::<T>() == 0 {
        return Ok(zero_sized_run(layout.count_at(index)?));
    }
    bytemuck::try_cast_slice(bytes).map_err(|_| element_mismatch::<T>(index))
}

pub(crate) fn cast_field_mut<'b, T: Pod>(
    layout: &Descriptor<'_>,
    index: usize,
    bytes: &'b mut [u8],
) -> Result<&'b mut [T], LayoutError> {
    check_element::<T>(layout.spec(), index)?;
    if mem::size_of::<T>() == 0 {
        return Ok(zero_sized_run(layout.count_at(index)?));
    }
    bytemuck::try_cast_slice_mut(bytes).map_err(|_| element_mismatch::<T>(index))
}

/// `count` elements of a zero-sized type. Their byte range is empty, so they
/// cannot be cast out of the buffer; a `Vec` of them never allocates.
fn zero_sized_run<'b, T: Pod>(count: usize) -> &'b mut [T] {
    alloc::vec![<T as Zeroable>::zeroed(); count].leak()
}
