//! A zero-initialized heap buffer with a chosen alignment.
//!
//! Descriptors never allocate. [`AlignedBuf`] is the simplest thing that
//! satisfies their contract: at least [`Descriptor::alloc_size`] bytes,
//! aligned to [`Descriptor::alignment`].
//!
//! # Examples
//!
//! ```
//! use varlayout::{AlignedBuf, ElementSpec, LayoutSpec};
//!
//! let spec = LayoutSpec::new([ElementSpec::of::<u16>(), ElementSpec::of::<u64>()]).unwrap();
//! let layout = spec.full(&[3, 2]).unwrap();
//! let buf = AlignedBuf::for_layout(&layout).unwrap();
//! assert_eq!(buf.len(), 24);
//! assert_eq!(buf.as_ptr() as usize % 8, 0);
//! assert!(buf.iter().all(|&b| b == 0));
//! ```

use crate::descriptor::Descriptor;
use crate::error::LayoutError;
use crate::fence::PaddingFence;
use alloc::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

/// Owned, zeroed, aligned bytes.
pub struct AlignedBuf {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
}

// SAFETY: `AlignedBuf` uniquely owns its allocation, like `Box<[u8]>`.
unsafe impl Send for AlignedBuf {}
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
    /// Allocates `len` zero bytes aligned to `align`.
    ///
    /// Fails with [`LayoutError::Overflow`] if `align` is not a power of two
    /// or `len` rounded up to `align` exceeds `isize::MAX`.
    pub fn zeroed(len: usize, align: usize) -> Result<Self, LayoutError> {
        let layout =
            Layout::from_size_align(len, align).map_err(|_| LayoutError::Overflow)?;
        let ptr = if len == 0 {
            // A well-aligned dangling pointer; nothing to free.
            NonNull::new(align as *mut u8).ok_or(LayoutError::Overflow)?
        } else {
            // SAFETY: `layout` has a non-zero size.
            let p = unsafe { alloc_zeroed(layout) };
            match NonNull::new(p) {
                Some(p) => p,
                None => handle_alloc_error(layout),
            }
        };
        log::debug!("allocated {} bytes aligned to {} at {:p}", len, align, ptr);
        Ok(AlignedBuf { ptr, len, align })
    }

    /// Allocates a buffer that fits every field of `layout`.
    ///
    /// Fails with [`LayoutError::IncompleteCounts`] unless every count is known.
    pub fn for_layout(layout: &Descriptor<'_>) -> Result<Self, LayoutError> {
        Self::zeroed(layout.alloc_size()?, layout.alignment())
    }

    /// Like [`AlignedBuf::for_layout`], then hands every padding region of
    /// the new buffer to `fence`.
    ///
    /// # Examples
    ///
    /// ```
    /// use varlayout::{AlignedBuf, ElementSpec, LayoutSpec};
    ///
    /// let spec = LayoutSpec::new([ElementSpec::of::<u8>(), ElementSpec::of::<u32>()]).unwrap();
    /// let layout = spec.full(&[2, 1]).unwrap();
    /// let mut fenced = 0;
    /// let buf = AlignedBuf::fenced(&layout, &mut |_: *const u8, len: usize| fenced += len).unwrap();
    /// assert_eq!(buf.len(), 8);
    /// assert_eq!(fenced, 2);
    /// ```
    pub fn fenced<F: PaddingFence + ?Sized>(
        layout: &Descriptor<'_>,
        fence: &mut F,
    ) -> Result<Self, LayoutError> {
        let buf = Self::for_layout(layout)?;
        layout.poison_padding(buf.as_ptr(), fence)?;
        Ok(buf)
    }

    pub fn align(&self) -> usize {
        self.align
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        log::trace!("releasing {} bytes at {:p}", self.len, self.ptr);
        if self.len != 0 {
            // SAFETY: allocated in `zeroed` with exactly this size and alignment.
            unsafe {
                let layout = Layout::from_size_align_unchecked(self.len, self.align);
                dealloc(self.ptr.as_ptr(), layout);
            }
        }
    }
}

impl Deref for AlignedBuf {
    type Target = [u8];
    #[inline]
    fn deref(&self) -> &[u8] {
        // SAFETY: `ptr` points to `len` initialized bytes owned by `self`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuf {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `deref`, and `&mut self` guarantees uniqueness.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl core::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.len)
            .field("align", &self.align)
            .finish()
    }
}
