//! Marking inter-field padding as off-limits.
//!
//! Padding bytes between fields are never part of any field, so touching them
//! is a bug. A [`PaddingFence`] is told about every such gap and may record,
//! poison or log it. The descriptor itself never calls a fence on its own;
//! [`Descriptor::poison_padding`] and [`AlignedBuf::fenced`] do.
//!
//! [`AlignedBuf::fenced`]: crate::AlignedBuf::fenced
//!
//! # Examples
//!
//! ```
//! use varlayout::{AlignedBuf, ElementSpec, LayoutSpec};
//!
//! let spec = LayoutSpec::new([ElementSpec::of::<u8>(), ElementSpec::of::<u32>()]).unwrap();
//! let layout = spec.full(&[1, 1]).unwrap();
//! let buf = AlignedBuf::for_layout(&layout).unwrap();
//!
//! let mut gaps = Vec::new();
//! layout
//!     .poison_padding(buf.as_ptr(), &mut |ptr: *const u8, len: usize| {
//!         gaps.push((ptr as usize - buf.as_ptr() as usize, len))
//!     })
//!     .unwrap();
//! assert_eq!(gaps, [(1, 3)]);
//! ```

use crate::descriptor::Descriptor;
use crate::error::LayoutError;

/// Receives the padding regions of a buffer.
pub trait PaddingFence {
    /// `len` bytes starting at `ptr` are padding and must not be accessed.
    fn mark_no_access(&mut self, ptr: *const u8, len: usize);
}

/// A fence that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFence;

impl PaddingFence for NoFence {
    #[inline(always)]
    fn mark_no_access(&mut self, _ptr: *const u8, _len: usize) {}
}

/// A fence that traces every padding region through [`log`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LogFence;

impl PaddingFence for LogFence {
    fn mark_no_access(&mut self, ptr: *const u8, len: usize) {
        log::trace!("padding: {} bytes at {:p}", len, ptr);
    }
}

impl<F: FnMut(*const u8, usize)> PaddingFence for F {
    #[inline]
    fn mark_no_access(&mut self, ptr: *const u8, len: usize) {
        self(ptr, len)
    }
}

impl<'s> Descriptor<'s> {
    /// Hands every non-empty gap between adjacent resolvable fields of the
    /// buffer at `base` to `fence`.
    ///
    /// Fails with [`LayoutError::MisalignedBase`] without calling the fence
    /// unless `base` is aligned to [`Descriptor::alignment`].
    pub fn poison_padding<F: PaddingFence + ?Sized>(
        &self,
        base: *const u8,
        fence: &mut F,
    ) -> Result<(), LayoutError> {
        self.check_base(base as usize)?;
        for gap in self.padding() {
            fence.mark_no_access(base.wrapping_add(gap.start), gap.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buf::AlignedBuf;
    use crate::spec::{ElementSpec, LayoutSpec};
    use alloc::vec::Vec;

    struct Recorder {
        base: usize,
        gaps: Vec<(usize, usize)>,
    }

    impl PaddingFence for Recorder {
        fn mark_no_access(&mut self, ptr: *const u8, len: usize) {
            self.gaps.push((ptr as usize - self.base, len));
        }
    }

    fn char_int_double() -> LayoutSpec {
        LayoutSpec::new([
            ElementSpec::raw(1, 1),
            ElementSpec::raw(4, 4),
            ElementSpec::raw(8, 8),
        ])
        .unwrap()
    }

    #[test]
    fn every_gap_is_fenced() {
        let spec = char_int_double();
        let layout = spec.full(&[3, 2, 4]).unwrap();
        let buf = AlignedBuf::for_layout(&layout).unwrap();
        let mut recorder = Recorder {
            base: buf.as_ptr() as usize,
            gaps: Vec::new(),
        };
        layout.poison_padding(buf.as_ptr(), &mut recorder).unwrap();
        assert_eq!(recorder.gaps, [(3, 1), (12, 4)]);
    }

    #[test]
    fn tight_layout_has_no_gaps() {
        let spec = char_int_double();
        let layout = spec.full(&[4, 2, 1]).unwrap();
        let buf = AlignedBuf::for_layout(&layout).unwrap();
        let mut calls = 0;
        layout
            .poison_padding(buf.as_ptr(), &mut |_: *const u8, _: usize| calls += 1)
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn partial_layout_fences_known_prefix() {
        let spec = char_int_double();
        let layout = spec.partial(&[3]).unwrap();
        let buf = AlignedBuf::zeroed(8, 8).unwrap();
        let mut recorder = Recorder {
            base: buf.as_ptr() as usize,
            gaps: Vec::new(),
        };
        layout.poison_padding(buf.as_ptr(), &mut recorder).unwrap();
        assert_eq!(recorder.gaps, [(3, 1)]);
    }

    #[test]
    fn misaligned_base_fences_nothing() {
        let spec = char_int_double();
        let layout = spec.full(&[3, 2, 4]).unwrap();
        let buf = AlignedBuf::for_layout(&layout).unwrap();
        let mut calls = 0;
        let result = layout.poison_padding(buf.as_ptr().wrapping_add(4), &mut |_: *const u8, _: usize| {
            calls += 1
        });
        assert!(matches!(result, Err(LayoutError::MisalignedBase { .. })));
        assert_eq!(calls, 0);
    }

    #[test]
    fn stock_fences_accept_any_region() {
        let spec = char_int_double();
        let layout = spec.full(&[3, 2, 4]).unwrap();
        let buf = AlignedBuf::for_layout(&layout).unwrap();
        assert!(layout.poison_padding(buf.as_ptr(), &mut NoFence).is_ok());
        assert!(layout.poison_padding(buf.as_ptr(), &mut LogFence).is_ok());
    }
}
