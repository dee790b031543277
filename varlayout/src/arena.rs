//! Arena-backed buffers. Requires the `bumpalo` feature.
//!
//! The arena owns the bytes; a [`Descriptor`] only says how many and how
//! aligned.

use crate::descriptor::Descriptor;
use crate::error::LayoutError;
use bumpalo::Bump;
use core::alloc::Layout;

/// Allocates zeroed storage for every field of `layout` in `bump`.
///
/// The bytes live as long as the arena; they are released when the arena is
/// reset or dropped.
///
/// # Examples
///
/// ```
/// use varlayout::{arena, ElementSpec, LayoutSpec};
///
/// let bump = bumpalo::Bump::new();
/// let spec = LayoutSpec::new([ElementSpec::of::<u32>(), ElementSpec::of::<u8>()]).unwrap();
/// let layout = spec.full(&[2, 5]).unwrap();
/// let buf = arena::for_layout(&layout, &bump).unwrap();
/// layout.slice_mut_of::<u8>(buf).unwrap().copy_from_slice(b"hello");
/// assert_eq!(layout.slice_of::<u8>(buf).unwrap(), b"hello");
/// ```
pub fn for_layout<'b>(layout: &Descriptor<'_>, bump: &'b Bump) -> Result<&'b mut [u8], LayoutError> {
    let size = layout.alloc_size()?;
    let alloc_layout =
        Layout::from_size_align(size, layout.alignment()).map_err(|_| LayoutError::Overflow)?;
    let ptr = bump.alloc_layout(alloc_layout).as_ptr();
    log::debug!("arena buffer of {} bytes, aligned to {}", size, layout.alignment());
    // SAFETY: `alloc_layout` returns `size` writable bytes that the arena
    // hands out exactly once.
    unsafe {
        core::ptr::write_bytes(ptr, 0, size);
        Ok(core::slice::from_raw_parts_mut(ptr, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ElementSpec, LayoutSpec};

    #[test]
    fn arena_buffer_is_aligned_and_zeroed() {
        let bump = Bump::new();
        // Skew the arena so the next allocation has to realign.
        bump.alloc(1u8);
        let spec = LayoutSpec::new([
            ElementSpec::raw(1, 1),
            ElementSpec::raw(8, 8).with_align(64),
        ])
        .unwrap();
        let layout = spec.full(&[3, 2]).unwrap();
        let buf = for_layout(&layout, &bump).unwrap();
        assert_eq!(buf.len(), 80);
        assert_eq!(buf.as_ptr() as usize % 64, 0);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn arena_needs_full_layout() {
        let bump = Bump::new();
        let spec = LayoutSpec::new([ElementSpec::raw(1, 1), ElementSpec::raw(4, 4)]).unwrap();
        let partial = spec.partial(&[1]).unwrap();
        assert_eq!(
            for_layout(&partial, &bump),
            Err(LayoutError::IncompleteCounts {
                known: 1,
                fields: 2
            })
        );
    }
}
