//! Human-readable description of a descriptor.
//!
//! Each resolvable field renders as `@offset`, then `:key` if the field has a
//! key, then `<type>` if it has a kind, then `(element size)`, then
//! `[count]` if the count is known. Fields are separated by `"; "`.
//!
//! ```
//! use varlayout::{ElementSpec, LayoutSpec};
//!
//! let spec = LayoutSpec::new([
//!     ElementSpec::of::<u8>(),
//!     ElementSpec::of::<i32>().with_key("ints"),
//!     ElementSpec::raw(8, 8),
//! ]).unwrap();
//! assert_eq!(
//!     spec.partial(&[5, 3]).unwrap().to_string(),
//!     "@0<u8>(1)[5]; @8:ints<i32>(4)[3]; @24(8)",
//! );
//! ```

use crate::descriptor::Descriptor;
use alloc::string::{String, ToString};
use core::fmt;

impl fmt::Display for Descriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elements = self.spec().elements();
        for (index, offset) in self.offsets().iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            let element = &elements[index];
            write!(f, "@{}", offset)?;
            if let Some(key) = element.key() {
                write!(f, ":{}", key)?;
            }
            if let Some(kind) = element.kind() {
                write!(f, "<{}>", kind.name())?;
            }
            write!(f, "({})", element.size())?;
            if let Some(count) = self.sizes().get(index) {
                write!(f, "[{}]", count)?;
            }
        }
        Ok(())
    }
}

impl Descriptor<'_> {
    /// Same text as the [`Display`][fmt::Display] impl.
    pub fn debug_string(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::spec::{ElementSpec, LayoutSpec};

    fn char_int_double() -> LayoutSpec {
        LayoutSpec::new([
            ElementSpec::of::<u8>(),
            ElementSpec::of::<i32>(),
            ElementSpec::of::<f64>(),
        ])
        .unwrap()
    }

    #[test]
    fn partial_omits_unknown_count() {
        let spec = char_int_double();
        let layout = spec.partial(&[5, 3]).unwrap();
        assert_eq!(
            layout.debug_string(),
            "@0<u8>(1)[5]; @8<i32>(4)[3]; @24<f64>(8)"
        );
    }

    #[test]
    fn full_shows_every_count() {
        let spec = char_int_double();
        let layout = spec.full(&[5, 3, 2]).unwrap();
        assert_eq!(
            layout.debug_string(),
            "@0<u8>(1)[5]; @8<i32>(4)[3]; @24<f64>(8)[2]"
        );
    }

    #[test]
    fn empty_prefix_shows_first_field() {
        let spec = char_int_double();
        assert_eq!(spec.partial(&[]).unwrap().debug_string(), "@0<u8>(1)");
    }

    #[test]
    fn raw_fields_have_no_type() {
        let spec = LayoutSpec::new([
            ElementSpec::raw(2, 2).with_key("len"),
            ElementSpec::raw(16, 4).with_align(16),
        ])
        .unwrap();
        let layout = spec.full(&[1, 2]).unwrap();
        assert_eq!(layout.debug_string(), "@0:len(2)[1]; @16(16)[2]");
        assert_eq!(alloc::format!("{}", layout), layout.debug_string());
    }
}
