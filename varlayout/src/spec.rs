//! Element specs and layout specs: the schema half of a layout.
//!
//! A [`LayoutSpec`] is built once per schema and shared by every
//! [`Descriptor`][crate::Descriptor] created from it.
//!
//! # Examples
//!
//! ```
//! use varlayout::{ElementSpec, Kind, LayoutSpec};
//!
//! let spec = LayoutSpec::new([
//!     ElementSpec::of::<u8>(),
//!     ElementSpec::of::<i32>().with_align(32),
//!     ElementSpec::of::<f64>().with_key("samples"),
//! ]).unwrap();
//! assert_eq!(spec.num_fields(), 3);
//! assert_eq!(spec.alignment(), 32);
//! assert_eq!(spec.resolve(Kind::of::<i32>()), Ok(1));
//! assert_eq!(spec.resolve("samples"), Ok(2));
//! ```

use crate::error::{LayoutError, SpecProblem};
use alloc::format;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

/// The element type of a field, used for type-based lookup.
///
/// Two kinds are equal when they were made from the same Rust type.
#[derive(Clone, Copy, Debug)]
pub struct Kind {
    id: TypeId,
    name: &'static str,
}

impl Kind {
    /// The kind of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Kind {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// Name of the type, as reported by [`core::any::type_name`].
    ///
    /// The name is meant for humans. Its exact text may differ across
    /// compiler versions.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Kind {}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type `{}`", self.name)
    }
}

/// What a layout needs to know about one field: element size and alignment.
///
/// # Examples
///
/// ```
/// use varlayout::ElementSpec;
///
/// let e = ElementSpec::of::<u32>().with_align(16);
/// assert_eq!(e.size(), 4);
/// assert_eq!(e.natural_align(), 4);
/// assert_eq!(e.effective_align(), 16);
/// assert!(e.accepts::<u32>());
/// assert!(!e.accepts::<f32>());
///
/// // A field described by numbers alone accepts any type that fits it.
/// let raw = ElementSpec::raw(4, 4);
/// assert!(raw.accepts::<f32>());
/// assert!(!raw.accepts::<u64>());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementSpec {
    size: usize,
    natural_align: usize,
    align_override: Option<usize>,
    kind: Option<Kind>,
    key: Option<&'static str>,
}

impl ElementSpec {
    /// A field whose elements are `T`s.
    pub fn of<T: 'static>() -> Self {
        ElementSpec {
            size: core::mem::size_of::<T>(),
            natural_align: core::mem::align_of::<T>(),
            align_override: None,
            kind: Some(Kind::of::<T>()),
            key: None,
        }
    }

    /// A field with no element type, only an element size and alignment.
    ///
    /// Such a field can only be looked up by index or key.
    pub const fn raw(size: usize, align: usize) -> Self {
        ElementSpec {
            size,
            natural_align: align,
            align_override: None,
            kind: None,
            key: None,
        }
    }

    /// Aligns the first element of this field to `align` instead of the
    /// element's own alignment. The elements that follow are not padded.
    ///
    /// `align` must be a power of two no smaller than [`ElementSpec::natural_align`];
    /// [`LayoutSpec::new`] rejects the spec otherwise.
    pub const fn with_align(mut self, align: usize) -> Self {
        self.align_override = Some(align);
        self
    }

    /// Names this field, so it can be looked up by key.
    pub const fn with_key(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }

    /// Size of one element in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn natural_align(&self) -> usize {
        self.natural_align
    }

    pub const fn align_override(&self) -> Option<usize> {
        self.align_override
    }

    /// The alignment the field's first element is placed at.
    pub const fn effective_align(&self) -> usize {
        match self.align_override {
            Some(align) => align,
            None => self.natural_align,
        }
    }

    pub fn kind(&self) -> Option<Kind> {
        self.kind
    }

    pub fn key(&self) -> Option<&'static str> {
        self.key
    }

    /// Whether elements of this field may be accessed as `T`.
    ///
    /// A typed field accepts only its own type. A raw field accepts any type
    /// with the same size and no stricter alignment.
    pub fn accepts<T: 'static>(&self) -> bool {
        match self.kind {
            Some(kind) => kind == Kind::of::<T>(),
            None => {
                core::mem::size_of::<T>() == self.size
                    && core::mem::align_of::<T>() <= self.effective_align()
            }
        }
    }

    fn validate(&self, index: usize) -> Result<(), SpecProblem> {
        if !self.natural_align.is_power_of_two() {
            return Err(SpecProblem::NotPowerOfTwo {
                index,
                align: self.natural_align,
            });
        }
        if let Some(requested) = self.align_override {
            if !requested.is_power_of_two() {
                return Err(SpecProblem::NotPowerOfTwo {
                    index,
                    align: requested,
                });
            }
            if requested < self.natural_align {
                return Err(SpecProblem::OverrideBelowNatural {
                    index,
                    natural: self.natural_align,
                    requested,
                });
            }
        }
        Ok(())
    }
}

/// An ordered, validated, immutable list of fields.
///
/// # Examples
///
/// ```
/// use varlayout::{ElementSpec, LayoutError, LayoutSpec, SpecProblem};
///
/// assert_eq!(
///     LayoutSpec::new([ElementSpec::raw(4, 3)]),
///     Err(LayoutError::InvalidSpec(SpecProblem::NotPowerOfTwo { index: 0, align: 3 })),
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutSpec {
    elements: Vec<ElementSpec>,
    alignment: usize,
}

impl LayoutSpec {
    /// Validates `elements` and builds a spec from them.
    pub fn new<I: IntoIterator<Item = ElementSpec>>(elements: I) -> Result<Self, LayoutError> {
        let elements: Vec<ElementSpec> = elements.into_iter().collect();
        if elements.is_empty() {
            return Err(SpecProblem::Empty.into());
        }
        for (index, element) in elements.iter().enumerate() {
            element.validate(index)?;
            if let Some(key) = element.key {
                if let Some(first) = elements[..index].iter().position(|e| e.key == Some(key)) {
                    return Err(SpecProblem::DuplicateKey {
                        key,
                        first,
                        second: index,
                    }
                    .into());
                }
            }
        }
        let alignment = elements
            .iter()
            .map(ElementSpec::effective_align)
            .fold(1, usize::max);
        Ok(LayoutSpec {
            elements,
            alignment,
        })
    }

    pub fn num_fields(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[ElementSpec] {
        &self.elements
    }

    pub fn element(&self, index: usize) -> Option<&ElementSpec> {
        self.elements.get(index)
    }

    /// The strictest effective alignment of any field. Every buffer addressed
    /// through a descriptor of this spec must be aligned to it.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Finds the index of the field named by `selector`.
    ///
    /// Index selectors are returned unchanged; the query they are used with
    /// checks them against the known counts.
    pub fn resolve<S: FieldSelector>(&self, selector: S) -> Result<usize, LayoutError> {
        selector.resolve(self)
    }

    fn find_unique(
        &self,
        matches: impl Fn(&ElementSpec) -> bool,
        describe: impl Fn() -> alloc::string::String,
    ) -> Result<usize, LayoutError> {
        let mut found = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| matches(e))
            .map(|(i, _)| i);
        match (found.next(), found.next()) {
            (Some(index), None) => Ok(index),
            (Some(_), Some(_)) => Err(LayoutError::AmbiguousKind(describe())),
            (None, _) => Err(LayoutError::KindNotFound(describe())),
        }
    }
}

/// Something that names one field of a [`LayoutSpec`]: an index, a [`Kind`],
/// or a key.
pub trait FieldSelector {
    /// Index of the selected field in `spec`.
    fn resolve(&self, spec: &LayoutSpec) -> Result<usize, LayoutError>;
}

impl FieldSelector for usize {
    #[inline(always)]
    fn resolve(&self, _spec: &LayoutSpec) -> Result<usize, LayoutError> {
        Ok(*self)
    }
}

impl FieldSelector for Kind {
    fn resolve(&self, spec: &LayoutSpec) -> Result<usize, LayoutError> {
        spec.find_unique(|e| e.kind == Some(*self), || format!("{}", self))
    }
}

impl<'a> FieldSelector for &'a str {
    fn resolve(&self, spec: &LayoutSpec) -> Result<usize, LayoutError> {
        spec.find_unique(|e| e.key == Some(*self), || format!("key `{}`", self))
    }
}
