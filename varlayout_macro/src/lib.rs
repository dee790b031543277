//! Macro `#[define_layout]` for defining layouts whose field list is fixed at compile time.
//!
//! See [`varlayout` crate](https://docs.rs/varlayout).

use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote, quote_spanned};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::token::Comma;
use syn::{Attribute, Data, DeriveInput, Field, Fields, Ident, LitInt, Type, Visibility};

/// Macro for defining a layout whose fields are known at compile time.
///
/// # Examples
///
/// A header of two scalars followed by two arrays, the second of which is
/// over-aligned:
///
/// ```
/// use varlayout::{define_layout, AlignedBuf, Schema};
///
/// #[define_layout]
/// struct Frame {
///     width: u32,
///     height: u32,
///     pixels: [u8],
///     #[align(16)]
///     weights: [f32],
/// }
///
/// # fn main() {
/// let spec = Frame::spec().unwrap();
/// let layout = frame::Counts { pixels: 6, weights: 2 }.descriptor(&spec).unwrap();
/// assert_eq!(layout.offset("weights"), Ok(16));
/// assert_eq!(layout.alloc_size(), Ok(24));
///
/// let mut buf = AlignedBuf::for_layout(&layout).unwrap();
/// let muts = Frame::muts(&layout, &mut buf).unwrap();
/// *muts.width = 3;
/// *muts.height = 2;
/// muts.pixels.copy_from_slice(b"abcdef");
///
/// let header = Frame::read_header(&spec, &buf).unwrap();
/// assert_eq!((*header.width, *header.height), (3, 2));
/// let refs = Frame::refs(&layout, &buf).unwrap();
/// assert_eq!(refs.pixels, b"abcdef");
/// assert_eq!(refs.weights, &[0.0, 0.0]);
/// # }
/// ```
///
/// # Field syntax
///
/// * `name: T` - a scalar field; its count is always 1.
/// * `name: [T]` - an array field; its count is supplied at runtime through `Counts`.
/// * `#[align(N)]` on a field overrides its alignment. `N` must be a power of two,
///   and no smaller than the alignment of `T`.
///
/// Every element type must implement `bytemuck::Pod`.
///
/// # Generated API
///
/// For a struct `MyType`, the following is generated:
///
/// * An uninhabited type `MyType`, implementing `varlayout::Schema`. Each field's
///   key is its name, so fields can be selected by name on any descriptor.
/// * A module `my_type` (the snake-case version of the struct name), containing:
///   * a type `Counts`, with one `usize` per array field, and `Counts::descriptor(&spec)`
///   * a type `Refs<'a>` consisting of immutable references, with lifetime `'a`
///   * a type `Muts<'a>` consisting of mutable references, with lifetime `'a`
///   * a constant `HEADER_FIELDS`, the number of scalar fields before the first array
///   * if `HEADER_FIELDS > 0`, a type `Header<'a>` with references to those fields
/// * Functions on `MyType`:
///   * `header(&spec)`: the partial descriptor that covers the header fields
///   * `read_header(&spec, &buf)`, if there are header fields
///   * `refs(&layout, &buf)` and `muts(&layout, &mut buf)`
///
/// # Memory layout
///
/// Fields are laid out in declaration order, each at the first offset after the
/// previous field that satisfies its alignment. Unlike a `#[repr(C)]` struct, the
/// total size is not padded to a multiple of the alignment.
///
/// # Compile-time checks
///
/// Element types that are not `bytemuck::Pod` are rejected:
///
/// ```compile_fail
/// use varlayout::define_layout;
///
/// struct Handle {
///     id: u32,
/// }
///
/// #[define_layout]
/// struct Handles {
///     len: usize,
///     items: [Handle],
/// }
/// ```
///
/// ```compile_fail
/// use varlayout::define_layout;
///
/// #[define_layout]
/// struct Flags {
///     flag: bool,
/// }
/// ```
///
/// So is an `#[align(N)]` below the natural alignment of the element type:
///
/// ```compile_fail
/// use varlayout::define_layout;
///
/// #[define_layout]
/// struct Underaligned {
///     #[align(2)]
///     x: [u64],
/// }
/// ```
///
/// The same override at the natural alignment is accepted:
///
/// ```
/// use varlayout::{define_layout, Schema};
///
/// #[define_layout]
/// struct Natural {
///     #[align(8)]
///     x: [u64],
/// }
///
/// # fn main() {
/// assert_eq!(Natural::ALIGN, 8);
/// # }
/// ```
///
/// Syntax errors, such as a bad `#[align]` or an unsupported field type, are
/// reported at the offending tokens; see `varlayout_example/shouldfail`.
#[proc_macro_attribute]
pub fn define_layout(
    attrs: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let attrs: proc_macro2::TokenStream = attrs.into();
    let item: proc_macro2::TokenStream = item.into();
    match define_layout_impl(attrs, item) {
        Ok(x) => x,
        Err(Error(msg, span)) => quote_spanned!(span =>
            ::core::compile_error!(#msg);
        ),
    }
    .into()
}

struct Error(&'static str, proc_macro2::Span);

fn define_layout_impl(ty_attrs: TokenStream, d: TokenStream) -> Result<TokenStream, Error> {
    if !ty_attrs.is_empty() {
        return Err(Error("define_layout takes no arguments", ty_attrs.span()));
    }
    let d: DeriveInput = match syn::parse2(d) {
        Ok(d) => d,
        Err(e) => {
            return Err(Error(
                "define_layout could not parse this as a struct",
                e.span(),
            ))
        }
    };
    if !d.generics.params.is_empty() || d.generics.where_clause.is_some() {
        return Err(Error(
            "define_layout does not support generic structs",
            d.ident.span(),
        ));
    }
    let fields = if let Data::Struct(s) = d.data {
        if let Fields::Named(n) = s.fields {
            n.named
        } else {
            return Err(Error("define_layout requires named fields", d.ident.span()));
        }
    } else {
        return Err(Error("define_layout requires a struct", d.ident.span()));
    };
    if fields.is_empty() {
        return Err(Error(
            "define_layout requires at least one field",
            d.ident.span(),
        ));
    }
    let doc_attrs: Vec<&Attribute> = d.attrs.iter().filter(|a| a.path.is_ident("doc")).collect();

    let tyvis = Scope::parse(&d.vis)?;
    let tyvis_inner = tyvis.nested();
    let tyname = d.ident;

    let mut mod_name = format_ident!("{}", tyname.to_string().to_case(Case::Snake));
    mod_name.set_span(proc_macro2::Span::call_site());

    let fields = parse_fields(fields)?;
    let num_fields = fields.len();
    let header_fields = fields.iter().take_while(|f| !f.is_array).count();

    let all_attr: Vec<&TokenStream> = fields.iter().map(|f| &f.meta.attr).collect();
    let all_vis_inner: Vec<Scope> = fields.iter().map(|f| f.meta.vis_inner).collect();
    let all_ident: Vec<&Ident> = fields.iter().map(|f| &f.meta.ident).collect();
    let all_key: Vec<String> = all_ident.iter().map(|i| i.to_string()).collect();
    let all_elem: Vec<&Type> = fields.iter().map(|f| &f.elem).collect();
    let all_index: Vec<usize> = (0..num_fields).collect();

    let all_ref_ty: Vec<TokenStream> = fields
        .iter()
        .map(|f| {
            let elem = &f.elem;
            if f.is_array {
                quote!(&'a [#elem])
            } else {
                quote!(&'a #elem)
            }
        })
        .collect();
    let all_mut_ty: Vec<TokenStream> = fields
        .iter()
        .map(|f| {
            let elem = &f.elem;
            if f.is_array {
                quote!(&'a mut [#elem])
            } else {
                quote!(&'a mut #elem)
            }
        })
        .collect();
    let all_ref_fn: Vec<Ident> = fields
        .iter()
        .map(|f| format_ident!("{}", if f.is_array { "ref_array" } else { "ref_scalar" }))
        .collect();
    let all_mut_fn: Vec<Ident> = fields
        .iter()
        .map(|f| format_ident!("{}", if f.is_array { "mut_array" } else { "mut_scalar" }))
        .collect();

    let all_element: Vec<TokenStream> = fields
        .iter()
        .zip(&all_key)
        .map(|(f, key)| {
            let elem = &f.elem;
            let with_align = f.align.as_ref().map(|a| quote!(.with_align(#a)));
            quote!(::varlayout::ElementSpec::of::<#elem>() #with_align .with_key(#key))
        })
        .collect();
    let all_align: Vec<TokenStream> = fields
        .iter()
        .map(|f| {
            let elem = &f.elem;
            match &f.align {
                Some(a) => quote!(#a),
                None => quote!(::core::mem::align_of::<#elem>()),
            }
        })
        .collect();
    let all_count: Vec<TokenStream> = fields
        .iter()
        .map(|f| {
            let ident = &f.meta.ident;
            if f.is_array {
                quote!(self.#ident)
            } else {
                quote!(1usize)
            }
        })
        .collect();

    let pod_checks: Vec<TokenStream> = fields
        .iter()
        .map(|f| {
            let elem = &f.elem;
            quote_spanned!(elem.span() =>
                ::varlayout::macro_support::assert_pod::<#elem>();
            )
        })
        .collect();
    let align_checks: Vec<TokenStream> = fields
        .iter()
        .filter_map(|f| {
            let elem = &f.elem;
            f.align.as_ref().map(|a| {
                quote_spanned!(a.span() =>
                    ::core::assert!(
                        ::varlayout::macro_support::is_valid_override(::core::mem::align_of::<#elem>(), #a),
                        "#[align] must not be smaller than the alignment of the field's element type",
                    );
                )
            })
        })
        .collect();

    let arrays: Vec<&ParsedField> = fields.iter().filter(|f| f.is_array).collect();
    let array_attr: Vec<&TokenStream> = arrays.iter().map(|f| &f.meta.attr).collect();
    let array_vis_inner: Vec<Scope> = arrays.iter().map(|f| f.meta.vis_inner).collect();
    let array_ident: Vec<&Ident> = arrays.iter().map(|f| &f.meta.ident).collect();

    let header = &fields[..header_fields];
    let header_attr: Vec<&TokenStream> = header.iter().map(|f| &f.meta.attr).collect();
    let header_vis_inner: Vec<Scope> = header.iter().map(|f| f.meta.vis_inner).collect();
    let header_ident: Vec<&Ident> = header.iter().map(|f| &f.meta.ident).collect();
    let header_elem: Vec<&Type> = header.iter().map(|f| &f.elem).collect();
    let header_index: Vec<usize> = (0..header_fields).collect();

    let (header_struct, read_header_fn) = if header_fields > 0 {
        (
            quote! {
                /// References to the fields before the first array.
                #tyvis_inner struct Header<'a> {
                    #(
                        #header_attr
                        #header_vis_inner #header_ident: &'a #header_elem,
                    )*
                }
            },
            quote! {
                /// Reads the fields before the first array, without knowing any array counts.
                #tyvis fn read_header<'b>(
                    spec: &::varlayout::LayoutSpec,
                    buf: &'b [u8],
                ) -> ::core::result::Result<#mod_name::Header<'b>, ::varlayout::LayoutError> {
                    let layout = Self::header(spec)?;
                    ::core::result::Result::Ok(#mod_name::Header {
                        #(
                            #header_ident: ::varlayout::macro_support::ref_scalar::<#header_elem>(&layout, #header_index, buf)?,
                        )*
                    })
                }
            },
        )
    } else {
        (quote!(), quote!())
    };

    Ok(quote! {
        #[allow(dead_code)]
        #tyvis mod #mod_name {
            #[allow(unused_imports)]
            use super::*;

            /// Number of scalar fields before the first array field.
            #tyvis_inner const HEADER_FIELDS: usize = #header_fields;

            /// Element counts of the array fields.
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
            #tyvis_inner struct Counts {
                #(
                    #array_attr
                    #array_vis_inner #array_ident: usize,
                )*
            }

            impl Counts {
                /// Full descriptor of `spec` with these counts.
                #tyvis_inner fn descriptor<'s>(
                    &self,
                    spec: &'s ::varlayout::LayoutSpec,
                ) -> ::core::result::Result<::varlayout::Descriptor<'s>, ::varlayout::LayoutError> {
                    ::varlayout::macro_support::check_spec::<super::#tyname>(spec)?;
                    spec.full(&[#(#all_count),*])
                }
            }

            #tyvis_inner struct Refs<'a> {
                #(
                    #all_attr
                    #all_vis_inner #all_ident: #all_ref_ty,
                )*
            }

            #tyvis_inner struct Muts<'a> {
                #(
                    #all_attr
                    #all_vis_inner #all_ident: #all_mut_ty,
                )*
            }

            #header_struct
        }

        #(#doc_attrs)*
        #tyvis enum #tyname {}

        const _: () = {
            #(#pod_checks)*
            #(#align_checks)*
        };

        impl ::varlayout::Schema for #tyname {
            const NUM_FIELDS: usize = #num_fields;
            const ALIGN: usize = ::varlayout::macro_support::array_max(&[#(#all_align),*]);

            fn elements() -> ::varlayout::macro_support::Vec<::varlayout::ElementSpec> {
                ::varlayout::macro_support::Vec::from([#(#all_element),*])
            }
        }

        #[allow(dead_code)]
        impl #tyname {
            /// Partial descriptor of `spec` that covers the fields before the first array.
            #tyvis fn header(
                spec: &::varlayout::LayoutSpec,
            ) -> ::core::result::Result<::varlayout::Descriptor<'_>, ::varlayout::LayoutError> {
                ::varlayout::macro_support::check_spec::<Self>(spec)?;
                spec.partial(&[1usize; #mod_name::HEADER_FIELDS])
            }

            #read_header_fn

            /// Immutable references to every field of `buf`.
            #tyvis fn refs<'b>(
                layout: &::varlayout::Descriptor<'_>,
                buf: &'b [u8],
            ) -> ::core::result::Result<#mod_name::Refs<'b>, ::varlayout::LayoutError> {
                ::varlayout::macro_support::check_schema::<Self>(layout)?;
                ::core::result::Result::Ok(#mod_name::Refs {
                    #(
                        #all_ident: ::varlayout::macro_support::#all_ref_fn::<#all_elem>(layout, #all_index, buf)?,
                    )*
                })
            }

            /// Mutable references to every field of `buf`. The references are disjoint.
            #tyvis fn muts<'b>(
                layout: &::varlayout::Descriptor<'_>,
                buf: &'b mut [u8],
            ) -> ::core::result::Result<#mod_name::Muts<'b>, ::varlayout::LayoutError> {
                ::varlayout::macro_support::check_schema::<Self>(layout)?;
                let mut fields = ::varlayout::macro_support::split_fields(layout, buf)?;
                ::core::result::Result::Ok(#mod_name::Muts {
                    #(
                        #all_ident: ::varlayout::macro_support::#all_mut_fn::<#all_elem>(layout, #all_index, fields.next())?,
                    )*
                })
            }
        }
    })
}

/// Where an item is visible from, restricted to the forms generated code can
/// re-express one module deeper.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Visible in the module `n` levels up: 0 is private, 1 is `pub(super)`.
    Ancestor(usize),
    Crate,
    Public,
}

impl quote::ToTokens for Scope {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match *self {
            Scope::Ancestor(0) => {}
            Scope::Ancestor(1) => tokens.extend(quote!(pub(super))),
            Scope::Ancestor(n) => {
                let mut path = quote!(super);
                for _ in 1..n {
                    path = quote!(#path::super);
                }
                tokens.extend(quote!(pub(in #path)));
            }
            Scope::Crate => tokens.extend(quote!(pub(crate))),
            Scope::Public => tokens.extend(quote!(pub)),
        }
    }
}

impl Scope {
    fn parse(v: &Visibility) -> Result<Scope, Error> {
        Ok(match v {
            Visibility::Public(_) => Scope::Public,
            Visibility::Crate(_) => Scope::Crate,
            Visibility::Restricted(r) if r.path.is_ident("crate") => Scope::Crate,
            Visibility::Restricted(r) if r.path.is_ident("super") => Scope::Ancestor(1),
            Visibility::Restricted(r) if r.path.is_ident("self") => Scope::Ancestor(0),
            Visibility::Restricted(r) => {
                return Err(Error(
                    "Visibility must be one of: (none), pub, pub(crate), pub(self), pub(super)",
                    r.paren_token.span,
                ))
            }
            Visibility::Inherited => Scope::Ancestor(0),
        })
    }

    /// The same visibility, written from inside a child module.
    fn nested(self) -> Scope {
        match self {
            Scope::Ancestor(n) => Scope::Ancestor(n + 1),
            other => other,
        }
    }
}

struct OneMeta {
    /// Attributes on the field declaration, minus `#[align]`.
    attr: TokenStream,
    /// Visibility of the field declaration, for one module deeper.
    vis_inner: Scope,
    /// Name of the field.
    ident: Ident,
}

struct ParsedField {
    meta: OneMeta,
    /// Element type: `T` for both `name: T` and `name: [T]`.
    elem: Type,
    is_array: bool,
    /// Alignment override from `#[align(N)]`.
    align: Option<LitInt>,
}

fn parse_align(attr: &Attribute) -> Result<LitInt, Error> {
    let lit: LitInt = attr
        .parse_args()
        .map_err(|_| {
            Error(
                "expected #[align(N)] with an integer N",
                attr.bracket_token.span,
            )
        })?;
    match lit.base10_parse::<usize>() {
        Ok(n) if n.is_power_of_two() => Ok(LitInt::new(&format!("{}usize", n), lit.span())),
        Ok(_) => Err(Error("#[align(N)] requires N to be a power of two", lit.span())),
        Err(_) => Err(Error("#[align(N)] requires N to fit in usize", lit.span())),
    }
}

fn parse_field(mut f: Field) -> Result<ParsedField, Error> {
    let ident = match f.ident.clone() {
        Some(ident) => ident,
        None => return Err(Error("define_layout requires named fields", f.span())),
    };
    let vis_inner = Scope::parse(&f.vis)?.nested();

    let mut align = None;
    let mut err = None;
    f.attrs.retain(|attr| {
        if !attr.path.is_ident("align") {
            return true;
        }
        if err.is_some() {
            return false;
        }
        if align.is_some() {
            err = Some(Error(
                "Field must have at most one #[align] attribute",
                attr.bracket_token.span,
            ));
        } else {
            match parse_align(attr) {
                Ok(lit) => align = Some(lit),
                Err(e) => err = Some(e),
            }
        }
        false
    });
    if let Some(err) = err {
        return Err(err);
    }

    let (elem, is_array) = match f.ty {
        Type::Slice(s) => (*s.elem, true),
        Type::Array(a) => {
            return Err(Error(
                "fixed-length arrays are not supported; use [T] for an array whose count is supplied at runtime",
                a.bracket_token.span,
            ))
        }
        Type::Reference(r) => {
            return Err(Error(
                "references cannot be stored in a layout; element types must be plain data",
                r.and_token.spans[0],
            ))
        }
        ty => (ty, false),
    };

    let attrs = &f.attrs;
    Ok(ParsedField {
        meta: OneMeta {
            attr: quote!(#( #attrs )*),
            vis_inner,
            ident,
        },
        elem,
        is_array,
        align,
    })
}

fn parse_fields(fields: Punctuated<Field, Comma>) -> Result<Vec<ParsedField>, Error> {
    fields.into_iter().map(parse_field).collect()
}
