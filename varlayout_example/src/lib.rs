#![allow(dead_code)]
use bytemuck::{Pod, Zeroable};
use varlayout::{define_layout, AlignedBuf, LayoutError, LayoutSpec};

#[define_layout]
/// A string stored as its byte length followed by its bytes.
pub struct CompactString {
    /// Number of bytes in `chars`.
    pub len: usize,
    /// UTF-8 bytes, not NUL-terminated.
    pub chars: [u8],
}

/// Copies `s` into a new buffer laid out as a [`CompactString`].
pub fn encode_str(spec: &LayoutSpec, s: &str) -> Result<AlignedBuf, LayoutError> {
    let layout = compact_string::Counts { chars: s.len() }.descriptor(spec)?;
    let mut buf = AlignedBuf::for_layout(&layout)?;
    let muts = CompactString::muts(&layout, &mut buf)?;
    *muts.len = s.len();
    muts.chars.copy_from_slice(s.as_bytes());
    Ok(buf)
}

/// Reads back the bytes written by [`encode_str`]. Only the length prefix is
/// needed to locate them.
pub fn decode_str<'b>(spec: &LayoutSpec, buf: &'b [u8]) -> Result<&'b [u8], LayoutError> {
    let len = *CompactString::read_header(spec, buf)?.len;
    let layout = compact_string::Counts { chars: len }.descriptor(spec)?;
    Ok(CompactString::refs(&layout, buf)?.chars)
}

#[define_layout]
/// A message with a fixed header and two payload arrays.
pub struct Message {
    pub id: u64,
    pub num_samples: u32,
    pub num_weights: u32,
    pub samples: [f32],
    /// Kept on its own cache-line-friendly boundary.
    #[align(32)]
    pub weights: [f64],
}

impl message::Counts {
    /// Counts as recorded in a message header.
    pub fn from_header(header: &message::Header<'_>) -> Self {
        message::Counts {
            samples: *header.num_samples as usize,
            weights: *header.num_weights as usize,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[define_layout]
/// A sequence of points.
pub(crate) struct Polyline {
    pub(crate) closed: u32,
    pub(crate) points: [Point],
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoffset::offset_of;
    use varlayout::{arena, Descriptor, ElementSpec, Kind, LogFence, Schema};

    fn write_message(spec: &LayoutSpec, samples: &[f32], weights: &[f64]) -> AlignedBuf {
        let layout = message::Counts {
            samples: samples.len(),
            weights: weights.len(),
        }
        .descriptor(spec)
        .unwrap();
        let mut buf = AlignedBuf::fenced(&layout, &mut LogFence).unwrap();
        let muts = Message::muts(&layout, &mut buf).unwrap();
        *muts.id = 77;
        *muts.num_samples = samples.len() as u32;
        *muts.num_weights = weights.len() as u32;
        muts.samples.copy_from_slice(samples);
        muts.weights.copy_from_slice(weights);
        buf
    }

    #[test]
    fn two_phase_read() {
        let spec = Message::spec().unwrap();
        let buf = write_message(&spec, &[1.0, 2.0, 3.0], &[0.25, 0.5]);

        let header = Message::header(&spec).unwrap();
        assert_eq!(header.num_known_counts(), message::HEADER_FIELDS);
        assert_eq!(header.offsets(), &[0, 8, 12, 16]);
        assert_eq!(header.offset("samples"), Ok(16));
        assert!(matches!(
            header.offset("weights"),
            Err(LayoutError::IndexOutOfRange { index: 4, resolvable: 4 })
        ));

        let fields = Message::read_header(&spec, &buf).unwrap();
        assert_eq!(*fields.id, 77);
        let layout = message::Counts::from_header(&fields).descriptor(&spec).unwrap();
        assert_eq!(layout.offset("weights"), Ok(32));
        assert_eq!(layout.alloc_size(), Ok(48));
        assert_eq!(layout.alignment(), 32);

        let refs = Message::refs(&layout, &buf).unwrap();
        assert_eq!(refs.samples, &[1.0, 2.0, 3.0]);
        assert_eq!(refs.weights, &[0.25, 0.5]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn counts_stored_in_a_leading_header() {
        let spec = LayoutSpec::new([
            ElementSpec::of::<usize>(),
            ElementSpec::of::<usize>(),
            ElementSpec::of::<f32>(),
            ElementSpec::of::<f64>(),
        ])
        .unwrap();
        let floats = [0.5f32, 1.5, 2.5];
        let doubles = [1.0f64, 2.0, 3.0, 4.0];

        let layout = spec.full(&[1, 1, floats.len(), doubles.len()]).unwrap();
        let mut buf = AlignedBuf::for_layout(&layout).unwrap();
        layout.slice_mut::<usize>(0, &mut buf).unwrap()[0] = floats.len();
        layout.slice_mut::<usize>(1, &mut buf).unwrap()[0] = doubles.len();
        layout.slice_mut_of::<f32>(&mut buf).unwrap().copy_from_slice(&floats);
        layout.slice_mut_of::<f64>(&mut buf).unwrap().copy_from_slice(&doubles);

        let header = spec.partial(&[1, 1]).unwrap();
        assert_eq!(header.offsets(), &[0, 8, 16]);
        let n = header.slice::<usize>(0, &buf).unwrap()[0];
        let m = header.slice::<usize>(1, &buf).unwrap()[0];
        assert_eq!((n, m), (3, 4));

        let layout = spec.full(&[1, 1, n, m]).unwrap();
        assert_eq!(layout.offsets(), &[0, 8, 16, 32]);
        assert_eq!(layout.alloc_size(), Ok(64));
        assert_eq!(layout.slice_of::<f32>(&buf).unwrap(), &floats);
        assert_eq!(layout.slice_of::<f64>(&buf).unwrap(), &doubles);
    }

    #[test]
    fn header_fields_are_a_scalar_prefix() {
        assert_eq!(compact_string::HEADER_FIELDS, 1);
        assert_eq!(message::HEADER_FIELDS, 3);
        assert_eq!(polyline::HEADER_FIELDS, 1);
        assert_eq!(Message::NUM_FIELDS, 5);
        assert_eq!(Message::ALIGN, 32);
        assert_eq!(Message::spec().unwrap().alignment(), Message::ALIGN);
    }

    #[test]
    fn compact_string_round_trip() {
        let spec = CompactString::spec().unwrap();
        for s in ["", "a", "hello, layout"] {
            let buf = encode_str(&spec, s).unwrap();
            assert_eq!(buf.len(), core::mem::size_of::<usize>() + s.len());
            assert_eq!(decode_str(&spec, &buf).unwrap(), s.as_bytes());
        }
    }

    #[test]
    fn custom_pod_elements() {
        let spec = Polyline::spec().unwrap();
        let layout = polyline::Counts { points: 3 }.descriptor(&spec).unwrap();
        let mut buf = AlignedBuf::for_layout(&layout).unwrap();
        {
            let muts = Polyline::muts(&layout, &mut buf).unwrap();
            *muts.closed = 1;
            for (i, p) in muts.points.iter_mut().enumerate() {
                *p = Point {
                    x: i as f32,
                    y: -(i as f32),
                };
            }
        }
        assert_eq!(layout.offset_of::<Point>(), Ok(4));
        let refs = Polyline::refs(&layout, &buf).unwrap();
        assert_eq!(*refs.closed, 1);
        assert_eq!(refs.points[2], Point { x: 2.0, y: -2.0 });
        assert_eq!(layout.slice_of::<Point>(&buf).unwrap(), refs.points);
    }

    #[test]
    fn generated_views_check_the_descriptor() {
        let spec = Message::spec().unwrap();
        let buf = AlignedBuf::zeroed(64, 32).unwrap();

        let header = Message::header(&spec).unwrap();
        assert!(matches!(
            Message::refs(&header, &buf),
            Err(LayoutError::IncompleteCounts { known: 3, fields: 5 })
        ));

        let other = Polyline::spec().unwrap();
        assert!(matches!(
            message::Counts::default().descriptor(&other),
            Err(LayoutError::SchemaMismatch { .. })
        ));
        let foreign = polyline::Counts { points: 1 }.descriptor(&other).unwrap();
        assert!(matches!(
            Message::refs(&foreign, &buf),
            Err(LayoutError::SchemaMismatch { .. })
        ));

        let small = message::Counts {
            samples: 4,
            weights: 4,
        }
        .descriptor(&spec)
        .unwrap();
        assert!(Message::refs(&small, &buf).is_ok());
        assert!(matches!(
            Message::refs(&small, &buf[..48]),
            Err(LayoutError::BufferTooSmall {
                len: 48,
                required: 64
            })
        ));
    }

    #[test]
    fn header_scalar_must_hold_one_element() {
        // The generated spec, but with a count of 2 for the scalar `len`.
        let spec = CompactString::spec().unwrap();
        let layout = spec.full(&[2, 3]).unwrap();
        let buf = AlignedBuf::for_layout(&layout).unwrap();
        assert!(matches!(
            CompactString::refs(&layout, &buf),
            Err(LayoutError::NotScalar { index: 0, count: 2 })
        ));
    }

    #[repr(C)]
    struct Flat {
        a: u8,
        b: u32,
        c: u16,
        d: f64,
        e: u8,
    }

    #[define_layout]
    struct FlatLayout {
        a: u8,
        b: u32,
        c: u16,
        d: f64,
        e: u8,
    }

    #[test]
    fn unit_counts_match_repr_c() {
        let spec = FlatLayout::spec().unwrap();
        let layout = flat_layout::Counts {}.descriptor(&spec).unwrap();
        assert_eq!(layout.offset("a"), Ok(offset_of!(Flat, a)));
        assert_eq!(layout.offset("b"), Ok(offset_of!(Flat, b)));
        assert_eq!(layout.offset("c"), Ok(offset_of!(Flat, c)));
        assert_eq!(layout.offset("d"), Ok(offset_of!(Flat, d)));
        assert_eq!(layout.offset("e"), Ok(offset_of!(Flat, e)));
        assert_eq!(layout.alignment(), core::mem::align_of::<Flat>());
        assert_eq!(FlatLayout::ALIGN, core::mem::align_of::<Flat>());
        // No tail padding: the layout ends right after `e`.
        assert_eq!(layout.alloc_size(), Ok(offset_of!(Flat, e) + 1));
        assert!(core::mem::size_of::<Flat>() >= layout.alloc_size().unwrap());
    }

    #[test]
    fn fields_are_selectable_by_name_or_type() {
        let spec = Message::spec().unwrap();
        let layout = message::Counts {
            samples: 2,
            weights: 1,
        }
        .descriptor(&spec)
        .unwrap();
        assert_eq!(layout.offset("samples"), layout.offset_of::<f32>());
        assert_eq!(layout.offset(Kind::of::<f64>()), layout.offset("weights"));
        // Two u32 header fields: lookup by type is ambiguous, by name it is not.
        assert!(matches!(
            layout.offset_of::<u32>(),
            Err(LayoutError::AmbiguousKind(_))
        ));
        assert_eq!(layout.offset("num_weights"), Ok(12));
        assert!(matches!(
            layout.offset_of::<i8>(),
            Err(LayoutError::KindNotFound(_))
        ));
        assert_eq!(
            layout.debug_string(),
            "@0:id<u64>(8)[1]; @8:num_samples<u32>(4)[1]; @12:num_weights<u32>(4)[1]; \
             @16:samples<f32>(4)[2]; @32:weights<f64>(8)[1]"
        );
    }

    #[test]
    fn arena_buffers() {
        let bump = bumpalo::Bump::new();
        let spec = CompactString::spec().unwrap();
        let layout = compact_string::Counts { chars: 5 }.descriptor(&spec).unwrap();
        let buf = arena::for_layout(&layout, &bump).unwrap();
        let muts = CompactString::muts(&layout, buf).unwrap();
        *muts.len = 5;
        muts.chars.copy_from_slice(b"arena");
        assert_eq!(decode_str(&spec, buf).unwrap(), b"arena");
    }

    #[test]
    fn disjoint_fields_on_separate_threads() {
        let spec = Message::spec().unwrap();
        let layout = message::Counts {
            samples: 1000,
            weights: 1000,
        }
        .descriptor(&spec)
        .unwrap();
        let mut buf = AlignedBuf::for_layout(&layout).unwrap();
        let muts = Message::muts(&layout, &mut buf).unwrap();
        let (samples, weights) = (muts.samples, muts.weights);
        std::thread::scope(|s| {
            s.spawn(|| samples.iter_mut().enumerate().for_each(|(i, x)| *x = i as f32));
            s.spawn(|| weights.iter_mut().for_each(|w| *w = 1.5));
        });
        let refs = Message::refs(&layout, &buf).unwrap();
        assert_eq!(refs.samples[999], 999.0);
        assert!(refs.weights.iter().all(|&w| w == 1.5));
    }

    #[test]
    fn runtime_and_generated_specs_agree() {
        let by_hand = LayoutSpec::new([
            ElementSpec::of::<usize>().with_key("len"),
            ElementSpec::of::<u8>().with_key("chars"),
        ])
        .unwrap();
        assert_eq!(by_hand, CompactString::spec().unwrap());
        let layout: Descriptor<'_> = compact_string::Counts { chars: 3 }
            .descriptor(&by_hand)
            .unwrap();
        assert_eq!(layout, by_hand.full(&[1, 3]).unwrap());
    }

    const MY_ALIGN_TYPE_LEN: usize = 4;
    type MyType = u16;

    #[define_layout]
    pub struct VisibilityScenarios {
        len: usize,
        pub(self) len2: usize,
        pub(super) len3: usize,
        pub(crate) len4: usize,
        pub len5: usize,
        arr1: [MyType],
        #[align(16)]
        pub arr2: [[u8; MY_ALIGN_TYPE_LEN]],
    }

    #[test]
    fn visibility_and_paths() {
        let spec = VisibilityScenarios::spec().unwrap();
        let layout = visibility_scenarios::Counts { arr1: 3, arr2: 2 }
            .descriptor(&spec)
            .unwrap();
        assert_eq!(layout.offset("arr1"), Ok(5 * core::mem::size_of::<usize>()));
        assert_eq!(layout.alignment(), 16);
        let buf = AlignedBuf::for_layout(&layout).unwrap();
        let refs = VisibilityScenarios::refs(&layout, &buf).unwrap();
        assert_eq!(refs.arr2, &[[0u8; 4]; 2]);
        assert_eq!(*refs.len + *refs.len2 + *refs.len3 + *refs.len4 + *refs.len5, 0);
    }

    #[cfg(not(miri))]
    #[test]
    fn compile_errors_are_good() {
        let t = trybuild::TestCases::new();
        t.compile_fail("shouldfail/*.rs");
    }
}
