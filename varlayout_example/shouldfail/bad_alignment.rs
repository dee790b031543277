use varlayout::define_layout;

#[define_layout]
struct NotPowerOfTwo {
    #[align(24)]
    x: [u8],
}

#[define_layout]
struct NotAnInteger {
    #[align(eight)]
    x: [u8],
}

#[define_layout]
struct TwoOverrides {
    #[align(8)]
    #[align(16)]
    x: [u8],
}

fn main() {}
