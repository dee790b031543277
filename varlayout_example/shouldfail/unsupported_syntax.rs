use varlayout::define_layout;

#[define_layout]
struct UnnamedStruct(u8);

#[define_layout]
enum Enum { A, B }

#[define_layout]
union Union {
    a: u8,
    b: u16,
}

#[define_layout]
pub struct UnsupportedVisibility {
    pub(in crate::foo::bar) x: u8,
}

#[define_layout]
pub struct FixedArray {
    x: [u8; 4],
}

#[define_layout]
pub struct Reference {
    x: &'static u8,
}

#[define_layout]
pub struct Generic<T> {
    x: [T],
}

#[define_layout]
pub struct Empty {}

#[define_layout(packed)]
pub struct WithArguments {
    x: u8,
}

#[define_layout]
fn f() {}

fn main() {}
