use bytemuck::Pod;

use crate::device::{AttributeFormat, ScalarKind};

/// Element type storable in a [`GeometryBuffer`](super::GeometryBuffer).
///
/// One element is one vertex worth of a single attribute: 1 to 4 components
/// of a 32-bit scalar.
pub trait VertexElement: Pod {
    const SCALAR: ScalarKind;
    const COMPONENTS: u32;

    #[inline]
    fn format() -> AttributeFormat {
        AttributeFormat::new(Self::SCALAR, Self::COMPONENTS)
    }
}

macro_rules! vertex_element {
    ($($ty:ty => $scalar:ident, $n:literal;)*) => {
        $(
            impl VertexElement for $ty {
                const SCALAR: ScalarKind = ScalarKind::$scalar;
                const COMPONENTS: u32 = $n;
            }
        )*
    };
}

vertex_element! {
    f32 => Float, 1;
    [f32; 2] => Float, 2;
    [f32; 3] => Float, 3;
    [f32; 4] => Float, 4;
    u32 => Uint, 1;
    [u32; 2] => Uint, 2;
    i32 => Sint, 1;
    [i32; 2] => Sint, 2;
}

/// Vertex generator for one geometry slot.
///
/// `vertex_count` is the declared size of the slot. `write_vertices` must
/// append exactly that many vertices to `out`; any other count is rejected.
pub trait GeometrySource<V> {
    fn vertex_count(&self) -> usize;
    fn write_vertices(&self, out: &mut Vec<V>);
}
