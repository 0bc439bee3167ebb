//! Shaped input data and value types

use std::collections::HashMap;

use crate::driver::Component;
use crate::error::CompileError;
use crate::pool::{ScratchBuf, ScratchPool};
use crate::resources::buffer::BufferHandle;
use crate::resources::texture::TextureHandle;

/// Flat numeric data in one of the supported element types
#[derive(Debug, Clone, PartialEq)]
pub enum TypedSlice {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl TypedSlice {
    pub fn component(&self) -> Component {
        match self {
            TypedSlice::I8(_) => Component::I8,
            TypedSlice::U8(_) => Component::U8,
            TypedSlice::I16(_) => Component::I16,
            TypedSlice::U16(_) => Component::U16,
            TypedSlice::I32(_) => Component::I32,
            TypedSlice::U32(_) => Component::U32,
            TypedSlice::F32(_) => Component::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedSlice::I8(v) => v.len(),
            TypedSlice::U8(v) => v.len(),
            TypedSlice::I16(v) => v.len(),
            TypedSlice::U16(v) => v.len(),
            TypedSlice::I32(v) => v.len(),
            TypedSlice::U32(v) => v.len(),
            TypedSlice::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn copy_bytes(&self, out: &mut ScratchBuf) {
        match self {
            TypedSlice::I8(v) => out.bytes_mut().copy_from_slice(bytemuck::cast_slice(v)),
            TypedSlice::U8(v) => out.bytes_mut().copy_from_slice(v),
            TypedSlice::I16(v) => out.bytes_mut().copy_from_slice(bytemuck::cast_slice(v)),
            TypedSlice::U16(v) => out.bytes_mut().copy_from_slice(bytemuck::cast_slice(v)),
            TypedSlice::I32(v) => out.bytes_mut().copy_from_slice(bytemuck::cast_slice(v)),
            TypedSlice::U32(v) => out.bytes_mut().copy_from_slice(bytemuck::cast_slice(v)),
            TypedSlice::F32(v) => out.bytes_mut().copy_from_slice(bytemuck::cast_slice(v)),
        }
    }
}

/// Caller-supplied numeric data of up to three nesting levels
///
/// Nested forms always carry f32 values; already-flat typed data passes
/// through with its own element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedData {
    D1(Vec<f32>),
    D2(Vec<Vec<f32>>),
    D3(Vec<Vec<Vec<f32>>>),
    Typed(TypedSlice),
}

impl ShapedData {
    /// Extent per nesting level. Ragged rows are an error.
    pub fn shape(&self) -> Result<Vec<usize>, CompileError> {
        match self {
            ShapedData::D1(v) => Ok(vec![v.len()]),
            ShapedData::D2(rows) => {
                let inner = rows.first().map(|r| r.len()).unwrap_or(0);
                for (row, r) in rows.iter().enumerate() {
                    if r.len() != inner {
                        return Err(CompileError::RaggedData {
                            row,
                            got: r.len(),
                            expected: inner,
                        });
                    }
                }
                Ok(vec![rows.len(), inner])
            }
            ShapedData::D3(planes) => {
                let mid = planes.first().map(|p| p.len()).unwrap_or(0);
                let inner = planes
                    .first()
                    .and_then(|p| p.first())
                    .map(|r| r.len())
                    .unwrap_or(0);
                for (i, plane) in planes.iter().enumerate() {
                    if plane.len() != mid {
                        return Err(CompileError::RaggedData {
                            row: i,
                            got: plane.len(),
                            expected: mid,
                        });
                    }
                    for (j, r) in plane.iter().enumerate() {
                        if r.len() != inner {
                            return Err(CompileError::RaggedData {
                                row: i * mid + j,
                                got: r.len(),
                                expected: inner,
                            });
                        }
                    }
                }
                Ok(vec![planes.len(), mid, inner])
            }
            ShapedData::Typed(slice) => Ok(vec![slice.len()]),
        }
    }

    /// Element type of the flattened data.
    pub fn component(&self) -> Component {
        match self {
            ShapedData::Typed(slice) => slice.component(),
            _ => Component::F32,
        }
    }

    /// Total element count across all nesting levels.
    pub fn element_count(&self) -> Result<usize, CompileError> {
        Ok(self.shape()?.iter().product())
    }

    /// Elements per vertex, the product of every dimension past the first.
    pub fn vertex_dimension(&self) -> Result<usize, CompileError> {
        Ok(self.shape()?[1..].iter().product())
    }

    /// Flatten row-major into a scratch block leased from `pool`.
    pub fn flatten(&self, pool: &mut ScratchPool) -> Result<ScratchBuf, CompileError> {
        let count = self.element_count()?;
        if count == 0 {
            return Err(CompileError::EmptyData);
        }
        let mut buf = pool.alloc(count * self.component().size());
        match self {
            ShapedData::D1(v) => buf.as_slice_mut::<f32>().copy_from_slice(v),
            ShapedData::D2(rows) => {
                let out = buf.as_slice_mut::<f32>();
                let mut at = 0;
                for row in rows {
                    out[at..at + row.len()].copy_from_slice(row);
                    at += row.len();
                }
            }
            ShapedData::D3(planes) => {
                let out = buf.as_slice_mut::<f32>();
                let mut at = 0;
                for plane in planes {
                    for row in plane {
                        out[at..at + row.len()].copy_from_slice(row);
                        at += row.len();
                    }
                }
            }
            ShapedData::Typed(slice) => slice.copy_bytes(&mut buf),
        }
        Ok(buf)
    }
}

impl From<Vec<f32>> for ShapedData {
    fn from(v: Vec<f32>) -> Self {
        ShapedData::D1(v)
    }
}

impl From<&[f32]> for ShapedData {
    fn from(v: &[f32]) -> Self {
        ShapedData::D1(v.to_vec())
    }
}

macro_rules! shaped_from_rows {
    ($($n:literal),*) => {$(
        impl From<Vec<[f32; $n]>> for ShapedData {
            fn from(rows: Vec<[f32; $n]>) -> Self {
                ShapedData::D2(rows.into_iter().map(|r| r.to_vec()).collect())
            }
        }
    )*};
}

shaped_from_rows!(1, 2, 3, 4);

impl From<TypedSlice> for ShapedData {
    fn from(slice: TypedSlice) -> Self {
        ShapedData::Typed(slice)
    }
}

/// A uniform value in the declarative surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
    Texture(TextureHandle),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<TextureHandle> for UniformValue {
    fn from(v: TextureHandle) -> Self {
        UniformValue::Texture(v)
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(v: glam::Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(v: glam::Vec3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<glam::Vec4> for UniformValue {
    fn from(v: glam::Vec4) -> Self {
        UniformValue::Vec4(v.to_array())
    }
}

impl From<glam::IVec2> for UniformValue {
    fn from(v: glam::IVec2) -> Self {
        UniformValue::IVec2(v.to_array())
    }
}

impl From<glam::IVec3> for UniformValue {
    fn from(v: glam::IVec3) -> Self {
        UniformValue::IVec3(v.to_array())
    }
}

impl From<glam::IVec4> for UniformValue {
    fn from(v: glam::IVec4) -> Self {
        UniformValue::IVec4(v.to_array())
    }
}

impl From<glam::Mat2> for UniformValue {
    fn from(v: glam::Mat2) -> Self {
        UniformValue::Mat2(v.to_cols_array())
    }
}

impl From<glam::Mat3> for UniformValue {
    fn from(v: glam::Mat3) -> Self {
        UniformValue::Mat3(v.to_cols_array())
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(v: glam::Mat4) -> Self {
        UniformValue::Mat4(v.to_cols_array())
    }
}

/// A value a batch element supplies for a prop-tagged record
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Uniform(UniformValue),
    Buffer(BufferHandle),
    Data(ShapedData),
}

impl From<UniformValue> for PropValue {
    fn from(v: UniformValue) -> Self {
        PropValue::Uniform(v)
    }
}

impl From<f32> for PropValue {
    fn from(v: f32) -> Self {
        PropValue::Uniform(UniformValue::Float(v))
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Uniform(UniformValue::Int(v))
    }
}

impl From<[f32; 2]> for PropValue {
    fn from(v: [f32; 2]) -> Self {
        PropValue::Uniform(UniformValue::Vec2(v))
    }
}

impl From<[f32; 3]> for PropValue {
    fn from(v: [f32; 3]) -> Self {
        PropValue::Uniform(UniformValue::Vec3(v))
    }
}

impl From<[f32; 4]> for PropValue {
    fn from(v: [f32; 4]) -> Self {
        PropValue::Uniform(UniformValue::Vec4(v))
    }
}

impl From<ShapedData> for PropValue {
    fn from(v: ShapedData) -> Self {
        PropValue::Data(v)
    }
}

impl From<BufferHandle> for PropValue {
    fn from(v: BufferHandle) -> Self {
        PropValue::Buffer(v)
    }
}

/// One element of a batch, queried by prop key
pub trait PropSource {
    fn prop(&self, key: &str) -> Option<PropValue>;
}

impl PropSource for HashMap<String, PropValue> {
    fn prop(&self, key: &str) -> Option<PropValue> {
        self.get(key).cloned()
    }
}

impl PropSource for HashMap<&str, PropValue> {
    fn prop(&self, key: &str) -> Option<PropValue> {
        self.get(key).cloned()
    }
}

impl<T: PropSource> PropSource for &T {
    fn prop(&self, key: &str) -> Option<PropValue> {
        (**self).prop(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_keeps_row_major_order() {
        let mut pool = ScratchPool::new();
        let data = ShapedData::D2(vec![
            vec![0.0, 1.0],
            vec![2.0, 3.0],
            vec![4.0, 5.0],
            vec![6.0, 7.0],
            vec![8.0, 9.0],
        ]);
        assert_eq!(data.shape().unwrap(), vec![5, 2]);
        let buf = data.flatten(&mut pool).unwrap();
        assert_eq!(
            buf.as_slice::<f32>(),
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn flatten_three_levels() {
        let mut pool = ScratchPool::new();
        let planes: Vec<Vec<Vec<f32>>> = (0..3)
            .map(|i| {
                (0..3)
                    .map(|j| (0..3).map(|k| (i * 9 + j * 3 + k) as f32).collect())
                    .collect()
            })
            .collect();
        let data = ShapedData::D3(planes);
        assert_eq!(data.shape().unwrap(), vec![3, 3, 3]);
        let buf = data.flatten(&mut pool).unwrap();
        let expected: Vec<f32> = (0..27).map(|i| i as f32).collect();
        assert_eq!(buf.as_slice::<f32>(), expected.as_slice());
    }

    #[test]
    fn flatten_single_element() {
        let mut pool = ScratchPool::new();
        let data = ShapedData::D1(vec![42.0]);
        assert_eq!(data.shape().unwrap(), vec![1]);
        let buf = data.flatten(&mut pool).unwrap();
        assert_eq!(buf.as_slice::<f32>(), &[42.0]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let data = ShapedData::D2(vec![vec![0.0, 1.0], vec![2.0]]);
        assert!(matches!(
            data.shape(),
            Err(CompileError::RaggedData {
                row: 1,
                got: 1,
                expected: 2
            })
        ));
    }

    #[test]
    fn typed_data_keeps_its_component() {
        let mut pool = ScratchPool::new();
        let data = ShapedData::Typed(TypedSlice::U16(vec![1, 2, 3]));
        assert_eq!(data.component(), Component::U16);
        let buf = data.flatten(&mut pool).unwrap();
        assert_eq!(buf.as_slice::<u16>(), &[1, 2, 3]);
    }
}
