use std::fmt;
use std::str::FromStr;

use tracing::instrument;

use crate::error::{BackendError, ParseDTypeError, Result};

/// Opaque tensor identifier assigned by whoever registers the tensor.
///
/// Identity is the only thing compared: two ids with numerically equal
/// buffers are still distinct tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub u32);

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TensorId {
    fn from(id: u32) -> Self {
        TensorId(id)
    }
}

/// Element type tag of a tensor buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Float32,
    Int32,
    Bool,
}

impl DType {
    /// Get the canonical name for this dtype
    pub fn name(&self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Int32 => "int32",
            DType::Bool => "bool",
        }
    }

    /// Numeric tag used on the dispatch boundary
    pub fn tag(&self) -> u32 {
        match self {
            DType::Float32 => 0,
            DType::Int32 => 1,
            DType::Bool => 2,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = ParseDTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float32" | "f32" => Ok(DType::Float32),
            "int32" | "i32" => Ok(DType::Int32),
            "bool" => Ok(DType::Bool),
            _ => Err(ParseDTypeError::Name(s.to_string())),
        }
    }
}

impl TryFrom<u32> for DType {
    type Error = ParseDTypeError;

    fn try_from(tag: u32) -> std::result::Result<Self, Self::Error> {
        match tag {
            0 => Ok(DType::Float32),
            1 => Ok(DType::Int32),
            2 => Ok(DType::Bool),
            _ => Err(ParseDTypeError::Tag(tag)),
        }
    }
}

/// Owned, contiguous element buffer of a tensor
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    Bool(Vec<bool>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::Float32(_) => DType::Float32,
            TensorData::Int32(_) => DType::Int32,
            TensorData::Bool(_) => DType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorData::Float32(values) => values.len(),
            TensorData::Int32(values) => values.len(),
            TensorData::Bool(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<f32>> for TensorData {
    fn from(values: Vec<f32>) -> Self {
        TensorData::Float32(values)
    }
}

impl From<Vec<i32>> for TensorData {
    fn from(values: Vec<i32>) -> Self {
        TensorData::Int32(values)
    }
}

impl From<Vec<bool>> for TensorData {
    fn from(values: Vec<bool>) -> Self {
        TensorData::Bool(values)
    }
}

/// A registered tensor: id, shape and the buffer it exclusively owns.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    id: TensorId,
    shape: Vec<usize>,
    data: TensorData,
}

impl TensorInfo {
    /// Create a tensor from its shape and buffer.
    ///
    /// The product of `shape` must equal the buffer length; an empty shape
    /// describes a scalar holding exactly one element.
    #[instrument(skip_all, fields(id = %id, shape = ?shape, numel = data.len()))]
    pub fn new(id: TensorId, shape: Vec<usize>, data: TensorData) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if numel != data.len() {
            return Err(BackendError::InvalidShape {
                shape,
                len: data.len(),
            });
        }

        Ok(TensorInfo { id, shape, data })
    }

    pub fn id(&self) -> TensorId {
        self.id
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements in the buffer
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Read access to a float32 buffer
    pub fn f32(&self) -> Result<&[f32]> {
        match &self.data {
            TensorData::Float32(values) => Ok(values),
            other => Err(self.dtype_mismatch(other.dtype())),
        }
    }

    /// Write access to a float32 buffer
    pub fn f32_write(&mut self) -> Result<&mut [f32]> {
        let id = self.id;
        match &mut self.data {
            TensorData::Float32(values) => Ok(values),
            other => Err(BackendError::DTypeMismatch {
                id,
                expected: DType::Float32,
                actual: other.dtype(),
            }),
        }
    }

    fn dtype_mismatch(&self, actual: DType) -> BackendError {
        BackendError::DTypeMismatch {
            id: self.id,
            expected: DType::Float32,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_from_string() {
        assert_eq!(DType::from_str("float32"), Ok(DType::Float32));
        assert_eq!(DType::from_str("F32"), Ok(DType::Float32));
        assert_eq!(DType::from_str("int32"), Ok(DType::Int32));
        assert_eq!(DType::from_str("i32"), Ok(DType::Int32));
        assert_eq!(DType::from_str("BOOL"), Ok(DType::Bool));
        assert_eq!(
            DType::from_str("complex64"),
            Err(ParseDTypeError::Name("complex64".to_string()))
        );
    }

    #[test]
    fn test_dtype_tags_round_trip() {
        for dtype in [DType::Float32, DType::Int32, DType::Bool] {
            assert_eq!(DType::try_from(dtype.tag()), Ok(dtype));
        }
        assert_eq!(DType::try_from(3), Err(ParseDTypeError::Tag(3)));
    }

    #[test]
    fn test_shape_must_match_buffer() {
        let err = TensorInfo::new(TensorId(0), vec![2, 2], vec![1.0f32; 3].into()).unwrap_err();
        assert_eq!(
            err,
            BackendError::InvalidShape {
                shape: vec![2, 2],
                len: 3
            }
        );
    }

    #[test]
    fn test_scalar_shape_holds_one_element() {
        let scalar = TensorInfo::new(TensorId(1), vec![], vec![4.0f32].into()).unwrap();
        assert_eq!(scalar.rank(), 0);
        assert_eq!(scalar.size(), 1);
    }

    #[test]
    fn test_typed_access_checks_dtype() {
        let mut t = TensorInfo::new(TensorId(4), vec![2], vec![1i32, 2].into()).unwrap();
        assert_eq!(
            t.f32().unwrap_err(),
            BackendError::DTypeMismatch {
                id: TensorId(4),
                expected: DType::Float32,
                actual: DType::Int32
            }
        );
        assert!(t.f32_write().is_err());

        let mut f = TensorInfo::new(TensorId(5), vec![1, 2], vec![1.0f32, 2.0].into()).unwrap();
        f.f32_write().unwrap()[1] = 5.0;
        assert_eq!(f.f32().unwrap(), &[1.0, 5.0]);
    }
}
