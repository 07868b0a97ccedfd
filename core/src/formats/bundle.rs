//! Little-endian container of named n-dimensional arrays.
//!
//! Layout: `b"GFAB"`, `u16` version, `u16` array count, then per array a
//! `u16`-prefixed UTF-8 path (`/` separates groups), a `u8` dtype code, a `u8`
//! rank, `rank` × `u64` dimensions and the elements in row-major order.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{ArrayD, IxDyn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const MAGIC: &[u8; 4] = b"GFAB";
pub const VERSION: u16 = 1;

/// Element encoding on disk. Arrays are always widened to `f64` in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    U8 = 1,
    I16 = 2,
    I32 = 3,
    F32 = 4,
    F64 = 5,
}

impl DType {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(DType::U8),
            2 => Some(DType::I16),
            3 => Some(DType::I32),
            4 => Some(DType::F32),
            5 => Some(DType::F64),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BundleError {
    #[error("not an array bundle (bad magic)")]
    InvalidMagic,
    #[error("unsupported bundle version {0}")]
    UnsupportedVersion(u16),
    #[error("array `{name}` has unknown dtype code {code}")]
    UnknownDtype { name: String, code: u8 },
    #[error("array `{0}` declares an element count that overflows")]
    ShapeOverflow(String),
    #[error("array name is not valid UTF-8")]
    InvalidName,
    #[error("truncated or unreadable bundle: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct BundleArray {
    pub name: String,
    pub dtype: DType,
    pub data: ArrayD<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ArrayBundle {
    arrays: Vec<BundleArray>,
}

impl ArrayBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, dtype: DType, data: ArrayD<f64>) {
        let name = name.into();
        self.arrays.retain(|array| array.name != name);
        self.arrays.push(BundleArray { name, dtype, data });
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.arrays
            .iter()
            .find(|array| array.name == name)
            .map(|array| &array.data)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.iter().map(|array| array.name.as_str())
    }

    pub fn open(path: &Path) -> Result<Self, BundleError> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, BundleError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(BundleError::InvalidMagic);
        }
        let version = reader.read_u16::<LittleEndian>()?;
        if version != VERSION {
            return Err(BundleError::UnsupportedVersion(version));
        }

        let count = reader.read_u16::<LittleEndian>()?;
        let mut bundle = ArrayBundle::new();
        for _ in 0..count {
            let name_len = reader.read_u16::<LittleEndian>()? as usize;
            let mut name_bytes = vec![0u8; name_len];
            reader.read_exact(&mut name_bytes)?;
            let name = String::from_utf8(name_bytes).map_err(|_| BundleError::InvalidName)?;

            let code = reader.read_u8()?;
            let dtype = DType::from_code(code).ok_or_else(|| BundleError::UnknownDtype {
                name: name.clone(),
                code,
            })?;

            let rank = reader.read_u8()? as usize;
            let mut dims = Vec::with_capacity(rank);
            for _ in 0..rank {
                dims.push(reader.read_u64::<LittleEndian>()? as usize);
            }
            let total = dims
                .iter()
                .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
                .ok_or_else(|| BundleError::ShapeOverflow(name.clone()))?;

            let data = read_elements(&mut reader, dtype, total)?;
            let array = ArrayD::from_shape_vec(IxDyn(&dims), data)
                .map_err(|_| BundleError::ShapeOverflow(name.clone()))?;
            bundle.arrays.push(BundleArray {
                name,
                dtype,
                data: array,
            });
        }

        Ok(bundle)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u16::<LittleEndian>(VERSION)?;
        writer.write_u16::<LittleEndian>(header_field(self.arrays.len(), "array count")?)?;
        for array in &self.arrays {
            writer.write_u16::<LittleEndian>(header_field(array.name.len(), "array name length")?)?;
            writer.write_all(array.name.as_bytes())?;
            writer.write_u8(array.dtype as u8)?;
            writer.write_u8(header_field(array.data.ndim(), "array rank")?)?;
            for &dim in array.data.shape() {
                writer.write_u64::<LittleEndian>(dim as u64)?;
            }
            for &value in array.data.iter() {
                match array.dtype {
                    DType::U8 => writer.write_u8(value as u8)?,
                    DType::I16 => writer.write_i16::<LittleEndian>(value as i16)?,
                    DType::I32 => writer.write_i32::<LittleEndian>(value as i32)?,
                    DType::F32 => writer.write_f32::<LittleEndian>(value as f32)?,
                    DType::F64 => writer.write_f64::<LittleEndian>(value)?,
                }
            }
        }
        Ok(())
    }
}

fn read_elements<R: Read>(reader: &mut R, dtype: DType, total: usize) -> Result<Vec<f64>, BundleError> {
    // capacity is bounded so a corrupt header cannot force a huge allocation
    let mut data = Vec::with_capacity(total.min(1 << 20));
    for _ in 0..total {
        let value = match dtype {
            DType::U8 => reader.read_u8()? as f64,
            DType::I16 => reader.read_i16::<LittleEndian>()? as f64,
            DType::I32 => reader.read_i32::<LittleEndian>()? as f64,
            DType::F32 => reader.read_f32::<LittleEndian>()? as f64,
            DType::F64 => reader.read_f64::<LittleEndian>()?,
        };
        data.push(value);
    }
    Ok(data)
}

/// Narrows a header count to its on-disk width, refusing values that do not fit.
fn header_field<T: TryFrom<usize>>(value: usize, what: &str) -> std::io::Result<T> {
    T::try_from(value).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} {} does not fit the bundle header", what, value),
        )
    })
}
