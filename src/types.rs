use std::{fmt, sync::OnceLock};

use rustc_hash::FxHashMap;

use crate::ir;

/// The closed set of primitive types of the language.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// The type of an ill-typed expression.
    Unknown,
    Void,
    Bool,
    String,
    I4,
    I8,
    I16,
    I32,
    I64,
    U4,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Int,
    UInt,
    Float,
}

impl DataType {
    pub const ALL: &[DataType] = &[
        DataType::Unknown,
        DataType::Void,
        DataType::Bool,
        DataType::String,
        DataType::I4,
        DataType::I8,
        DataType::I16,
        DataType::I32,
        DataType::I64,
        DataType::U4,
        DataType::U8,
        DataType::U16,
        DataType::U32,
        DataType::U64,
        DataType::F32,
        DataType::F64,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            DataType::Unknown => "unknown",
            DataType::Void => "void",
            DataType::Bool => "bool",
            DataType::String => "string",
            DataType::I4 => "i4",
            DataType::I8 => "i8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U4 => "u4",
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        }
    }

    /// Bit width of the sized numeric types, zero for every other type.
    pub const fn bits(self) -> u32 {
        match self {
            DataType::I4 | DataType::U4 => 4,
            DataType::I8 | DataType::U8 => 8,
            DataType::I16 | DataType::U16 => 16,
            DataType::I32 | DataType::U32 | DataType::F32 => 32,
            DataType::I64 | DataType::U64 | DataType::F64 => 64,
            DataType::Unknown | DataType::Void | DataType::Bool | DataType::String => 0,
        }
    }

    pub const fn family(self) -> Option<Family> {
        match self {
            DataType::I4 | DataType::I8 | DataType::I16 | DataType::I32 | DataType::I64 => {
                Some(Family::Int)
            }
            DataType::U4 | DataType::U8 | DataType::U16 | DataType::U32 | DataType::U64 => {
                Some(Family::UInt)
            }
            DataType::F32 | DataType::F64 => Some(Family::Float),
            DataType::Unknown | DataType::Void | DataType::Bool | DataType::String => None,
        }
    }

    pub fn is_int(self) -> bool {
        self.family() == Some(Family::Int)
    }

    pub fn is_uint(self) -> bool {
        self.family() == Some(Family::UInt)
    }

    pub fn is_float(self) -> bool {
        self.family() == Some(Family::Float)
    }

    /// Signed or unsigned integer.
    pub fn is_integral(self) -> bool {
        self.is_int() || self.is_uint()
    }

    pub fn is_numeric(self) -> bool {
        self.family().is_some()
    }

    pub fn from_keyword(keyword: &str) -> Option<DataType> {
        TYPE_KEYWORDS.get(keyword).copied()
    }

    pub const fn int(width: IntWidth) -> DataType {
        match width {
            IntWidth::W4 => DataType::I4,
            IntWidth::W8 => DataType::I8,
            IntWidth::W16 => DataType::I16,
            IntWidth::W32 => DataType::I32,
            IntWidth::W64 => DataType::I64,
        }
    }

    pub const fn uint(width: IntWidth) -> DataType {
        match width {
            IntWidth::W4 => DataType::U4,
            IntWidth::W8 => DataType::U8,
            IntWidth::W16 => DataType::U16,
            IntWidth::W32 => DataType::U32,
            IntWidth::W64 => DataType::U64,
        }
    }

    pub const fn float(width: FloatWidth) -> DataType {
        match width {
            FloatWidth::W32 => DataType::F32,
            FloatWidth::W64 => DataType::F64,
        }
    }

    /// The lowered machine representation of the type, or `None` for
    /// `unknown`, which has no representation.
    pub fn ir_type(self) -> Option<ir::Type> {
        registry().lowered.get(&self).copied()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub static TYPE_KEYWORDS: phf::Map<&'static str, DataType> = phf::phf_map! {
    "i4" => DataType::I4,
    "i8" => DataType::I8,
    "i16" => DataType::I16,
    "i32" => DataType::I32,
    "i64" => DataType::I64,
    "u4" => DataType::U4,
    "u8" => DataType::U8,
    "u16" => DataType::U16,
    "u32" => DataType::U32,
    "u64" => DataType::U64,
    "f32" => DataType::F32,
    "f64" => DataType::F64,
    "bool" => DataType::Bool,
    "string" => DataType::String,
};

/// Width of an integer literal, shared by both integer families.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W4,
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub const fn from_bits(bits: u32) -> Option<IntWidth> {
        match bits {
            4 => Some(IntWidth::W4),
            8 => Some(IntWidth::W8),
            16 => Some(IntWidth::W16),
            32 => Some(IntWidth::W32),
            64 => Some(IntWidth::W64),
            _ => None,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            IntWidth::W4 => 4,
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }

    /// Two's-complement range of the signed type of this width.
    pub const fn signed_range(self) -> (i128, i128) {
        let half = 1_i128 << (self.bits() - 1);
        (-half, half - 1)
    }

    pub const fn unsigned_max(self) -> i128 {
        (1_i128 << self.bits()) - 1
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    W32,
    W64,
}

impl FloatWidth {
    pub const fn from_bits(bits: u32) -> Option<FloatWidth> {
        match bits {
            32 => Some(FloatWidth::W32),
            64 => Some(FloatWidth::W64),
            _ => None,
        }
    }
}

/// Picks the wider of two signed integer types. Any `a` outside of the
/// family yields `b`.
pub fn greater_integer_type(a: DataType, b: DataType) -> DataType {
    greater_in_family(a, b, Family::Int)
}

/// Picks the wider of two unsigned integer types. Any `a` outside of the
/// family yields `b`.
pub fn greater_uinteger_type(a: DataType, b: DataType) -> DataType {
    greater_in_family(a, b, Family::UInt)
}

/// Yields `a` unless it is the narrower `f32`.
pub fn greater_float_type(a: DataType, b: DataType) -> DataType {
    if a == DataType::F32 {
        b
    } else {
        a
    }
}

/// The greater type of two integers of the same family, following their own
/// family order.
pub fn greater_integral_type(a: DataType, b: DataType) -> DataType {
    if a.is_uint() {
        greater_uinteger_type(a, b)
    } else {
        greater_integer_type(a, b)
    }
}

fn greater_in_family(a: DataType, b: DataType, family: Family) -> DataType {
    if a.family() != Some(family) {
        return b;
    }
    if b.family() == Some(family) && b.bits() > a.bits() {
        b
    } else {
        a
    }
}

struct Registry {
    lowered: FxHashMap<DataType, ir::Type>,
}

/// Process-wide table of lowered types, built on first use and never
/// mutated afterwards.
fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let lowered = DataType::ALL
            .iter()
            .filter_map(|&ty| {
                let lowered = match ty {
                    DataType::Unknown => return None,
                    DataType::Void => ir::Type::Void,
                    DataType::Bool => ir::Type::I1,
                    DataType::String => ir::Type::Ptr,
                    DataType::F32 => ir::Type::F32,
                    DataType::F64 => ir::Type::F64,
                    integral => ir::Type::Int(integral.bits()),
                };
                Some((ty, lowered))
            })
            .collect();
        tracing::trace!("initialized type registry");
        Registry { lowered }
    })
}
