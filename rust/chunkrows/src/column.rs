//! Column metadata of a chunk stream.
//!
//! Every chunk of a stream shares one [`ChunkSchema`]: the ordered list of
//! top-level columns with their physical type tags. The schema is derived once,
//! from the first chunk, and is read-only afterwards.

use std::{fmt, sync::Arc};

use parquet::{
    basic::{
        ConvertedType, LogicalType, Repetition, TimeUnit as ParquetTimeUnit,
        Type as PhysicalType,
    },
    schema::types::{SchemaDescriptor, Type as SchemaType},
};

pub type SchemaRef = Arc<ChunkSchema>;

/// Precision of a stored timestamp or time-of-day integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Millis => "MILLIS",
            TimeUnit::Micros => "MICROS",
            TimeUnit::Nanos => "NANOS",
        })
    }
}

impl From<&ParquetTimeUnit> for TimeUnit {
    fn from(unit: &ParquetTimeUnit) -> Self {
        match unit {
            ParquetTimeUnit::MILLIS(_) => TimeUnit::Millis,
            ParquetTimeUnit::MICROS(_) => TimeUnit::Micros,
            ParquetTimeUnit::NANOS(_) => TimeUnit::Nanos,
        }
    }
}

/// Physical type of a column, resolved from the columnar schema.
///
/// Each variant carries exactly what its value conversion needs. Columns with
/// no conversion rule resolve to [`ColumnType::Unsupported`], which keeps the
/// type tag found in the schema for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    /// Fixed-width integer; `bits` is one of 8, 16, 32 or 64.
    Int {
        bits: u8,
        signed: bool,
    },
    Float,
    Double,
    Boolean,
    ByteArray,
    FixedLenByteArray,
    Timestamp {
        utc_adjusted: bool,
        unit: TimeUnit,
    },
    Time {
        utc_adjusted: bool,
        unit: TimeUnit,
    },
    Unsupported(String),
}

impl ColumnType {
    /// Resolves the column type of a top-level field of a Parquet schema.
    pub fn from_parquet(field: &SchemaType) -> ColumnType {
        let info = field.get_basic_info();
        if field.is_group() {
            let tag = match (info.logical_type(), info.converted_type()) {
                (Some(LogicalType::List), _) | (_, ConvertedType::LIST) => "LIST",
                (Some(LogicalType::Map), _) | (_, ConvertedType::MAP) => "MAP",
                _ => "GROUP",
            };
            return ColumnType::Unsupported(tag.to_string());
        }

        let physical_type = field.get_physical_type();
        match info.logical_type() {
            Some(logical_type) => Self::from_logical_type(&logical_type),
            None => match info.converted_type() {
                ConvertedType::NONE => Self::from_physical_type(physical_type),
                converted_type => Self::from_converted_type(converted_type),
            },
        }
    }

    fn from_logical_type(logical_type: &LogicalType) -> ColumnType {
        match logical_type {
            LogicalType::String => ColumnType::String,
            LogicalType::Integer {
                bit_width,
                is_signed,
            } => Self::int(*bit_width as i32, *is_signed),
            LogicalType::Timestamp {
                is_adjusted_to_u_t_c,
                unit,
            } => ColumnType::Timestamp {
                utc_adjusted: *is_adjusted_to_u_t_c,
                unit: unit.into(),
            },
            LogicalType::Time {
                is_adjusted_to_u_t_c,
                unit,
            } => ColumnType::Time {
                utc_adjusted: *is_adjusted_to_u_t_c,
                unit: unit.into(),
            },
            LogicalType::Decimal { scale, precision } => {
                ColumnType::Unsupported(format!("DECIMAL({precision},{scale})"))
            }
            LogicalType::Date => ColumnType::Unsupported("DATE".to_string()),
            LogicalType::Enum => ColumnType::Unsupported("ENUM".to_string()),
            LogicalType::Json => ColumnType::Unsupported("JSON".to_string()),
            LogicalType::Bson => ColumnType::Unsupported("BSON".to_string()),
            LogicalType::Uuid => ColumnType::Unsupported("UUID".to_string()),
            LogicalType::Float16 => ColumnType::Unsupported("FLOAT16".to_string()),
            LogicalType::Unknown => ColumnType::Unsupported("NULL".to_string()),
            other => ColumnType::Unsupported(format!("{other:?}").to_uppercase()),
        }
    }

    fn from_converted_type(converted_type: ConvertedType) -> ColumnType {
        match converted_type {
            ConvertedType::UTF8 => ColumnType::String,
            ConvertedType::INT_8 => Self::int(8, true),
            ConvertedType::INT_16 => Self::int(16, true),
            ConvertedType::INT_32 => Self::int(32, true),
            ConvertedType::INT_64 => Self::int(64, true),
            ConvertedType::UINT_8 => Self::int(8, false),
            ConvertedType::UINT_16 => Self::int(16, false),
            ConvertedType::UINT_32 => Self::int(32, false),
            ConvertedType::UINT_64 => Self::int(64, false),
            // Legacy timestamp annotations are always UTC-normalized.
            ConvertedType::TIMESTAMP_MILLIS => ColumnType::Timestamp {
                utc_adjusted: true,
                unit: TimeUnit::Millis,
            },
            ConvertedType::TIMESTAMP_MICROS => ColumnType::Timestamp {
                utc_adjusted: true,
                unit: TimeUnit::Micros,
            },
            ConvertedType::TIME_MILLIS => ColumnType::Time {
                utc_adjusted: true,
                unit: TimeUnit::Millis,
            },
            ConvertedType::TIME_MICROS => ColumnType::Time {
                utc_adjusted: true,
                unit: TimeUnit::Micros,
            },
            other => ColumnType::Unsupported(other.to_string()),
        }
    }

    fn from_physical_type(physical_type: PhysicalType) -> ColumnType {
        match physical_type {
            PhysicalType::BOOLEAN => ColumnType::Boolean,
            PhysicalType::INT32 => Self::int(32, true),
            PhysicalType::INT64 => Self::int(64, true),
            PhysicalType::INT96 => ColumnType::Unsupported("INT96".to_string()),
            PhysicalType::FLOAT => ColumnType::Float,
            PhysicalType::DOUBLE => ColumnType::Double,
            PhysicalType::BYTE_ARRAY => ColumnType::ByteArray,
            PhysicalType::FIXED_LEN_BYTE_ARRAY => ColumnType::FixedLenByteArray,
        }
    }

    fn int(bits: i32, signed: bool) -> ColumnType {
        match bits {
            8 | 16 | 32 | 64 => ColumnType::Int {
                bits: bits as u8,
                signed,
            },
            _ => ColumnType::Unsupported(format!("INT({bits},{signed})")),
        }
    }

    /// The host type produced when decoding values of this column, or `None`
    /// when the column has no conversion rule.
    pub fn scan_type(&self) -> Option<ScanType> {
        let scan_type = match self {
            ColumnType::String => ScanType::String,
            ColumnType::Int { bits, signed } => match (bits, signed) {
                (8, true) => ScanType::Int8,
                (16, true) => ScanType::Int16,
                (32, true) => ScanType::Int32,
                (64, true) => ScanType::Int64,
                (8, false) => ScanType::UInt8,
                (16, false) => ScanType::UInt16,
                (32, false) => ScanType::UInt32,
                (64, false) => ScanType::UInt64,
                _ => return None,
            },
            ColumnType::Float => ScanType::Float32,
            ColumnType::Double => ScanType::Float64,
            ColumnType::Boolean => ScanType::Bool,
            ColumnType::ByteArray | ColumnType::FixedLenByteArray => ScanType::Bytes,
            ColumnType::Timestamp { utc_adjusted, .. } | ColumnType::Time { utc_adjusted, .. } => {
                if *utc_adjusted {
                    ScanType::Timestamp
                } else {
                    ScanType::LocalTimestamp
                }
            }
            ColumnType::Unsupported(_) => return None,
        };
        Some(scan_type)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ColumnType::Unsupported(_))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => f.write_str("STRING"),
            ColumnType::Int { bits: 32, signed: true } => f.write_str("INT32"),
            ColumnType::Int { bits: 64, signed: true } => f.write_str("INT64"),
            ColumnType::Int { bits, signed } => write!(f, "INT({bits},{signed})"),
            ColumnType::Float => f.write_str("FLOAT"),
            ColumnType::Double => f.write_str("DOUBLE"),
            ColumnType::Boolean => f.write_str("BOOLEAN"),
            ColumnType::ByteArray => f.write_str("BYTE_ARRAY"),
            ColumnType::FixedLenByteArray => f.write_str("FIXED_LEN_BYTE_ARRAY"),
            ColumnType::Timestamp { utc_adjusted, unit } => {
                write!(f, "TIMESTAMP(isAdjustedToUTC={utc_adjusted},unit={unit})")
            }
            ColumnType::Time { utc_adjusted, unit } => {
                write!(f, "TIME(isAdjustedToUTC={utc_adjusted},unit={unit})")
            }
            ColumnType::Unsupported(tag) => f.write_str(tag),
        }
    }
}

/// Host type tag reported for a column, i.e. the [`Value`](crate::value::Value)
/// variant its non-null values decode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Bytes,
    /// UTC-normalized instant.
    Timestamp,
    /// Wall-clock date and time without a time zone.
    LocalTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    name: String,
    column_type: ColumnType,
    nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullable: bool) -> Self {
        ColumnDescriptor {
            name: name.into(),
            column_type,
            nullable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// Physical type tag, as reported to the row-access API.
    pub fn database_type_name(&self) -> String {
        self.column_type.to_string()
    }
}

/// Ordered column descriptors shared by all chunks of a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSchema {
    columns: Vec<ColumnDescriptor>,
}

impl ChunkSchema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> ChunkSchema {
        ChunkSchema { columns }
    }

    /// Builds the schema from the top-level fields of a Parquet file schema.
    pub fn from_parquet(descriptor: &SchemaDescriptor) -> ChunkSchema {
        let columns = descriptor
            .root_schema()
            .get_fields()
            .iter()
            .map(|field| {
                let info = field.get_basic_info();
                let nullable =
                    info.has_repetition() && info.repetition() == Repetition::OPTIONAL;
                ColumnDescriptor::new(field.name(), ColumnType::from_parquet(field), nullable)
            })
            .collect();
        ChunkSchema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    /// Column names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }
}
