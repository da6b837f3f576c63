//! Host values and the column value converter.
//!
//! [`convert_value`] turns one encoded cell of a decoded record batch into a
//! [`Value`], dispatching on the column's [`ColumnType`]. A null cell converts to
//! [`Value::Null`] regardless of the declared type.

use std::{borrow::Cow, fmt};

use arrow::{
    array::{Array, ArrayRef, ArrowPrimitiveType, AsArray},
    datatypes::{
        DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
        Time32MillisecondType, Time64MicrosecondType, Time64NanosecondType,
        TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType, UInt8Type,
        UInt16Type, UInt32Type, UInt64Type,
    },
};
use chrono::{DateTime, NaiveDateTime, Utc};
use chunkrows_common::{Result, error::Error};

use crate::column::{ColumnDescriptor, ColumnType, TimeUnit};

/// One decoded column value.
///
/// String values borrow from the decoded buffer window when zero-copy strings
/// are enabled; [`Value::into_owned`] detaches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(Cow<'a, str>),
    Bytes(Vec<u8>),
    /// Instant normalized to UTC (`isAdjustedToUTC=true`).
    Timestamp(DateTime<Utc>),
    /// Wall-clock value without a zone (`isAdjustedToUTC=false`).
    LocalTimestamp(NaiveDateTime),
}

impl Value<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(v) => Value::Boolean(v),
            Value::Int8(v) => Value::Int8(v),
            Value::Int16(v) => Value::Int16(v),
            Value::Int32(v) => Value::Int32(v),
            Value::Int64(v) => Value::Int64(v),
            Value::UInt8(v) => Value::UInt8(v),
            Value::UInt16(v) => Value::UInt16(v),
            Value::UInt32(v) => Value::UInt32(v),
            Value::UInt64(v) => Value::UInt64(v),
            Value::Float32(v) => Value::Float32(v),
            Value::Float64(v) => Value::Float64(v),
            Value::String(v) => Value::String(Cow::Owned(v.into_owned())),
            Value::Bytes(v) => Value::Bytes(v),
            Value::Timestamp(v) => Value::Timestamp(v),
            Value::LocalTimestamp(v) => Value::LocalTimestamp(v),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Returns `true` if the string payload is a view into decoded chunk data
    /// rather than an owned copy.
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Value::String(Cow::Borrowed(_)))
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Bytes(v) => {
                f.write_str("0x")?;
                v.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::LocalTimestamp(v) => write!(f, "{v}"),
        }
    }
}

/// Converts the value at `row` of `array` according to the column's type.
///
/// With `zero_copy_strings`, string values borrow from `array` instead of being
/// copied into owned strings.
///
/// # Errors
/// - `TypeConversion` if the column type has no conversion rule and the value
///   is not null.
/// - `Decode` if the decoded array does not have the layout the column type
///   implies, or a temporal value is out of the representable range.
pub fn convert_value<'a>(
    column: &ColumnDescriptor,
    array: &'a ArrayRef,
    row: usize,
    zero_copy_strings: bool,
) -> Result<Value<'a>> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match column.column_type() {
        ColumnType::String => {
            let s = string_at(column, array, row)?;
            if zero_copy_strings {
                Value::String(Cow::Borrowed(s))
            } else {
                Value::String(Cow::Owned(s.to_owned()))
            }
        }
        ColumnType::Int { bits, signed } => match (bits, signed) {
            (8, true) => Value::Int8(primitive_at::<Int8Type>(column, array, row)?),
            (16, true) => Value::Int16(primitive_at::<Int16Type>(column, array, row)?),
            (32, true) => Value::Int32(primitive_at::<Int32Type>(column, array, row)?),
            (64, true) => Value::Int64(primitive_at::<Int64Type>(column, array, row)?),
            (8, false) => Value::UInt8(primitive_at::<UInt8Type>(column, array, row)?),
            (16, false) => Value::UInt16(primitive_at::<UInt16Type>(column, array, row)?),
            (32, false) => Value::UInt32(primitive_at::<UInt32Type>(column, array, row)?),
            (64, false) => Value::UInt64(primitive_at::<UInt64Type>(column, array, row)?),
            _ => return Err(Error::type_conversion(column.database_type_name())),
        },
        ColumnType::Float => Value::Float32(primitive_at::<Float32Type>(column, array, row)?),
        ColumnType::Double => Value::Float64(primitive_at::<Float64Type>(column, array, row)?),
        ColumnType::Boolean => match array.as_boolean_opt() {
            Some(values) => Value::Boolean(values.value(row)),
            None => return Err(layout_mismatch(column, array.data_type())),
        },
        ColumnType::ByteArray | ColumnType::FixedLenByteArray => {
            Value::Bytes(bytes_at(column, array, row)?.to_vec())
        }
        ColumnType::Timestamp { utc_adjusted, unit }
        | ColumnType::Time { utc_adjusted, unit } => {
            let raw = epoch_integer_at(column, array, row, *unit)?;
            let instant = instant_from_epoch(raw, *unit).ok_or_else(|| {
                Error::decode(format!(
                    "column '{}': value {raw} is out of the timestamp range",
                    column.name()
                ))
            })?;
            if *utc_adjusted {
                Value::Timestamp(instant)
            } else {
                Value::LocalTimestamp(instant.naive_utc())
            }
        }
        ColumnType::Unsupported(tag) => return Err(Error::type_conversion(tag.as_str())),
    };
    Ok(value)
}

/// Converts an integer count of `unit`s since the UNIX epoch to an instant.
pub fn instant_from_epoch(raw: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Millis => DateTime::from_timestamp_millis(raw),
        TimeUnit::Micros => DateTime::from_timestamp_micros(raw),
        TimeUnit::Nanos => Some(DateTime::from_timestamp_nanos(raw)),
    }
}

fn primitive_at<T: ArrowPrimitiveType>(
    column: &ColumnDescriptor,
    array: &ArrayRef,
    row: usize,
) -> Result<T::Native> {
    array
        .as_primitive_opt::<T>()
        .map(|values| values.value(row))
        .ok_or_else(|| layout_mismatch(column, array.data_type()))
}

fn string_at<'a>(column: &ColumnDescriptor, array: &'a ArrayRef, row: usize) -> Result<&'a str> {
    match array.data_type() {
        DataType::Utf8 => Ok(array.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => Ok(array.as_string::<i64>().value(row)),
        DataType::Utf8View => Ok(array.as_string_view().value(row)),
        other => Err(layout_mismatch(column, other)),
    }
}

fn bytes_at<'a>(column: &ColumnDescriptor, array: &'a ArrayRef, row: usize) -> Result<&'a [u8]> {
    match array.data_type() {
        DataType::Binary => Ok(array.as_binary::<i32>().value(row)),
        DataType::LargeBinary => Ok(array.as_binary::<i64>().value(row)),
        DataType::BinaryView => Ok(array.as_binary_view().value(row)),
        DataType::FixedSizeBinary(_) => Ok(array.as_fixed_size_binary().value(row)),
        other => Err(layout_mismatch(column, other)),
    }
}

/// Reads the stored epoch-relative integer of a timestamp or time column.
fn epoch_integer_at(
    column: &ColumnDescriptor,
    array: &ArrayRef,
    row: usize,
    unit: TimeUnit,
) -> Result<i64> {
    let raw = match (array.data_type(), unit) {
        (DataType::Timestamp(..), TimeUnit::Millis) => {
            primitive_at::<TimestampMillisecondType>(column, array, row)?
        }
        (DataType::Timestamp(..), TimeUnit::Micros) => {
            primitive_at::<TimestampMicrosecondType>(column, array, row)?
        }
        (DataType::Timestamp(..), TimeUnit::Nanos) => {
            primitive_at::<TimestampNanosecondType>(column, array, row)?
        }
        (DataType::Time32(_), TimeUnit::Millis) => {
            i64::from(primitive_at::<Time32MillisecondType>(column, array, row)?)
        }
        (DataType::Time64(_), TimeUnit::Micros) => {
            primitive_at::<Time64MicrosecondType>(column, array, row)?
        }
        (DataType::Time64(_), TimeUnit::Nanos) => {
            primitive_at::<Time64NanosecondType>(column, array, row)?
        }
        (DataType::Int64, _) => primitive_at::<Int64Type>(column, array, row)?,
        (DataType::Int32, _) => i64::from(primitive_at::<Int32Type>(column, array, row)?),
        (other, _) => return Err(layout_mismatch(column, other)),
    };
    Ok(raw)
}

#[cold]
fn layout_mismatch(column: &ColumnDescriptor, data_type: &DataType) -> Error {
    Error::decode(format!(
        "column '{}' of type {} decoded as {data_type}",
        column.name(),
        column.column_type()
    ))
}
