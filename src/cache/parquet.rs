//! Parquet encoding of week files.
//!
//! Files are written with a fixed schema and read back by column name, so
//! files produced by other tools (nullable ints, extra columns) still load.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::data_type::{BoolType, ByteArray, ByteArrayType, Int32Type, Int64Type};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::{SerializedColumnWriter, SerializedFileWriter};
use parquet::record::Field;
use parquet::schema::parser::parse_message_type;

use crate::api::GameRecord;
use crate::error::CacheError;

const WEEK_SCHEMA: &str = "
message game_week {
    OPTIONAL BYTE_ARRAY date (UTF8);
    REQUIRED INT32 season;
    REQUIRED INT32 week;
    OPTIONAL BYTE_ARRAY home (UTF8);
    OPTIONAL BYTE_ARRAY away (UTF8);
    OPTIONAL INT64 home_points;
    OPTIONAL INT64 away_points;
    REQUIRED BOOLEAN neutral;
    OPTIONAL BYTE_ARRAY kickoff_utc (UTF8);
}
";

/// Top-level columns of a Parquet file, row-major.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Field>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

fn parquet_err(path: &Path) -> impl FnOnce(ParquetError) -> CacheError + '_ {
    move |source| CacheError::Parquet {
        path: path.to_path_buf(),
        source,
    }
}

fn write_optional_str<'a>(
    col: &mut SerializedColumnWriter<'_>,
    values: impl Iterator<Item = Option<&'a str>>,
) -> Result<(), ParquetError> {
    let mut defs: Vec<i16> = Vec::new();
    let mut data = Vec::new();
    for value in values {
        match value {
            Some(s) => {
                defs.push(1);
                data.push(ByteArray::from(s));
            }
            None => defs.push(0),
        }
    }
    col.typed::<ByteArrayType>().write_batch(&data, Some(&defs), None)?;
    Ok(())
}

fn write_optional_i64(
    col: &mut SerializedColumnWriter<'_>,
    values: impl Iterator<Item = Option<i64>>,
) -> Result<(), ParquetError> {
    let mut defs: Vec<i16> = Vec::new();
    let mut data = Vec::new();
    for value in values {
        match value {
            Some(v) => {
                defs.push(1);
                data.push(v);
            }
            None => defs.push(0),
        }
    }
    col.typed::<Int64Type>().write_batch(&data, Some(&defs), None)?;
    Ok(())
}

/// Encode records into an in-memory Parquet file.
pub fn encode_records(records: &[GameRecord]) -> Result<Vec<u8>, ParquetError> {
    let schema = Arc::new(parse_message_type(WEEK_SCHEMA)?);
    let props = Arc::new(WriterProperties::builder().build());
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = SerializedFileWriter::new(&mut buf, schema, props)?;

    if !records.is_empty() {
        let mut row_group = writer.next_row_group()?;
        let mut idx = 0;
        while let Some(mut col) = row_group.next_column()? {
            match idx {
                0 => write_optional_str(&mut col, records.iter().map(|r| r.date.as_deref()))?,
                1 => {
                    let seasons: Vec<i32> = records.iter().map(|r| r.season).collect();
                    col.typed::<Int32Type>().write_batch(&seasons, None, None)?;
                }
                2 => {
                    let weeks: Vec<i32> = records.iter().map(|r| r.week as i32).collect();
                    col.typed::<Int32Type>().write_batch(&weeks, None, None)?;
                }
                3 => write_optional_str(&mut col, records.iter().map(|r| r.home.as_deref()))?,
                4 => write_optional_str(&mut col, records.iter().map(|r| r.away.as_deref()))?,
                5 => write_optional_i64(&mut col, records.iter().map(|r| r.home_points))?,
                6 => write_optional_i64(&mut col, records.iter().map(|r| r.away_points))?,
                7 => {
                    let neutral: Vec<bool> = records.iter().map(|r| r.neutral).collect();
                    col.typed::<BoolType>().write_batch(&neutral, None, None)?;
                }
                _ => write_optional_str(&mut col, records.iter().map(|r| r.kickoff_utc.as_deref()))?,
            }
            col.close()?;
            idx += 1;
        }
        row_group.close()?;
    }

    writer.close()?;
    Ok(buf)
}

/// Read every row of a Parquet file.
pub fn read_table(path: &Path) -> Result<Table, CacheError> {
    let file = File::open(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = SerializedFileReader::new(file).map_err(parquet_err(path))?;
    let columns = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let mut rows = Vec::new();
    for row in reader.get_row_iter(None).map_err(parquet_err(path))? {
        let row = row.map_err(parquet_err(path))?;
        rows.push(row.into_columns().into_iter().map(|(_, field)| field).collect());
    }
    Ok(Table { columns, rows })
}

/// Row count from the footer, without decoding any pages.
pub fn count_rows(path: &Path) -> Result<i64, CacheError> {
    let file = File::open(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = SerializedFileReader::new(file).map_err(parquet_err(path))?;
    Ok(reader.metadata().file_metadata().num_rows())
}

pub fn field_str(field: &Field) -> Option<String> {
    match field {
        Field::Str(s) => Some(s.clone()),
        Field::Bytes(b) => b.as_utf8().ok().map(String::from),
        Field::Null => None,
        Field::Bool(_) | Field::Int(_) | Field::Long(_) | Field::Short(_) | Field::Byte(_) => {
            field_i64(field).map(|v| v.to_string())
        }
        _ => None,
    }
}

pub fn field_i64(field: &Field) -> Option<i64> {
    match field {
        Field::Byte(v) => Some(i64::from(*v)),
        Field::Short(v) => Some(i64::from(*v)),
        Field::Int(v) => Some(i64::from(*v)),
        Field::Long(v) => Some(*v),
        Field::UByte(v) => Some(i64::from(*v)),
        Field::UShort(v) => Some(i64::from(*v)),
        Field::UInt(v) => Some(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v).ok(),
        Field::Float(v) if v.fract() == 0.0 => Some(*v as i64),
        Field::Double(v) if v.fract() == 0.0 => Some(*v as i64),
        Field::Bool(b) => Some(i64::from(*b)),
        Field::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn field_bool(field: &Field) -> Option<bool> {
    match field {
        Field::Bool(b) => Some(*b),
        Field::Null => None,
        Field::Str(s) => crate::io::loaders::parse_neutral(s),
        other => field_i64(other).map(|v| v != 0),
    }
}

fn missing_column(path: &Path, column: &'static str) -> CacheError {
    CacheError::MissingColumn {
        path: path.to_path_buf(),
        column,
        tried: vec![column.to_string()],
    }
}

/// Decode a week file written by [`encode_records`] (or any file with the
/// same column names).
pub fn read_records(path: &Path) -> Result<Vec<GameRecord>, CacheError> {
    let table = read_table(path)?;
    let required = |name: &'static str| table.column(name).ok_or_else(|| missing_column(path, name));
    let season = required("season")?;
    let week = required("week")?;
    let home = required("home")?;
    let away = required("away")?;
    let date = table.column("date");
    let home_points = table.column("home_points");
    let away_points = table.column("away_points");
    let neutral = table.column("neutral");
    let kickoff = table.column("kickoff_utc");

    let get = |row: &Vec<Field>, idx: Option<usize>| idx.and_then(|i| row.get(i)).cloned();

    Ok(table
        .rows
        .iter()
        .map(|row| GameRecord {
            date: get(row, date).as_ref().and_then(field_str),
            season: get(row, Some(season))
                .as_ref()
                .and_then(field_i64)
                .and_then(|v| i32::try_from(v).ok())
                .unwrap_or_default(),
            week: get(row, Some(week))
                .as_ref()
                .and_then(field_i64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or_default(),
            home: get(row, Some(home)).as_ref().and_then(field_str),
            away: get(row, Some(away)).as_ref().and_then(field_str),
            home_points: get(row, home_points).as_ref().and_then(field_i64),
            away_points: get(row, away_points).as_ref().and_then(field_i64),
            neutral: get(row, neutral).as_ref().and_then(field_bool).unwrap_or(false),
            kickoff_utc: get(row, kickoff).as_ref().and_then(field_str),
        })
        .collect())
}
