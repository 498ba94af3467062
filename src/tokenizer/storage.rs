//! Code matrix persistence: CSV with a header row, and NumPy `.npy`

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{CodeRow, Codes};
use crate::encoding::Encoding;
use crate::error::EncodingError;

const COLUMNS: usize = 6;

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
/// Magic, two version bytes and the u16 header length
const NPY_PREAMBLE_LEN: usize = 10;
const NPY_ALIGNMENT: usize = 64;

static NPY_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'shape'\s*:\s*\(\s*(\d+)\s*,\s*(\d+)\s*,?\s*\)").unwrap());
static NPY_DESCR: Lazy<Regex> = Lazy::new(|| Regex::new(r"'descr'\s*:\s*'([^']*)'").unwrap());
static NPY_FORTRAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"'fortran_order'\s*:\s*(True|False)").unwrap());

/// Write `codes` as CSV, headed by the encoding's dimension names
pub fn save_csv(path: impl AsRef<Path>, codes: &[CodeRow], encoding: &Encoding) -> Result<(), EncodingError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    let header: Vec<&str> = encoding.dimensions().iter().map(|dimension| dimension.name()).collect();
    writeln!(writer, "{}", header.join(","))?;
    for row in codes {
        let fields: Vec<String> = row.iter().map(i64::to_string).collect();
        writeln!(writer, "{}", fields.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a code matrix written by [`save_csv`]
///
/// The header row is optional; blank lines are ignored.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Codes, EncodingError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut codes = Codes::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != COLUMNS {
            return Err(EncodingError::Shape { expected: COLUMNS, found: fields.len() });
        }
        if index == 0 && fields.iter().any(|field| field.parse::<i64>().is_err()) {
            continue;
        }

        let mut row: CodeRow = [0; COLUMNS];
        for (slot, field) in row.iter_mut().zip(&fields) {
            *slot = field
                .parse()
                .map_err(|_| EncodingError::Csv(format!("line {}: `{}` is not an integer", index + 1, field)))?;
        }
        codes.push(row);
    }
    Ok(codes)
}

fn npy_header(rows: usize) -> Vec<u8> {
    let mut header = format!("{{'descr': '<i8', 'fortran_order': False, 'shape': ({}, {}), }}", rows, COLUMNS);
    let unpadded = NPY_PREAMBLE_LEN + header.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');
    header.into_bytes()
}

/// Write `codes` as a version 1.0 `.npy` array of little-endian `i64`
pub fn save_npy(path: impl AsRef<Path>, codes: &[CodeRow]) -> Result<(), EncodingError> {
    let header = npy_header(codes.len());
    let header_len = u16::try_from(header.len()).map_err(|_| EncodingError::Npy("header too long".to_string()))?;

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(NPY_MAGIC)?;
    writer.write_u8(1)?;
    writer.write_u8(0)?;
    writer.write_u16::<LittleEndian>(header_len)?;
    writer.write_all(&header)?;
    for value in codes.iter().flatten() {
        writer.write_i64::<LittleEndian>(*value)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a `(n, 6)` little-endian `i64` array written by [`save_npy`] or NumPy
pub fn load_npy(path: impl AsRef<Path>) -> Result<Codes, EncodingError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);

    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != NPY_MAGIC {
        return Err(EncodingError::Npy("missing NUMPY magic".to_string()));
    }
    let major = reader.read_u8()?;
    let _minor = reader.read_u8()?;
    let header_len = match major {
        1 => reader.read_u16::<LittleEndian>()? as usize,
        2 | 3 => reader.read_u32::<LittleEndian>()? as usize,
        other => return Err(EncodingError::Npy(format!("unsupported format version {}", other))),
    };
    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8_lossy(&header);

    let descr = NPY_DESCR
        .captures(&header)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| EncodingError::Npy("header has no descr".to_string()))?;
    if descr != "<i8" {
        return Err(EncodingError::Npy(format!("expected dtype <i8, found {}", descr)));
    }
    if NPY_FORTRAN.captures(&header).is_some_and(|captures| &captures[1] == "True") {
        return Err(EncodingError::Npy("fortran-ordered arrays are not supported".to_string()));
    }
    let captures = NPY_SHAPE
        .captures(&header)
        .ok_or_else(|| EncodingError::Npy("header has no two-dimensional shape".to_string()))?;
    let rows: usize = captures[1].parse().map_err(|_| EncodingError::Npy("bad row count".to_string()))?;
    let columns: usize = captures[2].parse().map_err(|_| EncodingError::Npy("bad column count".to_string()))?;
    if columns != COLUMNS {
        return Err(EncodingError::Shape { expected: COLUMNS, found: columns });
    }

    let mut codes = Codes::with_capacity(rows);
    for _ in 0..rows {
        let mut row: CodeRow = [0; COLUMNS];
        reader.read_i64_into::<LittleEndian>(&mut row)?;
        codes.push(row);
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Codes {
        vec![[0, 0, 0, 0, 0, 0], [1, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 0], [5, 1, 1, 61, 13, 1], [6, 0, 0, 0, 0, 0]]
    }

    #[test]
    fn test_csv_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codes.csv");
        save_csv(&path, &sample(), &Encoding::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("type,beat,position,value,duration,instrument"));
        assert_eq!(load_csv(&path).unwrap(), sample());
    }

    #[test]
    fn test_csv_wrong_width_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "0,0,0,0,0,0\n1,2,3\n").unwrap();
        assert!(matches!(load_csv(&path), Err(EncodingError::Shape { expected: 6, found: 3 })));

        std::fs::write(&path, "0,0,0,0,0,0\n1,2,x,4,5,6\n").unwrap();
        assert!(matches!(load_csv(&path), Err(EncodingError::Csv(_))));
    }

    #[test]
    fn test_npy_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codes.npy");
        save_npy(&path, &sample()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..6], NPY_MAGIC);
        assert_eq!((bytes[6], bytes[7]), (1, 0));
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((NPY_PREAMBLE_LEN + header_len) % NPY_ALIGNMENT, 0);
        assert_eq!(bytes.len(), NPY_PREAMBLE_LEN + header_len + 5 * 6 * 8);
        assert_eq!(load_npy(&path).unwrap(), sample());
    }

    #[test]
    fn test_npy_rejects_other_dtypes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("floats.npy");
        let mut bytes = NPY_MAGIC.to_vec();
        bytes.extend([1, 0]);
        let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (0, 6), }\n";
        bytes.extend((header.len() as u16).to_le_bytes());
        bytes.extend(header.as_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(load_npy(&path), Err(EncodingError::Npy(_))));
    }
}
