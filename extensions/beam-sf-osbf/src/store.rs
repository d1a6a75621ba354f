//! Binary layout of a class table file.
//!
//! ```text
//! version  [u8; 4]
//! buckets  u32 LE
//! learnings u32 LE
//! buckets × (hash u32 LE, key u32 LE, value u32 LE)
//! ```

use std::io::ErrorKind;
use std::path::Path;

use beam::error::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::table::{ClassTable, FeatureBucket, Header};

pub const FILE_VERSION: [u8; 4] = [b'O', b'S', b'B', 1];

const HEADER_LEN: usize = 12;
const BUCKET_LEN: usize = 12;

pub fn encode(table: &ClassTable) -> Bytes {
    let header = table.header();
    let mut buffer = BytesMut::with_capacity(HEADER_LEN + BUCKET_LEN * table.buckets().len());
    buffer.put_slice(&header.version);
    buffer.put_u32_le(header.buckets);
    buffer.put_u32_le(header.learnings);
    for bucket in table.buckets() {
        buffer.put_u32_le(bucket.hash);
        buffer.put_u32_le(bucket.key);
        buffer.put_u32_le(bucket.value);
    }
    buffer.freeze()
}

pub fn decode(mut data: &[u8]) -> Result<ClassTable, Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::CorruptedClassTable {
            reason: format!("file holds {} bytes, too short for a header", data.len()),
        });
    }

    let mut version = [0u8; 4];
    data.copy_to_slice(&mut version);
    if version != FILE_VERSION {
        return Err(Error::UnsupportedTableVersion {
            found: version,
            expected: FILE_VERSION,
        });
    }

    let header = Header {
        version,
        buckets: data.get_u32_le(),
        learnings: data.get_u32_le(),
    };

    let expected = header.buckets as usize * BUCKET_LEN;
    if data.remaining() != expected {
        return Err(Error::CorruptedClassTable {
            reason: format!(
                "expected {expected} bytes of buckets, found {}",
                data.remaining()
            ),
        });
    }

    let mut buckets = Vec::with_capacity(header.buckets as usize);
    while data.has_remaining() {
        buckets.push(FeatureBucket {
            hash: data.get_u32_le(),
            key: data.get_u32_le(),
            value: data.get_u32_le(),
        });
    }

    ClassTable::from_parts(header, buckets)
}

/// Reads a table from disk. A missing file yields an empty table of `buckets` buckets.
pub fn load<P: AsRef<Path>>(path: P, buckets: u32) -> Result<ClassTable, Error> {
    let path = path.as_ref();
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(
                path = %path.display(),
                buckets,
                "no class table found, creating an empty one"
            );
            return ClassTable::new(buckets);
        }
        Err(e) => return Err(Error::from(e)),
    };

    let table = decode(&data)?;
    if table.bucket_count() != buckets {
        tracing::debug!(
            path = %path.display(),
            stored = table.bucket_count(),
            configured = buckets,
            "class table keeps the bucket count it was created with"
        );
    }
    tracing::debug!(
        path = %path.display(),
        buckets = table.bucket_count(),
        learnings = table.learnings(),
        "class table loaded"
    );
    Ok(table)
}

/// Writes a table to disk, replacing the previous file only once the new one is complete.
pub fn save<P: AsRef<Path>>(path: P, table: &ClassTable) -> Result<(), Error> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, encode(table))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::from(e));
    }
    tracing::debug!(path = %path.display(), learnings = table.learnings(), "class table stored");
    Ok(())
}
