use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, Utc};

use super::{Directory, DirectoryKind, MetadataRecord, TagName, TagValue};
use crate::error::MetadataError;

/// Seconds between the ISO-BMFF epoch (1904-01-01) and the Unix epoch.
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

const QUICKTIME_BRAND: &[u8; 4] = b"qt  ";

struct BoxHeader {
    kind: [u8; 4],
    body_start: u64,
    end: u64,
}

/// Read the movie header creation time from an MP4 or QuickTime file.
pub fn read(path: &Path) -> Result<MetadataRecord, MetadataError> {
    let file = File::open(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let len = file
        .metadata()
        .map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    read_from(&mut BufReader::new(file), len).map_err(|source| MetadataError::Container {
        path: path.to_path_buf(),
        source,
    })
}

/// `ftyp` decides between the Mp4 and QuickTime directories; `moov/mvhd`
/// supplies the creation time. A zero creation time means "unset" and is left out.
pub fn read_from<R: Read + Seek>(reader: &mut R, len: u64) -> io::Result<MetadataRecord> {
    let kind = match find_box(reader, 0, len, b"ftyp")? {
        Some(ftyp) if ftyp.end - ftyp.body_start >= 4 => {
            reader.seek(SeekFrom::Start(ftyp.body_start))?;
            let mut brand = [0u8; 4];
            reader.read_exact(&mut brand)?;
            if &brand == QUICKTIME_BRAND {
                DirectoryKind::QuickTime
            } else {
                DirectoryKind::Mp4
            }
        }
        _ => DirectoryKind::Mp4,
    };

    let moov = find_box(reader, 0, len, b"moov")?
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no moov box"))?;
    let mvhd = find_box(reader, moov.body_start, moov.end, b"mvhd")?
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no mvhd box"))?;

    let mut directory = Directory::new(kind);
    if let Some(created) = read_creation_time(reader, &mvhd)? {
        directory.insert(TagName::CreationTime, TagValue::Instant(created));
    }
    Ok(MetadataRecord::new().with_directory(directory))
}

fn read_creation_time<R: Read + Seek>(
    reader: &mut R,
    mvhd: &BoxHeader,
) -> io::Result<Option<DateTime<Utc>>> {
    reader.seek(SeekFrom::Start(mvhd.body_start))?;
    let mut version_flags = [0u8; 4];
    reader.read_exact(&mut version_flags)?;

    let seconds = if version_flags[0] == 1 {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        u64::from_be_bytes(buf)
    } else {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        u64::from(u32::from_be_bytes(buf))
    };

    if seconds == 0 {
        return Ok(None);
    }
    let unix = i64::try_from(seconds)
        .ok()
        .and_then(|s| s.checked_sub(MAC_EPOCH_OFFSET));
    Ok(unix.and_then(|s| DateTime::from_timestamp(s, 0)))
}

fn find_box<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    limit: u64,
    kind: &[u8; 4],
) -> io::Result<Option<BoxHeader>> {
    let mut pos = start;
    while let Some(header) = next_box(reader, pos, limit)? {
        if &header.kind == kind {
            return Ok(Some(header));
        }
        pos = header.end;
    }
    Ok(None)
}

fn next_box<R: Read + Seek>(reader: &mut R, pos: u64, limit: u64) -> io::Result<Option<BoxHeader>> {
    if pos + 8 > limit {
        return Ok(None);
    }
    reader.seek(SeekFrom::Start(pos))?;
    let mut header = [0u8; 8];
    reader.read_exact(&mut header)?;
    let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let kind = [header[4], header[5], header[6], header[7]];

    let (size, header_len) = match size {
        0 => (limit - pos, 8),
        1 => {
            let mut large = [0u8; 8];
            reader.read_exact(&mut large)?;
            (u64::from_be_bytes(large), 16)
        }
        n => (u64::from(n), 8),
    };

    if size < header_len || size > limit - pos {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("box at offset {} has invalid size {}", pos, size),
        ));
    }

    Ok(Some(BoxHeader {
        kind,
        body_start: pos + header_len,
        end: pos + size,
    }))
}
