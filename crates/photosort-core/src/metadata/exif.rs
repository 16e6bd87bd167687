use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ::exif::{Context, Exif, In, Reader, Tag, Value};

use super::{Directory, DirectoryKind, MetadataRecord, Rational, TagName, TagValue};
use crate::error::MetadataError;

// kamadak-exif only defines these in the Exif context; some writers put them in IFD0.
const OFFSET_TIME: u16 = 0x9010;
const DATE_TIME_ORIGINAL: u16 = 0x9003;
const OFFSET_TIME_ORIGINAL: u16 = 0x9011;

/// Read EXIF from any container kamadak-exif understands (JPEG, PNG, TIFF, HEIF, WebP).
pub fn read(path: &Path) -> Result<MetadataRecord, MetadataError> {
    let file = File::open(path).map_err(|source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let exif = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .map_err(|source| MetadataError::Exif {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(record_from_exif(&exif))
}

/// Split the primary image's fields into the directories the date resolver reads.
///
/// kamadak-exif reports Exif sub-IFD fields under `In::PRIMARY` with an
/// `Exif` context, while tags stored directly in IFD0 keep the `Tiff` context.
/// That is what tells the sub-IFD `DateTimeOriginal` apart from an IFD0 one.
pub fn record_from_exif(exif: &Exif) -> MetadataRecord {
    let mut sub_ifd = Directory::new(DirectoryKind::ExifSubIfd);
    let mut ifd0 = Directory::new(DirectoryKind::ExifIfd0);
    let mut gps = Directory::new(DirectoryKind::Gps);

    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        let (directory, name) = match field.tag {
            Tag::DateTimeOriginal => (&mut sub_ifd, TagName::DateOriginal),
            Tag::OffsetTimeOriginal => (&mut sub_ifd, TagName::TzOriginal),
            Tag::DateTimeDigitized => (&mut sub_ifd, TagName::DateDigitized),
            Tag::OffsetTimeDigitized => (&mut sub_ifd, TagName::TzDigitized),
            Tag::DateTime => (&mut ifd0, TagName::DateTime),
            Tag(Context::Tiff, OFFSET_TIME) => (&mut ifd0, TagName::Tz),
            Tag(Context::Tiff, DATE_TIME_ORIGINAL) => (&mut ifd0, TagName::DateOriginal),
            Tag(Context::Tiff, OFFSET_TIME_ORIGINAL) => (&mut ifd0, TagName::TzOriginal),
            Tag::GPSDateStamp => (&mut gps, TagName::DateStamp),
            Tag::GPSTimeStamp => (&mut gps, TagName::TimeStamp),
            _ => continue,
        };
        if let Some(value) = tag_value(&field.value) {
            directory.insert(name, value);
        }
    }

    let mut record = MetadataRecord::new();
    record.push(sub_ifd);
    record.push(ifd0);
    record.push(gps);
    record
}

fn tag_value(value: &Value) -> Option<TagValue> {
    match value {
        Value::Ascii(parts) => {
            let text = String::from_utf8_lossy(parts.first()?);
            let text = text.trim_end_matches('\0').trim();
            (!text.is_empty()).then(|| TagValue::Text(text.to_string()))
        }
        Value::Rational(values) => Some(TagValue::Rationals(
            values.iter().map(|r| Rational::new(r.num, r.denom)).collect(),
        )),
        _ => None,
    }
}
