pub mod parse;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};

use crate::metadata::{Directory, DirectoryKind, MetadataRecord, TagName};

/// Where a resolved date came from, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    ExifSubIfd,
    ExifIfd0,
    Mp4,
    QuickTime,
    Gps,
}

/// The zone attached to a resolved timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// An explicit offset tag accompanied the date.
    Offset(FixedOffset),
    /// No offset was recorded; the system default zone was attached.
    Local,
    Utc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    /// Wall-clock reading in `zone`; names and folders are built from it.
    pub timestamp: DateTime<FixedOffset>,
    pub zone: Zone,
    pub source: DateSource,
}

type Zoned = (DateTime<FixedOffset>, Zone);

/// Signature shared by every source of the resolution chain.
pub type Strategy = fn(&MetadataRecord) -> Option<Zoned>;

/// The resolution chain; the first source that yields a date wins.
pub const STRATEGIES: &[(DateSource, Strategy)] = &[
    (DateSource::ExifSubIfd, exif_sub_ifd),
    (DateSource::ExifIfd0, exif_ifd0),
    (DateSource::Mp4, mp4),
    (DateSource::QuickTime, quicktime),
    (DateSource::Gps, gps),
];

/// Find the creation date of a file from its metadata. Missing or malformed
/// tags only advance the chain; this never fails.
pub fn resolve_creation_date(metadata: &MetadataRecord) -> Option<ResolvedDate> {
    STRATEGIES.iter().find_map(|(source, strategy)| {
        strategy(metadata).map(|(timestamp, zone)| ResolvedDate {
            timestamp,
            zone,
            source: *source,
        })
    })
}

fn exif_sub_ifd(metadata: &MetadataRecord) -> Option<Zoned> {
    let directory = metadata.first(DirectoryKind::ExifSubIfd)?;
    zoned_tag(directory, TagName::DateOriginal, TagName::TzOriginal)
        .or_else(|| zoned_tag(directory, TagName::DateDigitized, TagName::TzDigitized))
}

fn exif_ifd0(metadata: &MetadataRecord) -> Option<Zoned> {
    let directory = metadata.first(DirectoryKind::ExifIfd0)?;
    zoned_tag(directory, TagName::DateTime, TagName::Tz)
        .or_else(|| zoned_tag(directory, TagName::DateOriginal, TagName::TzOriginal))
}

fn mp4(metadata: &MetadataRecord) -> Option<Zoned> {
    container_creation_time(metadata, DirectoryKind::Mp4)
}

fn quicktime(metadata: &MetadataRecord) -> Option<Zoned> {
    container_creation_time(metadata, DirectoryKind::QuickTime)
}

fn gps(metadata: &MetadataRecord) -> Option<Zoned> {
    let directory = metadata.first(DirectoryKind::Gps)?;
    let date = parse::parse_exif_date(directory.text(TagName::DateStamp)?)?;
    let time = parse::parse_gps_time(directory.rationals(TagName::TimeStamp)?)?;
    let utc = Utc.from_utc_datetime(&date.and_time(time));
    Some((utc.fixed_offset(), Zone::Utc))
}

/// Read the date tag as a wall-clock reading in the zone given by the offset
/// tag, or in the local zone when there is no usable offset.
fn zoned_tag(directory: &Directory, date_tag: TagName, tz_tag: TagName) -> Option<Zoned> {
    let naive = parse::parse_exif_datetime(directory.text(date_tag)?)?;
    match directory.text(tz_tag).and_then(parse::parse_offset) {
        Some(offset) => {
            let timestamp = offset.from_local_datetime(&naive).single()?;
            Some((timestamp, Zone::Offset(offset)))
        }
        None => in_local_zone(&naive),
    }
}

/// Ambiguous local times take the earlier instant; times in a DST gap don't exist.
fn in_local_zone(naive: &NaiveDateTime) -> Option<Zoned> {
    let local = Local.from_local_datetime(naive).earliest()?;
    Some((local.fixed_offset(), Zone::Local))
}

fn container_creation_time(metadata: &MetadataRecord, kind: DirectoryKind) -> Option<Zoned> {
    let created = metadata.first(kind)?.instant(TagName::CreationTime)?;
    Some((created.with_timezone(&Local).fixed_offset(), Zone::Local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Rational, TagValue};
    use chrono::{Datelike, NaiveDate, Timelike};

    fn text(s: &str) -> TagValue {
        TagValue::Text(s.to_string())
    }

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_no_metadata() {
        assert!(resolve_creation_date(&MetadataRecord::new()).is_none());
    }

    #[test]
    fn test_sub_ifd_original() {
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::ExifSubIfd)
                .with_tag(TagName::DateOriginal, text("2023:01:01 12:00:00")),
        );

        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.source, DateSource::ExifSubIfd);
        assert_eq!(resolved.zone, Zone::Local);
        assert_eq!(resolved.timestamp.naive_local(), naive(2023, 1, 1, 12, 0, 0));
    }

    #[test]
    fn test_sub_ifd_with_offset_keeps_wall_clock() {
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::ExifSubIfd)
                .with_tag(TagName::DateOriginal, text("2023:01:01 12:00:00"))
                .with_tag(TagName::TzOriginal, text("+02:00")),
        );

        let resolved = resolve_creation_date(&record).unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(resolved.zone, Zone::Offset(offset));
        assert_eq!(*resolved.timestamp.offset(), offset);
        assert_eq!(resolved.timestamp.hour(), 12);
        assert_eq!(resolved.timestamp.with_timezone(&Utc).hour(), 10);
    }

    #[test]
    fn test_malformed_time_falls_through_to_digitized() {
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::ExifSubIfd)
                .with_tag(TagName::DateOriginal, text("2023:01:05 99:99:99"))
                .with_tag(TagName::DateDigitized, text("2018:07:14 09:10:11")),
        );

        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.timestamp.naive_local(), naive(2018, 7, 14, 9, 10, 11));
    }

    #[test]
    fn test_digitized_when_original_missing() {
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::ExifSubIfd)
                .with_tag(TagName::DateOriginal, text("not a date"))
                .with_tag(TagName::DateDigitized, text("2018:07:14 09:10:11"))
                .with_tag(TagName::TzDigitized, text("-04:00")),
        );

        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.source, DateSource::ExifSubIfd);
        assert_eq!(resolved.timestamp.naive_local(), naive(2018, 7, 14, 9, 10, 11));
        assert_eq!(resolved.zone, Zone::Offset(FixedOffset::west_opt(4 * 3600).unwrap()));
    }

    #[test]
    fn test_sub_ifd_beats_ifd0() {
        let record = MetadataRecord::new()
            .with_directory(
                Directory::new(DirectoryKind::ExifIfd0)
                    .with_tag(TagName::DateTime, text("2022:05:05 10:30:00")),
            )
            .with_directory(
                Directory::new(DirectoryKind::ExifSubIfd)
                    .with_tag(TagName::DateOriginal, text("2023:01:01 12:00:00")),
            );

        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.source, DateSource::ExifSubIfd);
        assert_eq!(resolved.timestamp.year(), 2023);
    }

    #[test]
    fn test_ifd0_date_time_then_original() {
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::ExifIfd0)
                .with_tag(TagName::DateTime, text("2022:05:05 10:30:00"))
                .with_tag(TagName::DateOriginal, text("2021:01:01 00:00:00")),
        );
        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.source, DateSource::ExifIfd0);
        assert_eq!(resolved.timestamp.year(), 2022);
        assert_eq!(resolved.timestamp.month(), 5);

        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::ExifIfd0)
                .with_tag(TagName::DateOriginal, text("2021:02:03 04:05:06"))
                .with_tag(TagName::TzOriginal, text("+09:00")),
        );
        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.timestamp.naive_local(), naive(2021, 2, 3, 4, 5, 6));
        assert_eq!(resolved.zone, Zone::Offset(FixedOffset::east_opt(9 * 3600).unwrap()));
    }

    #[test]
    fn test_malformed_offset_falls_back_to_local_zone() {
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::ExifIfd0)
                .with_tag(TagName::DateTime, text("2022:05:05 10:30:00"))
                .with_tag(TagName::Tz, text("CEST")),
        );
        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.zone, Zone::Local);
        assert_eq!(resolved.timestamp.naive_local(), naive(2022, 5, 5, 10, 30, 0));
    }

    #[test]
    fn test_mp4_creation_time_in_local_zone() {
        let created = Utc.with_ymd_and_hms(2021, 3, 3, 15, 45, 0).unwrap();
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::Mp4)
                .with_tag(TagName::CreationTime, TagValue::Instant(created)),
        );

        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.source, DateSource::Mp4);
        assert_eq!(resolved.zone, Zone::Local);
        assert_eq!(resolved.timestamp.with_timezone(&Utc), created);
        assert_eq!(
            resolved.timestamp.naive_local(),
            created.with_timezone(&Local).naive_local()
        );
    }

    #[test]
    fn test_quicktime_after_mp4() {
        let mp4 = Utc.with_ymd_and_hms(2021, 3, 3, 15, 45, 0).unwrap();
        let mov = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let record = MetadataRecord::new()
            .with_directory(
                Directory::new(DirectoryKind::QuickTime)
                    .with_tag(TagName::CreationTime, TagValue::Instant(mov)),
            )
            .with_directory(
                Directory::new(DirectoryKind::Mp4)
                    .with_tag(TagName::CreationTime, TagValue::Instant(mp4)),
            );
        assert_eq!(resolve_creation_date(&record).unwrap().source, DateSource::Mp4);

        let only_mov = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::QuickTime)
                .with_tag(TagName::CreationTime, TagValue::Instant(mov)),
        );
        let resolved = resolve_creation_date(&only_mov).unwrap();
        assert_eq!(resolved.source, DateSource::QuickTime);
        assert_eq!(resolved.timestamp.with_timezone(&Utc), mov);
    }

    #[test]
    fn test_gps_is_utc() {
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::Gps)
                .with_tag(TagName::DateStamp, text("2020:08:08"))
                .with_tag(
                    TagName::TimeStamp,
                    TagValue::Rationals(vec![
                        Rational::new(12, 1),
                        Rational::new(0, 1),
                        Rational::new(0, 1),
                    ]),
                ),
        );

        let resolved = resolve_creation_date(&record).unwrap();
        assert_eq!(resolved.source, DateSource::Gps);
        assert_eq!(resolved.zone, Zone::Utc);
        assert_eq!(resolved.timestamp.year(), 2020);
        assert_eq!(resolved.timestamp.month(), 8);
        assert_eq!(resolved.timestamp.hour(), 12);
        assert_eq!(resolved.timestamp.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_gps_without_time_is_no_match() {
        let record = MetadataRecord::new().with_directory(
            Directory::new(DirectoryKind::Gps).with_tag(TagName::DateStamp, text("2020:08:08")),
        );
        assert!(resolve_creation_date(&record).is_none());
    }

    #[test]
    fn test_chain_order() {
        let order: Vec<DateSource> = STRATEGIES.iter().map(|(source, _)| *source).collect();
        assert_eq!(
            order,
            vec![
                DateSource::ExifSubIfd,
                DateSource::ExifIfd0,
                DateSource::Mp4,
                DateSource::QuickTime,
                DateSource::Gps,
            ]
        );
    }
}
