use crate::aggregate::types::{
    AggregatedRecord, Coord, DailyVolume, DayKey, MonthKey, MonthlyVolume, YearKey,
};
use crate::aggregate::utility::mean;
use crate::geocode::GeocodedRecord;
use crate::loader::is_missing;
use std::collections::BTreeMap;
use tracing::debug;

/// Which columns survive into the final group-by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalKeySet {
    /// RequestID, Boro, Yr, HH, SegmentID, street, fromSt, toSt, Direction, position.
    WithCrossStreets,
    /// RequestID, Yr, HH, SegmentID, street, Direction, position.
    WithoutCrossStreets,
}

/// First pass: sums `Vol` per location, day and hour.
///
/// Records with a blank or NA-token key column are left out, matching how a dataframe
/// group-by skips missing keys. Output is in ascending key order.
pub fn sum_by_day(records: &[GeocodedRecord]) -> Vec<DailyVolume> {
    let mut groups: BTreeMap<DayKey, i64> = BTreeMap::new();
    let mut missing_keys = 0usize;

    for record in records {
        let Some(key) = day_key(record) else {
            missing_keys += 1;
            continue;
        };
        *groups.entry(key).or_default() += record.raw.vol;
    }

    if missing_keys > 0 {
        debug!(missing_keys, "Records with blank key columns skipped");
    }

    groups
        .into_iter()
        .map(|(key, vol)| DailyVolume { key, vol })
        .collect()
}

/// Second pass: averages the daily sums across days of the same month.
pub fn mean_across_days(daily: &[DailyVolume]) -> Vec<MonthlyVolume> {
    let mut groups: BTreeMap<MonthKey, Vec<f64>> = BTreeMap::new();

    for row in daily {
        let k = &row.key;
        let key = MonthKey {
            request_id: k.request_id,
            boro: k.boro.clone(),
            year: k.year,
            month: k.month,
            hour: k.hour,
            segment_id: k.segment_id,
            street: k.street.clone(),
            from_st: k.from_st.clone(),
            to_st: k.to_st.clone(),
            direction: k.direction.clone(),
            latitude: k.latitude,
            longitude: k.longitude,
        };
        groups.entry(key).or_default().push(row.vol as f64);
    }

    groups
        .into_iter()
        .map(|(key, series)| MonthlyVolume {
            key,
            vol: mean(&series),
        })
        .collect()
}

/// Final pass: averages the monthly means across months of the same year.
pub fn mean_across_months(monthly: &[MonthlyVolume], key_set: FinalKeySet) -> Vec<AggregatedRecord> {
    let keep = key_set == FinalKeySet::WithCrossStreets;
    let mut groups: BTreeMap<YearKey, Vec<f64>> = BTreeMap::new();

    for row in monthly {
        let k = &row.key;
        let key = YearKey {
            request_id: k.request_id,
            boro: keep.then(|| k.boro.clone()),
            year: k.year,
            hour: k.hour,
            segment_id: k.segment_id,
            street: k.street.clone(),
            from_st: keep.then(|| k.from_st.clone()),
            to_st: keep.then(|| k.to_st.clone()),
            direction: k.direction.clone(),
            latitude: k.latitude,
            longitude: k.longitude,
        };
        groups.entry(key).or_default().push(row.vol);
    }

    groups
        .into_iter()
        .map(|(key, series)| AggregatedRecord::from_key(key, mean(&series)))
        .collect()
}

fn key_text(value: Option<&str>) -> Option<String> {
    value.filter(|v| !is_missing(v)).map(str::to_string)
}

fn day_key(record: &GeocodedRecord) -> Option<DayKey> {
    let raw = &record.raw;
    Some(DayKey {
        request_id: raw.request_id,
        boro: key_text(raw.boro.as_deref())?,
        year: raw.year,
        month: raw.month,
        day: raw.day,
        hour: raw.hour,
        segment_id: raw.segment_id,
        street: key_text(raw.street.as_deref())?,
        from_st: key_text(raw.from_st.as_deref())?,
        to_st: key_text(raw.to_st.as_deref())?,
        direction: key_text(raw.direction.as_deref())?,
        latitude: Coord(record.position.latitude),
        longitude: Coord(record.position.longitude),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::LatLon;
    use crate::loader::{RawRecord, read_records};

    fn reading(month: u32, day: u32, hour: u32, vol: i64) -> GeocodedRecord {
        GeocodedRecord {
            raw: RawRecord {
                request_id: 1,
                boro: Some("X".to_string()),
                year: 2022,
                month,
                day,
                hour,
                segment_id: 77,
                street: Some("MAIN ST".to_string()),
                from_st: Some("1 AVE".to_string()),
                to_st: Some("2 AVE".to_string()),
                direction: Some("NB".to_string()),
                wkt_geom: None,
                vol,
            },
            position: LatLon {
                latitude: 40.7,
                longitude: -73.9,
            },
        }
    }

    #[test]
    fn test_two_days_average_to_fifteen() {
        let records = vec![reading(1, 1, 8, 10), reading(1, 2, 8, 20)];

        let daily = sum_by_day(&records);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].vol, 10);
        assert_eq!(daily[1].vol, 20);

        let monthly = mean_across_days(&daily);
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].vol, 15.0);
    }

    #[test]
    fn test_readings_within_an_hour_are_summed() {
        // Four quarter-hour readings on the same day and hour.
        let records = vec![
            reading(1, 1, 8, 5),
            reading(1, 1, 8, 6),
            reading(1, 1, 8, 7),
            reading(1, 1, 8, 8),
        ];
        let daily = sum_by_day(&records);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].vol, 26);
    }

    #[test]
    fn test_nested_mean_differs_from_flat_mean() {
        // January: days of 10 and 20 -> 15. February: one day of 60 -> 60.
        let records = vec![reading(1, 1, 8, 10), reading(1, 2, 8, 20), reading(2, 1, 8, 60)];

        let monthly = mean_across_days(&sum_by_day(&records));
        let yearly = mean_across_months(&monthly, FinalKeySet::WithCrossStreets);

        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].vol, 37.5);
        // A flat mean over the three days would be 30.
        assert_ne!(yearly[0].vol, 30.0);
    }

    #[test]
    fn test_hours_stay_separate() {
        let records = vec![reading(1, 1, 8, 10), reading(1, 1, 9, 40)];
        let monthly = mean_across_days(&sum_by_day(&records));
        let yearly = mean_across_months(&monthly, FinalKeySet::WithCrossStreets);
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[0].hour, 8);
        assert_eq!(yearly[1].hour, 9);
    }

    #[test]
    fn test_blank_key_column_is_skipped() {
        let mut blank = reading(1, 1, 8, 100);
        blank.raw.from_st = None;
        let records = vec![reading(1, 1, 8, 10), blank];

        let daily = sum_by_day(&records);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].vol, 10);
    }

    #[test]
    fn test_na_token_key_column_is_skipped() {
        let csv = "\
RequestID,Boro,Yr,M,D,HH,Vol,SegmentID,WktGeom,street,fromSt,toSt,Direction
1,X,2022,1,1,8,10,77,,MAIN ST,1 AVE,2 AVE,NB
1,X,2022,1,1,8,100,77,,MAIN ST,N/A,NULL,NB
";
        let loaded: Vec<GeocodedRecord> = read_records(csv.as_bytes(), None)
            .unwrap()
            .into_iter()
            .map(|raw| GeocodedRecord {
                raw,
                position: LatLon {
                    latitude: 40.7,
                    longitude: -73.9,
                },
            })
            .collect();

        let daily = sum_by_day(&loaded);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].vol, 10);

        // Records built in memory are held to the same rule.
        let mut token = reading(1, 1, 8, 100);
        token.raw.from_st = Some("N/A".to_string());
        let daily = sum_by_day(&[reading(1, 1, 8, 10), token]);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].vol, 10);
    }

    #[test]
    fn test_key_set_without_cross_streets_merges_rows() {
        let mut other = reading(1, 1, 8, 30);
        other.raw.from_st = Some("3 AVE".to_string());
        let records = vec![reading(1, 1, 8, 10), other];
        let monthly = mean_across_days(&sum_by_day(&records));
        assert_eq!(monthly.len(), 2);

        let with = mean_across_months(&monthly, FinalKeySet::WithCrossStreets);
        assert_eq!(with.len(), 2);
        assert_eq!(with[0].from_st.as_deref(), Some("1 AVE"));

        let without = mean_across_months(&monthly, FinalKeySet::WithoutCrossStreets);
        assert_eq!(without.len(), 1);
        assert_eq!(without[0].vol, 20.0);
        assert!(without[0].boro.is_none());
        assert!(without[0].from_st.is_none());
        assert!(without[0].to_st.is_none());
    }
}
