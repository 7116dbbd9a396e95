mod config;
use log::{debug, info, warn};

use std::collections::{BTreeMap, BTreeSet, HashSet};

pub mod builder;
pub mod charts;
pub mod departments;
pub mod manual;

pub use crate::config::*;

use crate::charts::ChartSpec;
use crate::departments::{aggregate_departments, DepartmentReference};

/// A reference that maps postal codes to coordinates.
///
/// Implementations answer a whole batch at once. The answer is parallel to the query: one entry
/// per postal code, `None` when the code is not known.
pub trait Geocoder {
    fn query_postal_codes(
        &self,
        postal_codes: &[String],
    ) -> Result<Vec<Option<GeoPoint>>, MapErrors>;
}

/// The SHA-256 digest of some content, in hexadecimal.
///
/// Used as the identity of an input for caching purposes.
pub fn content_digest(content: &[u8]) -> String {
    sha256::digest(content)
}

/// Attaches coordinates to the records.
///
/// Records whose postal code cannot be resolved are dropped.
pub fn locate_records(
    records: &[Record],
    geocoder: &dyn Geocoder,
) -> Result<LocatedTable, MapErrors> {
    let postal_codes: Vec<String> = records.iter().map(|r| r.postal_code.clone()).collect();
    let points = geocoder.query_postal_codes(&postal_codes)?;
    if points.len() != records.len() {
        return Err(MapErrors::Geocoding(format!(
            "expected {} coordinates, got {}",
            records.len(),
            points.len()
        )));
    }

    let mut located: Vec<LocatedRecord> = Vec::new();
    let mut unresolved = 0;
    for (r, p) in records.iter().zip(points) {
        match p {
            Some(point) if point.is_finite() => located.push(LocatedRecord {
                record: r.clone(),
                point,
            }),
            _ => {
                debug!("locate_records: no coordinates for {:?}", r.postal_code);
                unresolved += 1;
            }
        }
    }
    if unresolved > 0 {
        warn!(
            "locate_records: {} records dropped (unknown postal codes)",
            unresolved
        );
    }
    Ok(LocatedTable {
        records: located,
        unresolved,
    })
}

/// Groups the records by the given field and computes the metric for each group.
///
/// Groups come in ascending key order, and only the first `max_items` are kept. They are not
/// ordered by value. Records without a value for the field are ignored.
pub fn aggregate(
    records: &[Record],
    field: GroupField,
    metric: Metric,
    max_items: Option<usize>,
) -> Vec<AggregatedRow> {
    let mut groups: BTreeMap<&str, (u64, BTreeSet<&str>)> = BTreeMap::new();
    for r in records.iter() {
        if let Some(key) = field.value(r) {
            let e = groups.entry(key).or_default();
            e.0 += 1;
            e.1.insert(r.culture.as_str());
        }
    }
    groups
        .into_iter()
        .take(max_items.unwrap_or(usize::MAX))
        .map(|(key, (count, cultures))| AggregatedRow {
            key: key.to_string(),
            value: match metric {
                Metric::RecordCount => count,
                Metric::DistinctCultures => cultures.len() as u64,
            },
        })
        .collect()
}

/// The number of distinct values taken by a field.
pub fn distinct_values(records: &[Record], field: GroupField) -> usize {
    records
        .iter()
        .filter_map(|r| field.value(r))
        .collect::<HashSet<&str>>()
        .len()
}

/// Bounds the number of displayed items by the number of distinct values (and at least 1).
pub fn clamp_max_items(records: &[Record], field: GroupField, max_items: usize) -> usize {
    max_items.min(distinct_values(records, field)).max(1)
}

/// Keeps the records of one culture. No filter keeps everything.
pub fn filter_culture<T, F>(items: &[T], culture: Option<&str>, get: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> &Record,
{
    match culture {
        None => items.to_vec(),
        Some(c) => items.iter().filter(|x| get(x).culture == c).cloned().collect(),
    }
}

/// The charts of one render pass, with the accounting of what was left out.
#[derive(PartialEq, Debug, Clone)]
pub struct Dashboard {
    pub title: String,
    pub charts: Vec<ChartSpec>,
    pub excluded: ExclusionReport,
}

/// Builds all the charts requested by the settings.
///
/// The department map is only drawn if a reference is available.
pub fn build_dashboard(
    table: &RecordTable,
    located: &LocatedTable,
    reference: Option<&DepartmentReference>,
    settings: &DashboardSettings,
) -> Result<Dashboard, MapErrors> {
    settings.validate()?;
    info!(
        "build_dashboard: {} records, {} located, filter: {:?}",
        table.records.len(),
        located.records.len(),
        settings.culture_filter
    );

    let filter = settings.culture_filter.as_deref();
    let records = filter_culture(&table.records, filter, |r| r);
    let located_records = filter_culture(&located.records, filter, |lr| &lr.record);

    // Geocoding only depends on the postal code.
    let located_codes: HashSet<&str> = located_records
        .iter()
        .map(|lr| lr.record.postal_code.as_str())
        .collect();
    let is_located = |r: &Record| located_codes.contains(r.postal_code.as_str());

    let mut excluded = ExclusionReport {
        malformed_lines: table.malformed_lines,
        missing_required: table.dropped_rows,
        unresolved_postal_codes: records.iter().filter(|r| !is_located(*r)).count(),
        ..ExclusionReport::default()
    };

    let mut charts: Vec<ChartSpec> = Vec::new();
    if let Some(map_settings) = &settings.map {
        charts.push(charts::scatter_map(
            &settings.title,
            &located_records,
            map_settings,
        ));
    }

    for cs in settings.categories.iter() {
        let max_items = clamp_max_items(&records, cs.field, cs.max_items);
        let rows = aggregate(&records, cs.field, cs.metric, Some(max_items));
        debug!(
            "build_dashboard: {:?} grouped into {} rows",
            cs.field,
            rows.len()
        );
        charts.push(charts::pie(&rows, cs.field, cs.metric));
        charts.push(charts::bar(&rows, cs.field, cs.metric));
    }

    if let (Some(cs), Some(r)) = (&settings.choropleth, reference) {
        let agg = aggregate_departments(&records, r, cs.metric);
        if agg.unresolved_labels > 0 || agg.unknown_codes > 0 {
            warn!(
                "build_dashboard: {} department labels unresolved, {} codes unknown to the reference",
                agg.unresolved_labels, agg.unknown_codes
            );
        }
        excluded.unresolved_departments = agg.unresolved_labels;
        excluded.missing_departments = agg.missing_labels;
        excluded.unknown_department_codes = agg.unknown_codes;
        charts.push(charts::choropleth(&agg.rows, cs));
    }

    let with_map = settings.map.is_some();
    let department_ref = settings.choropleth.as_ref().and(reference);
    excluded.excluded_records = records
        .iter()
        .filter(|r| {
            let off_map = with_map && !is_located(*r);
            let off_departments = match (department_ref, r.department.as_deref()) {
                (Some(dr), Some(label)) => dr.resolve(label).is_none(),
                _ => false,
            };
            off_map || off_departments
        })
        .count();

    Ok(Dashboard {
        title: settings.title.clone(),
        charts,
        excluded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TableGeocoder(HashMap<String, GeoPoint>);

    impl Geocoder for TableGeocoder {
        fn query_postal_codes(
            &self,
            postal_codes: &[String],
        ) -> Result<Vec<Option<GeoPoint>>, MapErrors> {
            Ok(postal_codes.iter().map(|c| self.0.get(c).copied()).collect())
        }
    }

    struct BrokenGeocoder;

    impl Geocoder for BrokenGeocoder {
        fn query_postal_codes(&self, _: &[String]) -> Result<Vec<Option<GeoPoint>>, MapErrors> {
            Err(MapErrors::Geocoding("reference unavailable".to_string()))
        }
    }

    fn record(postal_code: &str, culture: &str, department: Option<&str>) -> Record {
        Record {
            postal_code: postal_code.to_string(),
            culture: culture.to_string(),
            email: None,
            organization: None,
            department: department.map(|s| s.to_string()),
        }
    }

    fn table(records: Vec<Record>) -> RecordTable {
        RecordTable {
            columns: vec![],
            records,
            dropped_rows: 1,
            malformed_lines: 2,
            digest: "test".to_string(),
        }
    }

    fn geocoder() -> TableGeocoder {
        let mut m = HashMap::new();
        m.insert(
            "75001".to_string(),
            GeoPoint {
                latitude: 48.86,
                longitude: 2.34,
            },
        );
        m.insert(
            "33000".to_string(),
            GeoPoint {
                latitude: 44.84,
                longitude: -0.58,
            },
        );
        m.insert(
            "99999".to_string(),
            GeoPoint {
                latitude: f64::NAN,
                longitude: f64::NAN,
            },
        );
        TableGeocoder(m)
    }

    #[test]
    fn unresolved_postal_codes_are_dropped() {
        let _ = env_logger::try_init();
        let records = vec![
            record("75001", "A", None),
            record("00000", "B", None),
            record("33000", "C", None),
            record("99999", "D", None),
        ];
        let located = locate_records(&records, &geocoder()).unwrap();
        assert_eq!(located.records.len(), 2);
        assert_eq!(located.unresolved, 2);
        assert!(located.records.iter().all(|lr| lr.point.is_finite()));
    }

    #[test]
    fn geocoder_failure_is_propagated() {
        let records = vec![record("75001", "A", None)];
        let res = locate_records(&records, &BrokenGeocoder);
        assert!(matches!(res, Err(MapErrors::Geocoding(_))));
    }

    #[test]
    fn count_and_distinct_metrics() {
        let records: Vec<Record> = ["A", "A", "B", "C", "C", "C"]
            .iter()
            .map(|c| record("75001", c, Some("Paris")))
            .collect();
        let distinct = aggregate(
            &records,
            GroupField::Department,
            Metric::DistinctCultures,
            None,
        );
        let count = aggregate(&records, GroupField::Department, Metric::RecordCount, None);
        assert_eq!(
            distinct,
            vec![AggregatedRow {
                key: "Paris".to_string(),
                value: 3
            }]
        );
        assert_eq!(count[0].value, 6);
    }

    #[test]
    fn truncation_keeps_grouping_order() {
        let records = vec![
            record("75001", "Vigne", None),
            record("75001", "Vigne", None),
            record("75001", "Vigne", None),
            record("75001", "Arboriculture", None),
            record("75001", "Maraichage", None),
            record("75001", "Maraichage", None),
        ];
        let rows = aggregate(&records, GroupField::Culture, Metric::RecordCount, Some(2));
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["Arboriculture", "Maraichage"]);
        assert_eq!(distinct_values(&records, GroupField::Culture), 3);
        assert_eq!(clamp_max_items(&records, GroupField::Culture, 10), 3);
        assert_eq!(clamp_max_items(&records, GroupField::Department, 10), 1);
    }

    #[test]
    fn full_dashboard() {
        let records = vec![
            record("75001", "A", Some("75")),
            record("75001", "B", Some("Paris")),
            record("33000", "A", Some("Gironde")),
            record("00000", "A", Some("Nowhere")),
        ];
        let t = table(records);
        let located = locate_records(&t.records, &geocoder()).unwrap();
        let reference = DepartmentReference::new(vec![("75", "Paris"), ("33", "Gironde")]);
        let settings = DashboardSettings {
            title: "Carte".to_string(),
            map: Some(MapSettings::default()),
            categories: vec![CategorySettings {
                field: GroupField::Culture,
                metric: Metric::RecordCount,
                max_items: 10,
            }],
            culture_filter: None,
            choropleth: Some(ChoroplethSettings::default()),
        };
        let d = build_dashboard(&t, &located, Some(&reference), &settings).unwrap();
        let kinds: Vec<&str> = d.charts.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec!["scatter_map", "pie", "bar", "choropleth"]);
        assert_eq!(
            d.excluded,
            ExclusionReport {
                malformed_lines: 2,
                missing_required: 1,
                unresolved_postal_codes: 1,
                unresolved_departments: 1,
                unknown_department_codes: 0,
                missing_departments: 0,
                excluded_records: 1,
            }
        );
        assert_eq!(d.excluded.total_rows(), 4);

        // Without a reference, the department map is left out.
        let d2 = build_dashboard(&t, &located, None, &settings).unwrap();
        assert_eq!(d2.charts.len(), 3);
    }

    fn department_settings() -> DashboardSettings {
        DashboardSettings {
            title: "Carte".to_string(),
            map: Some(MapSettings::default()),
            categories: vec![],
            culture_filter: None,
            choropleth: Some(ChoroplethSettings::default()),
        }
    }

    #[test]
    fn excluded_records_are_counted_once() {
        let mut t = table(vec![
            record("00000", "A", Some("Atlantis")),
            record("75001", "B", None),
        ]);
        t.dropped_rows = 0;
        t.malformed_lines = 0;
        let located = locate_records(&t.records, &geocoder()).unwrap();
        let reference = DepartmentReference::new(vec![("75", "Paris")]);
        let d = build_dashboard(&t, &located, Some(&reference), &department_settings()).unwrap();
        assert_eq!(d.excluded.unresolved_postal_codes, 1);
        assert_eq!(d.excluded.unresolved_departments, 1);
        assert_eq!(d.excluded.missing_departments, 1);
        assert_eq!(d.excluded.excluded_records, 1);
        assert_eq!(d.excluded.total_rows(), 1);
    }

    #[test]
    fn no_department_labels_exclude_nothing() {
        let mut t = table(vec![
            record("75001", "A", None),
            record("33000", "B", None),
        ]);
        t.dropped_rows = 0;
        t.malformed_lines = 0;
        let located = locate_records(&t.records, &geocoder()).unwrap();
        let reference = DepartmentReference::new(vec![("75", "Paris"), ("33", "Gironde")]);
        let d = build_dashboard(&t, &located, Some(&reference), &department_settings()).unwrap();
        assert_eq!(d.excluded.unresolved_departments, 0);
        assert_eq!(d.excluded.missing_departments, 2);
        assert_eq!(d.excluded.total_rows(), 0);
    }

    #[test]
    fn culture_filter_applies_to_all_charts() {
        let records = vec![
            record("75001", "A", Some("75")),
            record("33000", "B", Some("33")),
        ];
        let t = table(records);
        let located = locate_records(&t.records, &geocoder()).unwrap();
        let settings = DashboardSettings {
            title: "Carte".to_string(),
            map: Some(MapSettings::default()),
            categories: vec![CategorySettings {
                field: GroupField::Department,
                metric: Metric::RecordCount,
                max_items: 5,
            }],
            culture_filter: Some("B".to_string()),
            choropleth: None,
        };
        let d = build_dashboard(&t, &located, None, &settings).unwrap();
        match &d.charts[0] {
            ChartSpec::ScatterMap(m) => {
                assert_eq!(m.traces.len(), 1);
                assert_eq!(m.traces[0].name, "B");
            }
            x => panic!("unexpected chart {:?}", x),
        }
        match &d.charts[1] {
            ChartSpec::Pie(p) => assert_eq!(p.labels, vec!["33".to_string()]),
            x => panic!("unexpected chart {:?}", x),
        }
    }

    #[test]
    fn invalid_opacity() {
        let t = table(vec![]);
        let located = LocatedTable {
            records: vec![],
            unresolved: 0,
        };
        let settings = DashboardSettings {
            title: "Carte".to_string(),
            map: Some(MapSettings {
                opacity: 1.5,
                ..MapSettings::default()
            }),
            categories: vec![],
            culture_filter: None,
            choropleth: None,
        };
        let res = build_dashboard(&t, &located, None, &settings);
        assert!(matches!(res, Err(MapErrors::InvalidSetting(_))));
    }
}
