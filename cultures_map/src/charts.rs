//! Chart builders.
//!
//! Every builder is a pure function of its inputs: the same table and the same settings always
//! produce the same chart. They only describe the charts; drawing them is left to the caller.

use std::collections::BTreeMap;

use crate::config::*;

/// Center used for the department map, roughly the middle of metropolitan France.
pub const FRANCE_CENTER: GeoPoint = GeoPoint {
    latitude: 46.6,
    longitude: 2.4,
};

/// The points of one culture.
#[derive(PartialEq, Debug, Clone)]
pub struct MapTrace {
    pub name: String,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub hover: Vec<String>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ScatterMapChart {
    pub title: String,
    pub traces: Vec<MapTrace>,
    pub center: Option<GeoPoint>,
    pub settings: MapSettings,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PieChart {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<String>,
    pub y: Vec<u64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ChoroplethChart {
    pub title: String,
    /// Department codes, matched against `feature_id_key` in the boundaries.
    pub locations: Vec<String>,
    pub values: Vec<u64>,
    pub names: Vec<String>,
    pub feature_id_key: String,
    pub center: GeoPoint,
    pub settings: ChoroplethSettings,
}

#[derive(PartialEq, Debug, Clone)]
pub enum ChartSpec {
    ScatterMap(ScatterMapChart),
    Pie(PieChart),
    Bar(BarChart),
    Choropleth(ChoroplethChart),
}

impl ChartSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ChartSpec::ScatterMap(_) => "scatter_map",
            ChartSpec::Pie(_) => "pie",
            ChartSpec::Bar(_) => "bar",
            ChartSpec::Choropleth(_) => "choropleth",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ChartSpec::ScatterMap(c) => &c.title,
            ChartSpec::Pie(c) => &c.title,
            ChartSpec::Bar(c) => &c.title,
            ChartSpec::Choropleth(c) => &c.title,
        }
    }
}

/// One trace per culture, in culture order. The map is centered on the mean position.
pub fn scatter_map(title: &str, records: &[LocatedRecord], settings: &MapSettings) -> ChartSpec {
    let mut traces: BTreeMap<&str, MapTrace> = BTreeMap::new();
    for lr in records.iter() {
        let t = traces
            .entry(lr.record.culture.as_str())
            .or_insert_with(|| MapTrace {
                name: lr.record.culture.clone(),
                latitudes: Vec::new(),
                longitudes: Vec::new(),
                hover: Vec::new(),
            });
        t.latitudes.push(lr.point.latitude);
        t.longitudes.push(lr.point.longitude);
        t.hover.push(lr.record.culture.clone());
    }

    let center = if records.is_empty() {
        None
    } else {
        let n = records.len() as f64;
        Some(GeoPoint {
            latitude: records.iter().map(|r| r.point.latitude).sum::<f64>() / n,
            longitude: records.iter().map(|r| r.point.longitude).sum::<f64>() / n,
        })
    };

    ChartSpec::ScatterMap(ScatterMapChart {
        title: title.to_string(),
        traces: traces.into_values().collect(),
        center,
        settings: settings.clone(),
    })
}

fn category_title(field: GroupField, metric: Metric) -> String {
    format!("{} par {}", metric.label(), field.column())
}

pub fn pie(rows: &[AggregatedRow], field: GroupField, metric: Metric) -> ChartSpec {
    ChartSpec::Pie(PieChart {
        title: category_title(field, metric),
        labels: rows.iter().map(|r| r.key.clone()).collect(),
        values: rows.iter().map(|r| r.value).collect(),
    })
}

pub fn bar(rows: &[AggregatedRow], field: GroupField, metric: Metric) -> ChartSpec {
    ChartSpec::Bar(BarChart {
        title: category_title(field, metric),
        x_label: field.column().to_string(),
        y_label: metric.label().to_string(),
        x: rows.iter().map(|r| r.key.clone()).collect(),
        y: rows.iter().map(|r| r.value).collect(),
    })
}

/// Departments unknown to the reference are kept, labelled with their code.
pub fn choropleth(rows: &[DepartmentRow], settings: &ChoroplethSettings) -> ChartSpec {
    ChartSpec::Choropleth(ChoroplethChart {
        title: format!("{} par département", settings.metric.label()),
        locations: rows.iter().map(|r| r.code.clone()).collect(),
        values: rows.iter().map(|r| r.value).collect(),
        names: rows
            .iter()
            .map(|r| r.name.clone().unwrap_or_else(|| r.code.clone()))
            .collect(),
        feature_id_key: "properties.code".to_string(),
        center: FRANCE_CENTER,
        settings: settings.clone(),
    })
}
