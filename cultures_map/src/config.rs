// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The column holding the postal code of a record. Mandatory.
pub const POSTAL_CODE_COLUMN: &str = "CODE_POSTAL";
/// The column holding the crop category of a record. Mandatory.
pub const CULTURE_COLUMN: &str = "TYPO_CULTURE";
pub const EMAIL_COLUMN: &str = "EMAIL";
pub const ORGANIZATION_COLUMN: &str = "SOCIETE_OU_ORGANISME";
pub const DEPARTMENT_COLUMN: &str = "DEPARTEMENT";

/// The columns that must be present in every input table.
pub const REQUIRED_COLUMNS: [&str; 2] = [POSTAL_CODE_COLUMN, CULTURE_COLUMN];

/// One validated row of the input table.
///
/// The postal code and the culture are guaranteed to be non-empty.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Record {
    /// Zero-padded postal code (5 characters for all French codes).
    pub postal_code: String,
    pub culture: String,
    pub email: Option<String>,
    pub organization: Option<String>,
    /// The department as entered in the source data: a code or a name.
    pub department: Option<String>,
}

/// The validated content of one input file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RecordTable {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    /// Rows removed because the postal code or the culture was empty.
    pub dropped_rows: usize,
    /// Lines that could not be parsed at all.
    pub malformed_lines: usize,
    /// SHA-256 digest of the bytes this table was loaded from.
    pub digest: String,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct LocatedRecord {
    pub record: Record,
    pub point: GeoPoint,
}

/// The records for which the postal code could be resolved.
#[derive(PartialEq, Debug, Clone)]
pub struct LocatedTable {
    pub records: Vec<LocatedRecord>,
    /// Records dropped because no coordinate was found for their postal code.
    pub unresolved: usize,
}

/// The columns by which the records can be grouped.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum GroupField {
    Culture,
    Department,
    Organization,
    PostalCode,
    Email,
}

impl GroupField {
    pub const ALL: [GroupField; 5] = [
        GroupField::Culture,
        GroupField::Department,
        GroupField::Organization,
        GroupField::PostalCode,
        GroupField::Email,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            GroupField::Culture => CULTURE_COLUMN,
            GroupField::Department => DEPARTMENT_COLUMN,
            GroupField::Organization => ORGANIZATION_COLUMN,
            GroupField::PostalCode => POSTAL_CODE_COLUMN,
            GroupField::Email => EMAIL_COLUMN,
        }
    }

    pub fn from_column(name: &str) -> Option<GroupField> {
        GroupField::ALL.iter().find(|f| f.column() == name).copied()
    }

    /// The value of this field for the given record, if any.
    pub fn value<'a>(&self, record: &'a Record) -> Option<&'a str> {
        match self {
            GroupField::Culture => Some(record.culture.as_str()),
            GroupField::PostalCode => Some(record.postal_code.as_str()),
            GroupField::Department => record.department.as_deref(),
            GroupField::Organization => record.organization.as_deref(),
            GroupField::Email => record.email.as_deref(),
        }
    }
}

/// The statistic computed for each group.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Metric {
    /// The number of records in the group.
    RecordCount,
    /// The number of distinct cultures in the group.
    DistinctCultures,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::RecordCount => "Nb. d'enregistrements",
            Metric::DistinctCultures => "Nb. de cultures distinctes",
        }
    }

    /// Accepts the display label or a short identifier.
    pub fn parse(s: &str) -> Option<Metric> {
        match s {
            "count" | "records" | "Nb. d'enregistrements" => Some(Metric::RecordCount),
            "distinct" | "distinctCultures" | "Nb. de cultures distinctes" => {
                Some(Metric::DistinctCultures)
            }
            _ => None,
        }
    }
}

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregatedRow {
    pub key: String,
    pub value: u64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DepartmentRow {
    pub code: String,
    /// The name from the reference, when the code is known.
    pub name: Option<String>,
    pub value: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DepartmentAggregation {
    pub rows: Vec<DepartmentRow>,
    /// Records whose department label matched neither a code nor a name.
    pub unresolved_labels: usize,
    /// Records without a department label.
    pub missing_labels: usize,
    /// Codes accepted by pattern but absent from the reference.
    pub unknown_codes: usize,
}

/// What was dropped along the way, for each reason.
///
/// A record can be counted under several reasons: `excluded_records` counts each one once.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ExclusionReport {
    pub malformed_lines: usize,
    pub missing_required: usize,
    pub unresolved_postal_codes: usize,
    /// Department labels that are present but match neither a code nor a name.
    pub unresolved_departments: usize,
    pub unknown_department_codes: usize,
    /// Records without a department label. They are only missing from the department map.
    pub missing_departments: usize,
    /// Validated records left out of the point map or of the department map.
    pub excluded_records: usize,
}

impl ExclusionReport {
    /// Input rows that did not make it into every chart: lines rejected at load time, then
    /// validated records excluded for at least one reason.
    pub fn total_rows(&self) -> usize {
        self.malformed_lines + self.missing_required + self.excluded_records
    }
}

/// Errors that prevent the pipeline from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum MapErrors {
    /// The input lacks some required columns (all of them are listed).
    MissingColumns(Vec<String>),
    InvalidSetting(String),
    /// The geocoding reference could not answer the batch.
    Geocoding(String),
}

impl Error for MapErrors {}

impl Display for MapErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapErrors::MissingColumns(cols) => {
                write!(f, "Missing required column(s): {}", cols.join(", "))
            }
            MapErrors::InvalidSetting(msg) => write!(f, "Invalid setting: {}", msg),
            MapErrors::Geocoding(msg) => write!(f, "Geocoding failed: {}", msg),
        }
    }
}

// ********* Settings **********

#[derive(PartialEq, Debug, Clone)]
pub struct MapSettings {
    /// Between 0.0 and 1.0
    pub opacity: f64,
    pub marker_size: f64,
    pub zoom: f64,
    pub height: u32,
    pub map_style: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        MapSettings {
            opacity: 0.5,
            marker_size: 8.0,
            zoom: 4.0,
            height: 600,
            map_style: "open-street-map".to_string(),
        }
    }
}

/// Settings of one pie or bar chart.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategorySettings {
    pub field: GroupField,
    pub metric: Metric,
    /// The maximum number of groups displayed. Clamped to the number of distinct values.
    pub max_items: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ChoroplethSettings {
    pub metric: Metric,
    pub opacity: f64,
    pub zoom: f64,
    pub height: u32,
    pub map_style: String,
}

impl Default for ChoroplethSettings {
    fn default() -> Self {
        ChoroplethSettings {
            metric: Metric::DistinctCultures,
            opacity: 0.5,
            zoom: 4.5,
            height: 600,
            map_style: "open-street-map".to_string(),
        }
    }
}

/// Everything the chart stage needs to know. Sections set to `None` (or empty) are not drawn.
#[derive(PartialEq, Debug, Clone)]
pub struct DashboardSettings {
    pub title: String,
    pub map: Option<MapSettings>,
    pub categories: Vec<CategorySettings>,
    pub culture_filter: Option<String>,
    pub choropleth: Option<ChoroplethSettings>,
}

impl DashboardSettings {
    pub fn validate(&self) -> Result<(), MapErrors> {
        let opacities = self
            .map
            .iter()
            .map(|m| m.opacity)
            .chain(self.choropleth.iter().map(|c| c.opacity));
        for o in opacities {
            if !(0.0..=1.0).contains(&o) {
                return Err(MapErrors::InvalidSetting(format!(
                    "opacity must be between 0.0 and 1.0, got {}",
                    o
                )));
            }
        }
        if let Some(m) = &self.map {
            if m.marker_size <= 0.0 || m.zoom < 0.0 {
                return Err(MapErrors::InvalidSetting(format!(
                    "marker size must be positive and zoom non-negative, got {} and {}",
                    m.marker_size, m.zoom
                )));
            }
        }
        if let Some(c) = self.categories.iter().find(|c| c.max_items == 0) {
            return Err(MapErrors::InvalidSetting(format!(
                "at least one item must be displayed for {}",
                c.field.column()
            )));
        }
        Ok(())
    }
}
