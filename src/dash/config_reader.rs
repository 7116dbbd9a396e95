use crate::dash::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 4;
pub const DEFAULT_TITLE: &str = "Carte des cultures agricoles en France";
pub const DEFAULT_DEPARTMENTS_URL: &str =
    "https://raw.githubusercontent.com/gregoiredavid/france-geojson/master/departements.geojson";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_MAX_ITEMS: usize = 10;

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSettings {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    pub provider: Option<String>,
    pub delimiter: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocoderSettings {
    pub country: Option<String>,
    #[serde(rename = "referencePath")]
    pub reference_path: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepartmentSettings {
    pub url: Option<String>,
    /// A local copy of the boundaries. Takes precedence over the URL.
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "timeoutSeconds")]
    pub timeout_seconds: Option<u64>,
    pub metric: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapConfig {
    pub opacity: Option<f64>,
    #[serde(rename = "markerSize")]
    pub marker_size: Option<f64>,
    pub zoom: Option<f64>,
    pub height: Option<u32>,
    #[serde(rename = "mapStyle")]
    pub map_style: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartsConfig {
    pub variables: Option<Vec<String>>,
    pub metric: Option<String>,
    #[serde(rename = "maxItems")]
    pub max_items: Option<usize>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "htmlPath")]
    pub html_path: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub version: Option<u32>,
    pub title: Option<String>,
    #[serde(default)]
    pub input: InputSettings,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub departments: DepartmentSettings,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
    #[serde(rename = "cultureFilter")]
    pub culture_filter: Option<String>,
    #[serde(default)]
    pub output: OutputSettings,
}

/// The way the input bytes are decoded.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum InputFormat {
    Csv { delimiter: u8 },
    Xlsx { worksheet: Option<String> },
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum DepartmentLocation {
    Url { url: String, timeout: Duration },
    File(PathBuf),
}

/// A configuration that has been checked and turned into settings.
#[derive(PartialEq, Debug, Clone)]
pub struct ValidatedConfig {
    pub version: u32,
    pub settings: DashboardSettings,
    pub input_path: String,
    pub input_format: InputFormat,
    pub geonames_path: String,
    pub country: String,
    pub departments: DepartmentLocation,
    pub output_path: Option<String>,
    pub html_path: Option<String>,
}

/// Reads the configuration file. Relative paths inside the file are resolved against its directory.
pub fn read_config(path: &str) -> DashResult<DashboardConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let mut config: DashboardConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);

    let root = Path::new(path).parent().context(MissingParentDirSnafu {})?;
    let resolve = |p: &mut Option<String>| {
        if let Some(s) = p.as_ref() {
            if Path::new(s).is_relative() {
                *p = Some(root.join(s).display().to_string());
            }
        }
    };
    resolve(&mut config.input.file_path);
    resolve(&mut config.geocoder.reference_path);
    resolve(&mut config.departments.file_path);
    resolve(&mut config.output.html_path);
    if config.output.output_path.as_deref() != Some("stdout") {
        resolve(&mut config.output.output_path);
    }
    Ok(config)
}

/// Command line options take precedence over the configuration file.
pub fn apply_args(config: &DashboardConfig, args: &Args) -> DashboardConfig {
    let mut c = config.clone();
    if args.input.is_some() {
        c.input.file_path = args.input.clone();
    }
    if args.input_type.is_some() {
        c.input.provider = args.input_type.clone();
    }
    if args.excel_worksheet_name.is_some() {
        c.input.excel_worksheet_name = args.excel_worksheet_name.clone();
    }
    if args.geonames.is_some() {
        c.geocoder.reference_path = args.geonames.clone();
    }
    if let Some(d) = &args.departments {
        if d.starts_with("http://") || d.starts_with("https://") {
            c.departments.url = Some(d.clone());
            c.departments.file_path = None;
        } else {
            c.departments.file_path = Some(d.clone());
        }
    }
    if args.opacity.is_some() {
        c.map.opacity = args.opacity;
    }
    if args.max_items.is_some() {
        c.charts.max_items = args.max_items;
    }
    if args.variables.is_some() {
        c.charts.variables = args.variables.clone();
    }
    if args.metric.is_some() {
        c.charts.metric = args.metric.clone();
    }
    if args.culture.is_some() {
        c.culture_filter = args.culture.clone();
    }
    if args.out.is_some() {
        c.output.output_path = args.out.clone();
    }
    if args.html.is_some() {
        c.output.html_path = args.html.clone();
    }
    c
}

fn parse_metric(s: Option<&str>, default: Metric) -> DashResult<Metric> {
    match s {
        None => Ok(default),
        Some(x) => match Metric::parse(x) {
            Some(m) => Ok(m),
            None => whatever!("Unknown metric {:?}: expected count or distinct", x),
        },
    }
}

fn input_format(input: &InputSettings) -> DashResult<InputFormat> {
    match input.provider.as_deref().unwrap_or("csv") {
        "csv" => {
            let delimiter = match input.delimiter.as_deref().unwrap_or(";").as_bytes() {
                [b] => *b,
                _ => whatever!(
                    "The delimiter must be a single character, got {:?}",
                    input.delimiter
                ),
            };
            Ok(InputFormat::Csv { delimiter })
        }
        "xlsx" => Ok(InputFormat::Xlsx {
            worksheet: input.excel_worksheet_name.clone(),
        }),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

pub fn validate_config(config: &DashboardConfig) -> DashResult<ValidatedConfig> {
    let version = config.version.unwrap_or(LATEST_VERSION);
    if !(1..=LATEST_VERSION).contains(&version) {
        whatever!(
            "Unknown configuration version {}: expected 1 to {}",
            version,
            LATEST_VERSION
        );
    }

    let input_path = match &config.input.file_path {
        Some(p) => p.clone(),
        None => whatever!("No input file: use --input or input.filePath"),
    };
    let geonames_path = match &config.geocoder.reference_path {
        Some(p) => p.clone(),
        None => whatever!("No postal code reference: use --geonames or geocoder.referencePath"),
    };

    let defaults = MapSettings::default();
    let map = MapSettings {
        opacity: config.map.opacity.unwrap_or(defaults.opacity),
        marker_size: config.map.marker_size.unwrap_or(defaults.marker_size),
        zoom: config.map.zoom.unwrap_or(defaults.zoom),
        height: config.map.height.unwrap_or(defaults.height),
        map_style: config.map.map_style.clone().unwrap_or(defaults.map_style),
    };

    let mut categories: Vec<CategorySettings> = Vec::new();
    if version >= 2 {
        let metric = parse_metric(config.charts.metric.as_deref(), Metric::RecordCount)?;
        let max_items = config.charts.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
        let variables = config
            .charts
            .variables
            .clone()
            .unwrap_or_else(|| vec![CULTURE_COLUMN.to_string()]);
        for v in variables.iter() {
            let field = match GroupField::from_column(v) {
                Some(f) => f,
                None => whatever!("Unknown variable {:?}", v),
            };
            categories.push(CategorySettings {
                field,
                metric,
                max_items,
            });
        }
    }

    let culture_filter = if version >= 3 {
        config.culture_filter.clone()
    } else {
        if config.culture_filter.is_some() {
            warn!("validate_config: the culture filter requires version 3 or later, ignoring it");
        }
        None
    };

    let choropleth = if version >= 4 {
        let defaults = ChoroplethSettings::default();
        Some(ChoroplethSettings {
            metric: parse_metric(config.departments.metric.as_deref(), defaults.metric)?,
            opacity: map.opacity,
            height: map.height,
            map_style: map.map_style.clone(),
            ..defaults
        })
    } else {
        None
    };

    let departments = match &config.departments.file_path {
        Some(p) => DepartmentLocation::File(PathBuf::from(p)),
        None => DepartmentLocation::Url {
            url: config
                .departments
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_DEPARTMENTS_URL.to_string()),
            timeout: Duration::from_secs(
                config
                    .departments
                    .timeout_seconds
                    .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            ),
        },
    };

    let settings = DashboardSettings {
        title: config
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        map: Some(map),
        categories,
        culture_filter,
        choropleth,
    };
    settings.validate().context(PipelineSnafu {})?;

    Ok(ValidatedConfig {
        version,
        settings,
        input_path,
        input_format: input_format(&config.input)?,
        geonames_path,
        country: config
            .geocoder
            .country
            .clone()
            .unwrap_or_else(|| "FR".to_string()),
        departments,
        output_path: config.output.output_path.clone(),
        html_path: config.output.html_path.clone(),
    })
}
