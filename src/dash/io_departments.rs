// The department boundaries, as a GeoJSON FeatureCollection.
//
// Each feature carries its department code in `properties.code` and its name in
// `properties.nom`.

use std::path::PathBuf;
use std::time::Duration;

use cultures_map::departments::DepartmentReference;
use geojson::{Feature, GeoJson};

use crate::dash::*;

const CODE_PROPERTY: &str = "code";
const NAME_PROPERTY: &str = "nom";

/// Where the department boundaries come from.
pub trait DepartmentSource {
    fn describe(&self) -> String;

    fn fetch_text(&self) -> DashResult<String>;
}

pub struct HttpDepartmentSource {
    pub url: String,
    pub timeout: Duration,
}

impl DepartmentSource for HttpDepartmentSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch_text(&self) -> DashResult<String> {
        let url = self.url.as_str();
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .context(FetchingDepartmentsSnafu { url })?;
        info!("HttpDepartmentSource: fetching {}", url);
        let text = client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .context(FetchingDepartmentsSnafu { url })?;
        debug!("HttpDepartmentSource: {} bytes", text.len());
        Ok(text)
    }
}

pub struct FileDepartmentSource {
    pub path: PathBuf,
}

impl DepartmentSource for FileDepartmentSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch_text(&self) -> DashResult<String> {
        let path = self.describe();
        let text = fs::read_to_string(&self.path).context(OpeningInputSnafu { path: &path })?;
        info!(
            "FileDepartmentSource: {} bytes from {}",
            text.len(),
            simplify_file_name(&path)
        );
        Ok(text)
    }
}

pub fn department_source(location: &DepartmentLocation) -> Box<dyn DepartmentSource> {
    match location {
        DepartmentLocation::Url { url, timeout } => Box::new(HttpDepartmentSource {
            url: url.clone(),
            timeout: *timeout,
        }),
        DepartmentLocation::File(path) => Box::new(FileDepartmentSource { path: path.clone() }),
    }
}

/// The code-name reference and the boundaries to draw, with normalized codes.
#[derive(PartialEq, Debug, Clone)]
pub struct DepartmentData {
    pub reference: DepartmentReference,
    pub boundaries: JSValue,
}

pub fn parse_departments(text: &str) -> DashResult<DepartmentData> {
    let gj: GeoJson = text.parse().context(ParsingGeoJsonSnafu {})?;
    let mut fc = match gj {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return NotFeatureCollectionSnafu {}.fail(),
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    for (idx, feat) in fc.features.iter_mut().enumerate() {
        match read_feature(feat) {
            Some((code, name)) => {
                feat.set_property(CODE_PROPERTY, code.clone());
                pairs.push((code, name));
            }
            None => {
                warn!("parse_departments: feature {} has no usable code", idx);
            }
        }
    }
    if pairs.is_empty() {
        whatever!("The department boundaries contain no department code");
    }

    let boundaries =
        serde_json::to_value(&GeoJson::FeatureCollection(fc)).context(ParsingJsonSnafu {})?;
    let reference = DepartmentReference::new(pairs);
    info!("parse_departments: {} departments", reference.len());
    Ok(DepartmentData {
        reference,
        boundaries,
    })
}

// Numeric codes are padded back to two digits.
fn read_feature(feat: &Feature) -> Option<(String, String)> {
    let code = match feat.property(CODE_PROPERTY)? {
        JSValue::String(s) if !s.trim().is_empty() => s.trim().to_uppercase(),
        JSValue::Number(n) => format!("{:0>2}", n.as_u64()?),
        _ => return None,
    };
    let name = feat
        .property(NAME_PROPERTY)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| code.clone());
    Some((code, name))
}
