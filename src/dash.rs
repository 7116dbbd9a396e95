use log::{debug, info, warn};

use cultures_map::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

mod config_reader;
mod io_common;
mod io_csv;
mod io_departments;
mod io_excel;
mod io_geonames;
mod pipeline;
mod render;

use config_reader::*;
use io_common::{read_input_bytes, simplify_file_name};
use io_csv::read_csv_table;
use io_departments::*;
use io_excel::read_excel_table;
use io_geonames::GeoNamesTable;
use pipeline::Session;
use render::*;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error opening file {path}"))]
    OpeningInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading the CSV header"))]
    CsvHeader { source: csv::Error },
    #[snafu(display("Error opening the Excel file {name}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        name: String,
    },
    #[snafu(display("The Excel file {name} has no worksheet named {worksheet}"))]
    MissingWorksheet { name: String, worksheet: String },
    #[snafu(display("The Excel file is empty"))]
    EmptyExcel {},
    #[snafu(display("Error opening the configuration {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error opening the postal code reference {path}"))]
    OpeningGeoNames {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error fetching the department boundaries from {url}"))]
    FetchingDepartments { source: reqwest::Error, url: String },
    #[snafu(display("Error parsing the department boundaries"))]
    ParsingGeoJson { source: geojson::Error },
    #[snafu(display("The department boundaries are not a FeatureCollection"))]
    NotFeatureCollection {},
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Pipeline { source: MapErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;
pub type BDashResult<T> = Result<T, Box<DashError>>;

const CHOROPLETH_SECTION: &str = "choropleth";

/// One render pass over the current input.
///
/// A failure to get the department boundaries only removes the choropleth.
fn render_pass(session: &mut Session, vc: &ValidatedConfig) -> BDashResult<JSValue> {
    let content = read_input_bytes(&vc.input_path)?;
    let table = session.load(
        &content,
        &simplify_file_name(&vc.input_path),
        &vc.input_format,
    )?;
    let located = session.locate(&table, &vc.input_format)?;

    let mut errors: Vec<SectionError> = Vec::new();
    let departments = match vc.settings.choropleth {
        Some(_) => match session.department_data() {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("render_pass: no department map: {}", e);
                errors.push(SectionError {
                    section: CHOROPLETH_SECTION.to_string(),
                    message: error_chain(&e),
                });
                None
            }
        },
        None => None,
    };

    let dashboard = build_dashboard(
        &table,
        &located,
        departments.as_ref().map(|d| &d.reference),
        &vc.settings,
    )
    .context(PipelineSnafu {})?;
    let excluded = &dashboard.excluded;
    if excluded.total_rows() > 0 {
        warn!(
            "render_pass: {} rows left out: {:?}",
            excluded.total_rows(),
            excluded
        );
    }

    Ok(dashboard_to_json(
        &dashboard,
        departments.as_ref().map(|d| &d.boundaries),
        &errors,
        vc.version,
    ))
}

/// The message of an error followed by the messages of its sources.
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut current = e.source();
    while let Some(s) = current {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        current = s.source();
    }
    msg
}

fn write_output(path: &str, content: &str) -> DashResult<()> {
    fs::write(path, content).context(WritingOutputSnafu { path })?;
    info!("write_output: wrote {}", path);
    Ok(())
}

fn check_reference(reference_path: &str, pretty_js: &str) -> DashResult<()> {
    let ref_str =
        fs::read_to_string(reference_path).context(OpeningJsonSnafu {
            path: reference_path,
        })?;
    let ref_js: JSValue = serde_json::from_str(&ref_str).context(ParsingJsonSnafu {})?;
    let pretty_js_ref = serde_json::to_string_pretty(&ref_js).context(ParsingJsonSnafu {})?;
    if pretty_js_ref != pretty_js {
        warn!("Found differences with the reference dashboard");
        print_diff(pretty_js_ref.as_str(), pretty_js, "\n");
        whatever!("Difference detected between the dashboard and the reference dashboard")
    }
    info!("check_reference: identical to {}", reference_path);
    Ok(())
}

pub fn run_dashboard(args: &Args) -> DashResult<()> {
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => DashboardConfig::default(),
    };
    let vc = validate_config(&apply_args(&config, args))?;
    debug!("run_dashboard: config: {:?}", vc);

    let geonames = GeoNamesTable::from_path(&vc.geonames_path, &vc.country)?;
    let mut session = Session::new(Box::new(geonames), department_source(&vc.departments));
    let document = render_pass(&mut session, &vc).map_err(|e| *e)?;

    let pretty_js = serde_json::to_string_pretty(&document).context(ParsingJsonSnafu {})?;
    match vc.output_path.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js),
        Some(p) if p.is_empty() => println!("{}", pretty_js),
        Some(p) => write_output(p, &pretty_js)?,
    }

    if let Some(html_p) = &vc.html_path {
        write_output(html_p, &render_html(&document))?;
    }

    if let Some(reference_p) = &args.reference {
        check_reference(reference_p, &pretty_js)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    fn data_path(name: &str) -> String {
        let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        p.push("tests");
        p.push("data");
        p.push(name);
        p.display().to_string()
    }

    fn test_config() -> ValidatedConfig {
        let config = read_config(&data_path("config.json")).unwrap();
        validate_config(&config).unwrap()
    }

    fn test_session(vc: &ValidatedConfig) -> Session {
        let geonames = GeoNamesTable::from_path(&vc.geonames_path, &vc.country).unwrap();
        Session::new(Box::new(geonames), department_source(&vc.departments))
    }

    #[test]
    fn end_to_end() {
        let vc = test_config();
        let mut session = test_session(&vc);
        let js = render_pass(&mut session, &vc).unwrap();

        let kinds: Vec<&str> = js["figures"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["kind"].as_str().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec!["scatter_map", "pie", "bar", "pie", "bar", "choropleth"]
        );
        assert_eq!(js["errors"], json!([]));
        // 99999 is not in the postal code reference, one row has no culture.
        assert_eq!(js["excluded"]["unresolvedPostalCodes"], json!(1));
        assert_eq!(js["excluded"]["missingRequired"], json!(1));
        // Gironde and 33 are the same department.
        let choropleth = &js["figures"][5]["data"][0];
        assert_eq!(choropleth["locations"], json!(["01", "2A", "33", "75"]));
        assert_eq!(choropleth["z"], json!([1, 1, 2, 1]));
        assert_eq!(js["excluded"]["unresolvedDepartments"], json!(1));
        assert_eq!(js["excluded"]["missingDepartments"], json!(0));
        // The record with an unknown postal code is also the one with an unknown department.
        assert_eq!(js["excluded"]["excludedRecords"], json!(1));
        assert_eq!(js["excluded"]["totalRows"], json!(2));

        // Same content again: nothing is parsed or fetched a second time.
        let js2 = render_pass(&mut session, &vc).unwrap();
        assert_eq!(js, js2);
        assert_eq!(session.parse_count(), 1);
    }

    #[test]
    fn unreachable_departments_keep_other_charts() {
        let mut vc = test_config();
        vc.departments = DepartmentLocation::File(PathBuf::from(data_path("missing.geojson")));
        let mut session = test_session(&vc);
        let js = render_pass(&mut session, &vc).unwrap();
        assert_eq!(js["figures"].as_array().unwrap().len(), 5);
        assert_eq!(js["errors"][0]["section"], json!("choropleth"));
    }

    #[test]
    fn culture_filter_from_command_line() {
        let config = read_config(&data_path("config.json")).unwrap();
        let args = Args::parse_from(["cultmap", "--culture", "Viticulture"]);
        let vc = validate_config(&apply_args(&config, &args)).unwrap();
        let mut session = test_session(&vc);
        let js = render_pass(&mut session, &vc).unwrap();
        let map_traces = js["figures"][0]["data"].as_array().unwrap();
        assert_eq!(map_traces.len(), 1);
        assert_eq!(map_traces[0]["name"], json!("Viticulture"));
    }

    #[test]
    fn reference_mismatch() {
        let res = check_reference(&data_path("config.json"), "{}");
        assert!(matches!(res, Err(DashError::Whatever { .. })));
    }
}
