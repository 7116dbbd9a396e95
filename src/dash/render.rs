// Plotly figures and the HTML page.

use cultures_map::charts::{
    BarChart, ChartSpec, ChoroplethChart, PieChart, ScatterMapChart, FRANCE_CENTER,
};

use crate::dash::*;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

/// A section of the dashboard that could not be drawn. The other sections are still rendered.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SectionError {
    pub section: String,
    pub message: String,
}

fn title_js(title: &str) -> JSValue {
    json!({ "text": title })
}

fn center_js(p: &GeoPoint) -> JSValue {
    json!({ "lat": p.latitude, "lon": p.longitude })
}

fn scatter_map_to_json(c: &ScatterMapChart) -> JSValue {
    let data: Vec<JSValue> = c
        .traces
        .iter()
        .map(|t| {
            json!({
                "type": "scattermapbox",
                "mode": "markers",
                "name": t.name,
                "lat": t.latitudes,
                "lon": t.longitudes,
                "text": t.hover,
                "marker": { "size": c.settings.marker_size, "opacity": c.settings.opacity }
            })
        })
        .collect();
    json!({
        "data": data,
        "layout": {
            "title": title_js(&c.title),
            "height": c.settings.height,
            "legend": { "title": title_js(CULTURE_COLUMN) },
            "mapbox": {
                "style": c.settings.map_style,
                "zoom": c.settings.zoom,
                "center": center_js(c.center.as_ref().unwrap_or(&FRANCE_CENTER))
            }
        }
    })
}

fn pie_to_json(c: &PieChart) -> JSValue {
    json!({
        "data": [{ "type": "pie", "labels": c.labels, "values": c.values }],
        "layout": { "title": title_js(&c.title) }
    })
}

fn bar_to_json(c: &BarChart) -> JSValue {
    json!({
        "data": [{ "type": "bar", "x": c.x, "y": c.y }],
        "layout": {
            "title": title_js(&c.title),
            "xaxis": { "title": title_js(&c.x_label) },
            "yaxis": { "title": title_js(&c.y_label) }
        }
    })
}

fn choropleth_to_json(c: &ChoroplethChart, boundaries: Option<&JSValue>) -> JSValue {
    json!({
        "data": [{
            "type": "choroplethmapbox",
            "geojson": boundaries.cloned().unwrap_or(JSValue::Null),
            "featureidkey": c.feature_id_key,
            "locations": c.locations,
            "z": c.values,
            "text": c.names,
            "marker": { "opacity": c.settings.opacity },
            "colorbar": { "title": title_js(c.settings.metric.label()) }
        }],
        "layout": {
            "title": title_js(&c.title),
            "height": c.settings.height,
            "mapbox": {
                "style": c.settings.map_style,
                "zoom": c.settings.zoom,
                "center": center_js(&c.center)
            }
        }
    })
}

pub fn chart_to_json(chart: &ChartSpec, boundaries: Option<&JSValue>) -> JSValue {
    let mut fig = match chart {
        ChartSpec::ScatterMap(c) => scatter_map_to_json(c),
        ChartSpec::Pie(c) => pie_to_json(c),
        ChartSpec::Bar(c) => bar_to_json(c),
        ChartSpec::Choropleth(c) => choropleth_to_json(c, boundaries),
    };
    if let Some(obj) = fig.as_object_mut() {
        obj.insert("kind".to_string(), json!(chart.kind()));
    }
    fig
}

fn excluded_to_json(e: &ExclusionReport) -> JSValue {
    json!({
        "malformedLines": e.malformed_lines,
        "missingRequired": e.missing_required,
        "unresolvedPostalCodes": e.unresolved_postal_codes,
        "unresolvedDepartments": e.unresolved_departments,
        "unknownDepartmentCodes": e.unknown_department_codes,
        "missingDepartments": e.missing_departments,
        "excludedRecords": e.excluded_records,
        "totalRows": e.total_rows()
    })
}

/// The full output document: the figures, what was excluded, and the sections in error.
pub fn dashboard_to_json(
    dashboard: &Dashboard,
    boundaries: Option<&JSValue>,
    errors: &[SectionError],
    version: u32,
) -> JSValue {
    let figures: Vec<JSValue> = dashboard
        .charts
        .iter()
        .map(|c| chart_to_json(c, boundaries))
        .collect();
    let errors_js: Vec<JSValue> = errors
        .iter()
        .map(|e| json!({ "section": e.section, "message": e.message }))
        .collect();
    json!({
        "config": { "title": dashboard.title, "version": version },
        "figures": figures,
        "excluded": excluded_to_json(&dashboard.excluded),
        "errors": errors_js
    })
}

/// A standalone page that draws every figure of the document with plotly.js.
pub fn render_html(document: &JSValue) -> String {
    let title = document["config"]["title"].as_str().unwrap_or("");
    let empty: Vec<JSValue> = Vec::new();
    let figures = document["figures"].as_array().unwrap_or(&empty);

    let mut body = String::new();
    for (idx, fig) in figures.iter().enumerate() {
        // The JSON is inlined in a script element.
        let fig_s = fig.to_string().replace("</", "<\\/");
        body.push_str(&format!(
            "<div id=\"figure-{idx}\"></div>\n<script>\n(function () {{ var fig = {fig_s}; Plotly.newPlot(\"figure-{idx}\", fig.data, fig.layout); }})();\n</script>\n",
            idx = idx,
            fig_s = fig_s
        ));
    }
    for e in document["errors"].as_array().unwrap_or(&empty) {
        body.push_str(&format!(
            "<p class=\"error\">{}: {}</p>\n",
            escape_html(e["section"].as_str().unwrap_or("")),
            escape_html(e["message"].as_str().unwrap_or(""))
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<script src=\"{cdn}\"></script>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(title),
        cdn = PLOTLY_CDN,
        body = body
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
