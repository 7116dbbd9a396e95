use clap::Parser;

/// This is a dashboard builder for maps and charts of crop records in France.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration of the dashboard. For more information about the
    /// file format, read the manual of the cultures_map library.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference dashboard in JSON format. If provided, cultmap will check that the
    /// produced dashboard matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the dashboard will be written in JSON format to the
    /// given location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) The export of records to load. Setting this option overrides the path that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use (the first one otherwise).
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) The GeoNames postal code export used to place the records (for example FR.txt).
    #[clap(short, long, value_parser)]
    pub geonames: Option<String>,

    /// (URL or file path) The GeoJSON boundaries of the departments.
    #[clap(long, value_parser)]
    pub departments: Option<String>,

    /// (between 0.0 and 1.0, default 0.5) The opacity of the points on the map.
    #[clap(long, value_parser)]
    pub opacity: Option<f64>,

    /// (default 10) The maximum number of items displayed in the pie and bar charts.
    #[clap(long, value_parser)]
    pub max_items: Option<usize>,

    /// (column names) The variables for the pie and bar charts. Can be repeated.
    #[clap(long, value_parser)]
    pub variables: Option<Vec<String>>,

    /// (count or distinct) The statistic displayed in the pie and bar charts.
    #[clap(long, value_parser)]
    pub metric: Option<String>,

    /// If specified, only the records of this culture are displayed.
    #[clap(long, value_parser)]
    pub culture: Option<String>,

    /// (file path) If specified, a standalone HTML page with all the charts is written there.
    #[clap(long, value_parser)]
    pub html: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
