use clap::Parser;

/// This is a dashboard generator for course-feedback surveys.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the dashboard: input source, titles,
    /// labels, stop words and word cloud settings. Relative paths inside it are resolved
    /// from the directory of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The survey export. Setting this option overrides the path that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: the only worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (repeatable) A role to keep in the dashboard. If no role is given, all the responses
    /// are shown.
    #[clap(short = 'R', long, value_parser)]
    pub role: Vec<String>,

    /// (file path) Where to write the HTML dashboard. Defaults to dashboard.html in the output directory.
    #[clap(long, value_parser)]
    pub html: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the dashboard will be written
    /// in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing a JSON summary. If provided, feedbackdash will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path) The font used for the Chinese glyphs. Overrides the --config option.
    #[clap(long, value_parser)]
    pub font: Option<String>,

    /// If passed as an argument, one extra dashboard is written for every role found in the input.
    #[clap(long, takes_value = false)]
    pub per_role: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
