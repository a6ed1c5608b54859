use log::{debug, info, warn};

use feedback_stats::*;
use snafu::prelude::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::dashboard::cache::{SourceSpec, TableCache};
use crate::dashboard::config_reader::*;
use crate::dashboard::io_common::{simplify_file_name, unique_role_slugs};
use crate::dashboard::render::{FontResource, Renderer};
pub use crate::dashboard::wordcloud::WordCloudOptions;

mod cache;
mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
pub mod render;
pub mod wordcloud;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {worksheet} not found in {path}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display(
        "{path} has {count} worksheets, select one with the excelWorksheetName option"
    ))]
    AmbiguousWorksheet { path: String, count: usize },
    #[snafu(display("The Excel file has no rows"))]
    EmptyExcel {},
    #[snafu(display("Unsupported cell type at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("The file {path} is empty"))]
    EmptyInput { path: String },
    #[snafu(display("No input file: use --input or inputSource in the configuration"))]
    MissingInput {},
    #[snafu(display("Unknown input type {provider:?}, expected csv or xlsx"))]
    UnknownProvider { provider: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("{path}: {source}"))]
    Schema { source: FeedbackError, path: String },
    #[snafu(display("Error in template {name}"))]
    TemplateRegistration {
        source: handlebars::TemplateError,
        name: String,
    },
    #[snafu(display("Error rendering template {name}"))]
    TemplateRendering {
        source: handlebars::RenderError,
        name: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the computed summary and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;
pub type BDashResult<T> = Result<T, Box<DashError>>;

pub const DEFAULT_TITLE: &str = "📊 DTDA 下學期第8堂社課回饋儀表板";
pub const DEFAULT_DESCRIPTION: &str =
    "這份儀表板整理了【A/B Testing】社課的學員回饋，可依身份篩選查看不同成員的意見。";
const DEFAULT_FONT: &str = "NotoSansTC-Regular.ttf";
const DEFAULT_HTML: &str = "dashboard.html";

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Csv,
    Xlsx,
}

impl Provider {
    pub fn from_name(name: &str) -> Option<Provider> {
        match name.trim().to_lowercase().as_str() {
            "csv" => Some(Provider::Csv),
            "xlsx" | "excel" => Some(Provider::Xlsx),
            _ => None,
        }
    }

    /// Guesses the provider from the extension of the file, defaulting to CSV.
    fn from_path(path: &Path) -> Provider {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => Provider::Xlsx,
            _ => Provider::Csv,
        }
    }
}

/// Reads the source and maps it onto the schema. Nothing is returned if the
/// column count is wrong.
pub fn load_table(source: &SourceSpec) -> BDashResult<Table> {
    let path = source.path.display().to_string();
    info!("Loading {:?} ({:?})", path, source.provider);
    let sheet = match source.provider {
        Provider::Csv => io_csv::read_csv_sheet(&path)?,
        Provider::Xlsx => {
            io_excel::read_excel_sheet(&path, source.excel_worksheet_name.as_deref())?
        }
    };
    let table = table_from_rows(&sheet.header, &sheet.rows).context(SchemaSnafu {
        path: path.clone(),
    })?;
    info!("Loaded {} responses from {:?}", table.len(), path);
    Ok(table)
}

/// Everything a run needs, once the command line and the configuration
/// file are merged.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub title: String,
    pub description: String,
    pub source: SourceSpec,
    pub output_directory: PathBuf,
    pub html_path: PathBuf,
    pub font_path: PathBuf,
    pub stop_words: StopWords,
    pub satisfaction: ColumnSet,
    pub familiarity: ColumnSet,
    pub word_cloud: WordCloudOptions,
}

fn resolve(root: &Path, p: &str) -> PathBuf {
    let pb = PathBuf::from(p);
    if pb.is_absolute() {
        pb
    } else {
        root.join(pb)
    }
}

/// Merges the command line with the configuration. Paths from the
/// configuration are relative to its directory, the flags win.
pub fn resolve_settings(
    args: &Args,
    config: &DashboardConfig,
    config_dir: &Path,
) -> BDashResult<DashboardSettings> {
    let input_source = config.input_source.as_ref();
    let path = match (&args.input, input_source) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(src)) => resolve(config_dir, &src.file_path),
        (None, None) => return Err(Box::new(DashError::MissingInput {})),
    };
    let provider_name = args
        .input_type
        .clone()
        .or_else(|| input_source.and_then(|src| src.provider.clone()));
    let provider = match provider_name {
        Some(name) => Provider::from_name(&name).context(UnknownProviderSnafu { provider: name })?,
        None => Provider::from_path(&path),
    };
    let source = SourceSpec {
        path,
        provider,
        excel_worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or_else(|| input_source.and_then(|src| src.excel_worksheet_name.clone())),
    };

    let output_directory = match &config.output_settings.output_directory {
        Some(d) => resolve(config_dir, d),
        None => config_dir.to_path_buf(),
    };
    let html_path = match &args.html {
        Some(p) => PathBuf::from(p),
        None => output_directory.join(DEFAULT_HTML),
    };
    let font_path = match (&args.font, &config.font_path) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(p)) => resolve(config_dir, p),
        (None, None) => config_dir.join(DEFAULT_FONT),
    };
    let stop_words = match &config.stop_words {
        Some(words) => StopWords::new(words.as_slice()),
        None => StopWords::default(),
    };

    Ok(DashboardSettings {
        title: config
            .output_settings
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: config
            .output_settings
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        source,
        output_directory,
        html_path,
        font_path,
        stop_words,
        satisfaction: column_set_with_labels(ColumnSet::satisfaction(), &config.satisfaction_labels)?,
        familiarity: column_set_with_labels(ColumnSet::familiarity(), &config.familiarity_labels)?,
        word_cloud: config.word_cloud.options(),
    })
}

/// The computed content of one dashboard.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct DashboardPass {
    /// All the roles of the table, selected or not.
    pub roles: Vec<String>,
    pub selected_roles: Vec<String>,
    pub kpis: Kpis,
    pub satisfaction: Vec<ColumnMean>,
    pub familiarity: Vec<ColumnMean>,
    pub tokens: Vec<String>,
    /// No text at all in the selection, as opposed to text made only of
    /// stop words.
    pub corpus_empty: bool,
    pub listing: Vec<ListedResponse>,
}

pub fn compute_pass(
    table: &Table,
    selected_roles: &[String],
    settings: &DashboardSettings,
    segmenter: &dyn Segmenter,
) -> DashboardPass {
    let filtered = filter_roles(table, selected_roles);
    debug!(
        "compute_pass: {:?} -> {} of {} responses",
        selected_roles,
        filtered.len(),
        table.len()
    );
    DashboardPass {
        roles: table.roles(),
        selected_roles: selected_roles.to_vec(),
        kpis: kpis(&filtered),
        satisfaction: aggregate(&filtered, &settings.satisfaction),
        familiarity: aggregate(&filtered, &settings.familiarity),
        tokens: build_wordcloud_input(&filtered, segmenter, &settings.stop_words),
        corpus_empty: corpus(&filtered).trim().is_empty(),
        listing: list_responses(&filtered),
    }
}

fn means_to_json(means: &[ColumnMean]) -> Vec<JSValue> {
    means
        .iter()
        .map(|m| {
            json!({
                "column": m.field.name(),
                "label": m.label,
                "mean": format_mean(m.mean),
            })
        })
        .collect()
}

fn build_summary_js(settings: &DashboardSettings, pass: &DashboardPass) -> JSValue {
    let mut frequencies = wordcloud::word_frequencies(&pass.tokens);
    frequencies.truncate(settings.word_cloud.max_words);
    let words: Vec<JSValue> = frequencies
        .iter()
        .map(|w| json!({"word": w.word, "count": w.count.to_string()}))
        .collect();
    let responses: Vec<JSValue> = pass
        .listing
        .iter()
        .map(|l| {
            let mut js = json!({
                "index": l.index.to_string(),
                "role": l.role,
                "attractivePart": l.attractive_part,
                "suggestions": l.suggestions,
                "feedbackToLecturer": l.feedback_to_lecturer,
            });
            if let (Some(c), Some(obj)) = (&l.additional_comments, js.as_object_mut()) {
                obj.insert("additionalComments".to_string(), json!(c));
            }
            js
        })
        .collect();
    json!({
        "config": {
            "title": settings.title,
            "source": simplify_file_name(&settings.source.path.display().to_string()),
            "roles": pass.roles,
            "selectedRoles": pass.selected_roles,
        },
        "kpis": {
            "totalResponses": pass.kpis.total_responses.to_string(),
            "avgOverallSatisfaction": format_mean(pass.kpis.avg_overall_satisfaction),
        },
        "satisfaction": means_to_json(&pass.satisfaction),
        "familiarity": means_to_json(&pass.familiarity),
        "wordFrequencies": words,
        "responses": responses,
    })
}

fn write_output(path: &Path, contents: &str) -> BDashResult<()> {
    let path_s = path.display().to_string();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(WritingOutputSnafu {
            path: path_s.clone(),
        })?;
    }
    fs::write(path, contents).context(WritingOutputSnafu { path: path_s.clone() })?;
    info!("Wrote {}", path_s);
    Ok(())
}

pub fn run_dashboard(args: &Args) -> BDashResult<()> {
    let (config, config_dir) = match &args.config {
        Some(p) => {
            let config = read_config(p)?;
            let dir = Path::new(p)
                .parent()
                .map(|d| d.to_path_buf())
                .unwrap_or_default();
            (config, dir)
        }
        None => (DashboardConfig::default(), PathBuf::new()),
    };
    let settings = resolve_settings(args, &config, &config_dir)?;
    info!("settings: {:?}", settings);

    let font = FontResource::probe(&settings.font_path);
    let renderer = Renderer::new()?;
    let segmenter = JiebaSegmenter::new();
    let mut cache = TableCache::new(settings.source.clone());

    let table = cache.get()?;
    let pass = compute_pass(&table, &args.role, &settings, &segmenter);
    info!(
        "{} responses, overall satisfaction {}",
        pass.kpis.total_responses,
        pass.kpis.overall_display()
    );
    let html = renderer.dashboard(&pass, &settings, &font)?;
    write_output(&settings.html_path, &html)?;

    if args.per_role {
        let roles = table.roles();
        for (role, slug) in roles.iter().zip(unique_role_slugs(&roles)) {
            // Reuses the table unless the file changed in the meantime.
            let table = cache.get()?;
            let role_pass = compute_pass(&table, &[role.clone()], &settings, &segmenter);
            let html = renderer.dashboard(&role_pass, &settings, &font)?;
            let path = settings
                .output_directory
                .join(format!("dashboard_{}.html", slug));
            write_output(&path, &html)?;
        }
        debug!("run_dashboard: {} loads of the source", cache.loads());
    }

    let result_js = build_summary_js(&settings, &pass);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    match args.out.as_deref() {
        None => {}
        Some("stdout") | Some("") => println!("{}", pretty_js_stats),
        Some(p) => write_output(Path::new(p), &pretty_js_stats)?,
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p.clone())?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return Err(Box::new(DashError::ReferenceMismatch {
                path: summary_p.clone(),
            }));
        }
        info!("The summary matches the reference {}", summary_p);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> Args {
        Args {
            config: None,
            input: None,
            input_type: None,
            excel_worksheet_name: None,
            role: vec![],
            html: None,
            out: None,
            reference: None,
            font: None,
            per_role: false,
            verbose: false,
        }
    }

    fn row(role: &str, overall: u32, attractive: &str, extra: &str) -> String {
        format!(
            "{},4,4,4,4,4,4,4,{},3,3,3,3,3,實作,{},更多範例,講解清楚,{}",
            role, overall, attractive, extra
        )
    }

    fn write_survey(dir: &Path) -> PathBuf {
        let p = dir.join("feedback_data.csv");
        let mut f = fs::File::create(&p).unwrap();
        writeln!(f, "{}", SCHEMA.join(",")).unwrap();
        writeln!(f, "{}", row("lead", 5, "假設檢定的實作", "")).unwrap();
        writeln!(f, "{}", row("member", 3, "p-value 的解釋", "謝謝")).unwrap();
        writeln!(f, "{}", row("lead", 4, "互動很有趣", "")).unwrap();
        p
    }

    #[test]
    fn settings_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config: DashboardConfig = serde_json::from_str(
            r#"{"inputSource": {"filePath": "data/f.xlsx"}, "outputSettings": {"outputDirectory": "out"}}"#,
        )
        .unwrap();
        let s = resolve_settings(&args(), &config, dir.path()).unwrap();
        assert_eq!(s.source.path, dir.path().join("data/f.xlsx"));
        assert_eq!(s.source.provider, Provider::Xlsx);
        assert_eq!(s.html_path, dir.path().join("out").join("dashboard.html"));
        assert_eq!(s.font_path, dir.path().join("NotoSansTC-Regular.ttf"));
        assert_eq!(s.title, DEFAULT_TITLE);
        assert_eq!(s.stop_words, StopWords::default());
    }

    #[test]
    fn flags_override_config() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{"inputSource": {"provider": "xlsx", "filePath": "f.xlsx"}, "fontPath": "a.ttf"}"#,
        )
        .unwrap();
        let a = Args {
            input: Some("other.csv".to_string()),
            input_type: Some("csv".to_string()),
            font: Some("b.ttf".to_string()),
            ..args()
        };
        let s = resolve_settings(&a, &config, Path::new("conf")).unwrap();
        assert_eq!(s.source.path, PathBuf::from("other.csv"));
        assert_eq!(s.source.provider, Provider::Csv);
        assert_eq!(s.font_path, PathBuf::from("b.ttf"));
    }

    #[test]
    fn input_is_required() {
        let res = resolve_settings(&args(), &DashboardConfig::default(), Path::new(""));
        assert!(matches!(res.map_err(|e| *e), Err(DashError::MissingInput {})));
        let a = Args {
            input: Some("f.ods".to_string()),
            input_type: Some("ods".to_string()),
            ..args()
        };
        let res = resolve_settings(&a, &DashboardConfig::default(), Path::new(""));
        assert!(matches!(res.map_err(|e| *e), Err(DashError::UnknownProvider { .. })));
    }

    #[test]
    fn pass_for_a_role() {
        let dir = tempfile::tempdir().unwrap();
        let a = Args {
            input: Some(write_survey(dir.path()).display().to_string()),
            ..args()
        };
        let settings = resolve_settings(&a, &DashboardConfig::default(), dir.path()).unwrap();
        let table = load_table(&settings.source).unwrap();
        let segmenter = JiebaSegmenter::new();

        let all = compute_pass(&table, &[], &settings, &segmenter);
        assert_eq!(all.kpis.total_responses, 3);
        assert_eq!(all.kpis.overall_display(), "4.00 / 5.0");
        assert_eq!(all.roles, vec!["lead", "member"]);
        assert!(!all.corpus_empty);
        assert!(!all.tokens.is_empty());

        let lead = compute_pass(&table, &["lead".to_string()], &settings, &segmenter);
        assert_eq!(lead.kpis.overall_display(), "4.50 / 5.0");
        let indices: Vec<usize> = lead.listing.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(lead.listing.iter().all(|l| l.additional_comments.is_none()));
        // The familiarity columns all have the same mean.
        assert!(lead.familiarity.iter().all(|m| m.mean == Some(3.0)));
    }

    #[test]
    fn summary_keys() {
        let pass = DashboardPass {
            roles: vec!["lead".to_string()],
            kpis: Kpis {
                total_responses: 2,
                avg_overall_satisfaction: Some(4.5),
            },
            tokens: vec!["檢定".to_string(), "檢定".to_string()],
            ..DashboardPass::default()
        };
        let config: DashboardConfig =
            serde_json::from_str(r#"{"inputSource": {"filePath": "x/feedback_data.csv"}}"#).unwrap();
        let settings = resolve_settings(&args(), &config, Path::new("")).unwrap();
        let js = build_summary_js(&settings, &pass);
        assert_eq!(js["config"]["source"], json!("feedback_data.csv"));
        assert_eq!(js["kpis"]["totalResponses"], json!("2"));
        assert_eq!(js["kpis"]["avgOverallSatisfaction"], json!("4.50"));
        assert_eq!(js["wordFrequencies"], json!([{"word": "檢定", "count": "2"}]));
    }

    #[test]
    fn full_run_with_reference() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_survey(dir.path());
        let summary = dir.path().join("summary.json");
        let a = Args {
            input: Some(input.display().to_string()),
            html: Some(dir.path().join("dashboard.html").display().to_string()),
            out: Some(summary.display().to_string()),
            per_role: true,
            ..args()
        };
        let mut config = dir.path().join("config.json");
        fs::write(&config, r#"{"outputSettings": {"title": "第8堂回饋"}}"#).unwrap();
        let a = Args {
            config: Some(config.display().to_string()),
            ..a
        };
        run_dashboard(&a).unwrap();

        let html = fs::read_to_string(dir.path().join("dashboard.html")).unwrap();
        assert!(html.contains("第8堂回饋"));
        assert!(html.contains("3 份"));
        assert!(html.contains("💬 回饋 #3 (lead)"));
        assert!(html.contains("【補充事項】"));
        // No font next to the configuration: the word cloud panel shows the error.
        assert!(html.contains("產生詞雲時發生錯誤"));
        assert!(dir.path().join("dashboard_lead.html").is_file());
        assert!(dir.path().join("dashboard_member.html").is_file());

        // The summary just written is its own reference.
        let b = Args {
            reference: Some(summary.display().to_string()),
            out: None,
            per_role: false,
            ..a.clone()
        };
        run_dashboard(&b).unwrap();

        config = dir.path().join("other.json");
        fs::write(&config, r#"{"kpis": {}}"#).unwrap();
        let c = Args {
            reference: Some(config.display().to_string()),
            ..b
        };
        let res = run_dashboard(&c).map_err(|e| *e);
        assert!(matches!(res, Err(DashError::ReferenceMismatch { .. })));
    }

    #[test]
    fn per_role_pages_do_not_overwrite_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("roles.csv");
        let mut f = fs::File::create(&p).unwrap();
        writeln!(f, "{}", SCHEMA.join(",")).unwrap();
        writeln!(f, "{}", row("a/b", 5, "實作", "")).unwrap();
        writeln!(f, "{}", row("a_b", 3, "範例", "")).unwrap();
        let config = dir.path().join("config.json");
        fs::write(&config, "{}").unwrap();
        let a = Args {
            config: Some(config.display().to_string()),
            input: Some(p.display().to_string()),
            per_role: true,
            ..args()
        };
        run_dashboard(&a).unwrap();
        let first = fs::read_to_string(dir.path().join("dashboard_a_b.html")).unwrap();
        let second = fs::read_to_string(dir.path().join("dashboard_a_b_2.html")).unwrap();
        assert!(first.contains("💬 回饋 #1 (a/b)"));
        assert!(second.contains("💬 回饋 #1 (a_b)"));
    }

    #[test]
    fn short_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("short.csv");
        fs::write(&p, format!("{}\n", SCHEMA[..18].join(","))).unwrap();
        let a = Args {
            input: Some(p.display().to_string()),
            html: Some(dir.path().join("d.html").display().to_string()),
            ..args()
        };
        let err = run_dashboard(&a).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "{}: schema mismatch: expected 19 columns but the source has 18",
                p.display()
            )
        );
        assert!(!dir.path().join("d.html").exists());
    }
}
