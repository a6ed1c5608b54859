use crate::dashboard::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct InputSource {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct WordCloudSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(rename = "maxWords")]
    pub max_words: Option<usize>,
    #[serde(rename = "minFontSize")]
    pub min_font_size: Option<f64>,
    #[serde(rename = "maxFontSize")]
    pub max_font_size: Option<f64>,
    #[serde(rename = "backgroundColor")]
    pub background_color: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "inputSource")]
    pub input_source: Option<InputSource>,
    #[serde(rename = "fontPath")]
    pub font_path: Option<String>,
    #[serde(rename = "stopWords")]
    pub stop_words: Option<Vec<String>>,
    /// Internal column name (s_content, ...) to display label.
    #[serde(rename = "satisfactionLabels")]
    pub satisfaction_labels: Option<BTreeMap<String, String>>,
    #[serde(rename = "familiarityLabels")]
    pub familiarity_labels: Option<BTreeMap<String, String>>,
    #[serde(rename = "wordCloud", default)]
    pub word_cloud: WordCloudSettings,
}

impl WordCloudSettings {
    pub fn options(&self) -> WordCloudOptions {
        let d = WordCloudOptions::default();
        WordCloudOptions {
            width: self.width.unwrap_or(d.width),
            height: self.height.unwrap_or(d.height),
            max_words: self.max_words.unwrap_or(d.max_words),
            min_font_size: self.min_font_size.unwrap_or(d.min_font_size),
            max_font_size: self.max_font_size.unwrap_or(d.max_font_size),
            background_color: self
                .background_color
                .clone()
                .unwrap_or(d.background_color),
        }
    }
}

pub fn read_config(path: &str) -> BDashResult<DashboardConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashboardConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Applies the labels of the configuration to a column set. Every key must
/// name a column of the set.
pub fn column_set_with_labels(
    base: ColumnSet,
    labels: &Option<BTreeMap<String, String>>,
) -> DashResult<ColumnSet> {
    let labels = match labels {
        Some(l) => l,
        None => return Ok(base),
    };
    let mut res: Vec<(ScoreField, String)> = Vec::new();
    for (name, label) in labels.iter() {
        match ScoreField::from_name(name) {
            Some(f) if base.columns.iter().any(|(bf, _)| *bf == f) => {
                res.push((f, label.clone()));
            }
            _ => whatever!("unknown column {:?} in the label configuration", name),
        }
    }
    Ok(base.with_labels(&res))
}

pub fn read_summary(path: String) -> BDashResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
