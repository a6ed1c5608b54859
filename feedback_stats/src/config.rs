// ********* Input data structures ***********

use std::collections::HashSet;
use std::error::Error;
use std::fmt::Display;

/// Number of columns in a feedback export, in the order of [SCHEMA].
pub const SCHEMA_SIZE: usize = 19;

/// The internal name of every column, in positional order.
pub const SCHEMA: [&str; SCHEMA_SIZE] = [
    "role",
    "s_content",
    "s_lecturer",
    "s_structure",
    "s_practicality",
    "s_knowledge",
    "s_interaction",
    "s_time",
    "s_overall",
    "f_hypothesis",
    "f_p_value",
    "f_error_type",
    "f_ab_flow",
    "f_ab_code",
    "useful_content",
    "attractive_part",
    "suggestions",
    "feedback_to_lecturer",
    "additional_comments",
];

/// A numeric 1-5 question of the survey.
///
/// The eight `S*` variants are the satisfaction dimensions, the five `F*`
/// variants the post-course familiarity topics.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum ScoreField {
    SContent,
    SLecturer,
    SStructure,
    SPracticality,
    SKnowledge,
    SInteraction,
    STime,
    SOverall,
    FHypothesis,
    FPValue,
    FErrorType,
    FAbFlow,
    FAbCode,
}

pub const NUM_SCORES: usize = 13;

impl ScoreField {
    pub const ALL: [ScoreField; NUM_SCORES] = [
        ScoreField::SContent,
        ScoreField::SLecturer,
        ScoreField::SStructure,
        ScoreField::SPracticality,
        ScoreField::SKnowledge,
        ScoreField::SInteraction,
        ScoreField::STime,
        ScoreField::SOverall,
        ScoreField::FHypothesis,
        ScoreField::FPValue,
        ScoreField::FErrorType,
        ScoreField::FAbFlow,
        ScoreField::FAbCode,
    ];

    /// Position in [Response::scores].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Position of the column in the source table. The role comes first.
    pub fn column(&self) -> usize {
        self.index() + 1
    }

    pub fn name(&self) -> &'static str {
        SCHEMA[self.column()]
    }

    pub fn from_name(name: &str) -> Option<ScoreField> {
        ScoreField::ALL.iter().find(|f| f.name() == name).cloned()
    }
}

/// The four open questions, in the order they are concatenated.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum TextField {
    AttractivePart,
    Suggestions,
    FeedbackToLecturer,
    AdditionalComments,
}

impl TextField {
    pub const ALL: [TextField; 4] = [
        TextField::AttractivePart,
        TextField::Suggestions,
        TextField::FeedbackToLecturer,
        TextField::AdditionalComments,
    ];

    pub fn column(&self) -> usize {
        15 + *self as usize
    }

    pub fn name(&self) -> &'static str {
        SCHEMA[self.column()]
    }
}

pub(crate) const ROLE_COLUMN: usize = 0;
pub(crate) const USEFUL_CONTENT_COLUMN: usize = 14;

/// One answer to the feedback form.
#[derive(PartialEq, Debug, Clone)]
pub struct Response {
    pub role: String,
    /// Indexed by [ScoreField::index]. Blank or unreadable cells are `None`.
    pub scores: [Option<f64>; NUM_SCORES],
    /// Raw multi-select answer. It is kept as-is.
    pub useful_content: Option<String>,
    pub attractive_part: Option<String>,
    pub suggestions: Option<String>,
    pub feedback_to_lecturer: Option<String>,
    pub additional_comments: Option<String>,
}

impl Response {
    pub fn score(&self, field: ScoreField) -> Option<f64> {
        self.scores[field.index()]
    }

    pub fn text(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::AttractivePart => self.attractive_part.as_deref(),
            TextField::Suggestions => self.suggestions.as_deref(),
            TextField::FeedbackToLecturer => self.feedback_to_lecturer.as_deref(),
            TextField::AdditionalComments => self.additional_comments.as_deref(),
        }
    }
}

/// The loaded responses. Rows are never modified once the table is built.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    /// Source headers, trimmed and without line breaks.
    pub headers: Vec<String>,
    pub rows: Vec<Response>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The distinct roles, in order of first appearance.
    pub fn roles(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut res: Vec<String> = Vec::new();
        for r in self.rows.iter() {
            if seen.insert(r.role.as_str()) {
                res.push(r.role.clone());
            }
        }
        res
    }
}

// ******** Aggregation settings *********

/// An ordered list of score columns with their display labels.
#[derive(PartialEq, Debug, Clone)]
pub struct ColumnSet {
    pub columns: Vec<(ScoreField, String)>,
}

impl ColumnSet {
    pub fn new(columns: &[(ScoreField, &str)]) -> ColumnSet {
        ColumnSet {
            columns: columns
                .iter()
                .map(|(f, l)| (*f, l.to_string()))
                .collect(),
        }
    }

    pub fn satisfaction() -> ColumnSet {
        ColumnSet::new(&[
            (ScoreField::SContent, "課程內容"),
            (ScoreField::SLecturer, "講師技巧"),
            (ScoreField::SStructure, "課程結構"),
            (ScoreField::SPracticality, "課程實用性"),
            (ScoreField::SKnowledge, "新知學習"),
            (ScoreField::SInteraction, "互動參與"),
            (ScoreField::STime, "時間合理性"),
            (ScoreField::SOverall, "整體滿意度"),
        ])
    }

    pub fn familiarity() -> ColumnSet {
        ColumnSet::new(&[
            (ScoreField::FHypothesis, "假設檢定"),
            (ScoreField::FPValue, "P值概念"),
            (ScoreField::FErrorType, "型一/二錯誤"),
            (ScoreField::FAbFlow, "A/B Test流程"),
            (ScoreField::FAbCode, "A/B Test程式碼"),
        ])
    }

    /// Replaces the label of each field present in `labels`.
    pub fn with_labels(mut self, labels: &[(ScoreField, String)]) -> ColumnSet {
        for (field, label) in self.columns.iter_mut() {
            if let Some((_, l)) = labels.iter().find(|(f, _)| f == field) {
                *label = l.clone();
            }
        }
        self
    }
}

/// Tokens that never make it into the word cloud.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub const DEFAULT_WORDS: [&'static str; 31] = [
        "的", "是", "在", "我", "有", "也", "了", "都", "個", "很", "可以", "老師", "講師", " ", "無",
        "沒有", "希望", "覺得", "課程", "部分", "什麼", "地方", "一些", "這個", "the", "to", "and",
        "a", "test", "ab", "testing",
    ];

    pub fn new<S: AsRef<str>>(words: &[S]) -> StopWords {
        StopWords {
            words: words.iter().map(|w| w.as_ref().to_string()).collect(),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopWords {
    fn default() -> Self {
        StopWords::new(&StopWords::DEFAULT_WORDS)
    }
}

// ******** Output data structures *********

/// The mean of one column of a [ColumnSet].
#[derive(PartialEq, Debug, Clone)]
pub struct ColumnMean {
    pub field: ScoreField,
    pub label: String,
    /// `None` when no row has a value for this column.
    pub mean: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct Kpis {
    pub total_responses: usize,
    pub avg_overall_satisfaction: Option<f64>,
}

impl Kpis {
    /// The overall satisfaction as displayed: `4.25 / 5.0`.
    pub fn overall_display(&self) -> String {
        format!("{} / 5.0", format_mean(self.avg_overall_satisfaction))
    }
}

/// Two decimals, or `n/a` for a column without values.
pub fn format_mean(m: Option<f64>) -> String {
    match m {
        Some(x) => format!("{:.2}", x),
        None => "n/a".to_string(),
    }
}

/// One entry of the full-text listing.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ListedResponse {
    /// Starts at 1 for every filtered view.
    pub index: usize,
    pub role: String,
    pub attractive_part: String,
    pub suggestions: String,
    pub feedback_to_lecturer: String,
    /// Left out of the listing when blank.
    pub additional_comments: Option<String>,
}

/// Errors raised while building a [Table] from raw cells.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum FeedbackError {
    SchemaMismatch { expected: usize, actual: usize },
    RowLength {
        lineno: usize,
        expected: usize,
        actual: usize,
    },
}

impl Error for FeedbackError {}

impl Display for FeedbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackError::SchemaMismatch { expected, actual } => write!(
                f,
                "schema mismatch: expected {} columns but the source has {}",
                expected, actual
            ),
            FeedbackError::RowLength {
                lineno,
                expected,
                actual,
            } => write!(
                f,
                "line {}: expected {} cells but found {}",
                lineno, expected, actual
            ),
        }
    }
}
