// Preparation of the free-text answers for the word cloud.

use jieba_rs::Jieba;
use log::debug;

use crate::config::*;

/// Splits a document into word tokens.
///
/// Chinese has no spaces between words, so a plain whitespace split is not
/// enough for mixed-script answers.
pub trait Segmenter {
    fn segment<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Dictionary-based segmentation, with the HMM model for unknown words.
pub struct JiebaSegmenter {
    jieba: Jieba,
}

impl JiebaSegmenter {
    /// Loads the embedded dictionary. This takes a noticeable amount of time,
    /// build it once per process.
    pub fn new() -> JiebaSegmenter {
        JiebaSegmenter {
            jieba: Jieba::new(),
        }
    }
}

impl Default for JiebaSegmenter {
    fn default() -> Self {
        JiebaSegmenter::new()
    }
}

impl Segmenter for JiebaSegmenter {
    fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.jieba.cut(text, true)
    }
}

/// All the open answers of one respondent, separated by a space.
pub fn response_text(r: &Response) -> String {
    TextField::ALL
        .iter()
        .map(|f| r.text(*f).unwrap_or(""))
        .collect::<Vec<&str>>()
        .join(" ")
}

/// The whole corpus of the table.
pub fn corpus(table: &Table) -> String {
    table
        .rows
        .iter()
        .map(response_text)
        .collect::<Vec<String>>()
        .join(" ")
}

/// True if the token should be counted in the word cloud.
pub fn keep_token(token: &str, stop_words: &StopWords) -> bool {
    !stop_words.contains(token) && token.chars().count() > 1 && !token.trim().is_empty()
}

/// The tokens of the word cloud, in the order of the segmentation.
///
/// Returns an empty list when the table has no text at all. Frequencies are
/// left to the renderer.
///
/// ```
/// use feedback_stats::*;
///
/// struct Words;
/// impl Segmenter for Words {
///     fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
///         text.split(' ').collect()
///     }
/// }
///
/// let tokens = build_wordcloud_input(&Table::default(), &Words, &StopWords::default());
/// assert!(tokens.is_empty());
/// ```
pub fn build_wordcloud_input(
    table: &Table,
    segmenter: &dyn Segmenter,
    stop_words: &StopWords,
) -> Vec<String> {
    let document = corpus(table);
    if document.trim().is_empty() {
        debug!("build_wordcloud_input: empty corpus for {} rows", table.len());
        return Vec::new();
    }
    let segments = segmenter.segment(&document);
    let num_segments = segments.len();
    let tokens: Vec<String> = segments
        .into_iter()
        .filter(|t| keep_token(t, stop_words))
        .map(|t| t.to_string())
        .collect();
    debug!(
        "build_wordcloud_input: {} segments, {} kept",
        num_segments,
        tokens.len()
    );
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table_from_rows;

    struct SpaceSegmenter;

    impl Segmenter for SpaceSegmenter {
        fn segment<'a>(&self, text: &'a str) -> Vec<&'a str> {
            text.split(' ').collect()
        }
    }

    fn row(role: &str, texts: [&str; 4]) -> Vec<String> {
        let mut cells: Vec<String> = vec![role.to_string()];
        cells.extend(std::iter::repeat("4".to_string()).take(NUM_SCORES));
        cells.push("".to_string());
        cells.extend(texts.iter().map(|s| s.to_string()));
        cells
    }

    fn table(rows: &[Vec<String>]) -> Table {
        let header: Vec<String> = SCHEMA.iter().map(|s| s.to_string()).collect();
        table_from_rows(&header, rows).unwrap()
    }

    #[test]
    fn response_text_keeps_field_order() {
        let t = table(&[row("lead", ["alpha", "", "gamma", "delta"])]);
        assert_eq!(response_text(&t.rows[0]), "alpha  gamma delta");
    }

    #[test]
    fn corpus_joins_rows() {
        let t = table(&[
            row("lead", ["one", "", "", ""]),
            row("member", ["two", "", "", ""]),
        ]);
        assert_eq!(corpus(&t), "one    two   ");
    }

    #[test]
    fn empty_text_gives_no_tokens() {
        let t = table(&[row("lead", ["", "", "", ""]), row("member", ["  ", "", "", ""])]);
        let tokens = build_wordcloud_input(&t, &SpaceSegmenter, &StopWords::default());
        assert!(tokens.is_empty());
    }

    #[test]
    fn only_stop_words_give_no_tokens() {
        let t = table(&[row("lead", ["the and to", "a x", "testing 很", "可以 y"])]);
        let tokens = build_wordcloud_input(&t, &SpaceSegmenter, &StopWords::default());
        assert!(tokens.is_empty());
    }

    #[test]
    fn tokens_keep_segmentation_order() {
        let t = table(&[
            row("lead", ["pandas rocks", "", "", ""]),
            row("member", ["more pandas", "", "", ""]),
        ]);
        let tokens = build_wordcloud_input(&t, &SpaceSegmenter, &StopWords::default());
        assert_eq!(tokens, vec!["pandas", "rocks", "more", "pandas"]);
    }

    #[test]
    fn custom_stop_words() {
        let t = table(&[row("lead", ["pandas rocks", "", "", ""])]);
        let tokens = build_wordcloud_input(&t, &SpaceSegmenter, &StopWords::new(&["rocks"]));
        assert_eq!(tokens, vec!["pandas"]);
    }

    #[test]
    fn single_characters_are_dropped() {
        assert!(!keep_token("好", &StopWords::default()));
        assert!(!keep_token("x", &StopWords::default()));
        assert!(!keep_token("  ", &StopWords::default()));
        assert!(keep_token("統計", &StopWords::default()));
    }

    #[test]
    fn jieba_output_is_filtered() {
        let t = table(&[row(
            "lead",
            ["我覺得課程很有趣", "希望有更多 Python 範例", "the lecturer", ""],
        )]);
        let stop_words = StopWords::default();
        let tokens = build_wordcloud_input(&t, &JiebaSegmenter::new(), &stop_words);
        assert!(!tokens.is_empty());
        for tok in tokens.iter() {
            assert!(tok.chars().count() > 1, "{:?}", tok);
            assert!(!stop_words.contains(tok), "{:?}", tok);
        }
    }
}
