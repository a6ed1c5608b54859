// Frequency-driven word cloud layout.

use std::collections::HashMap;

use log::debug;
use snafu::Snafu;

use crate::dashboard::render::FontResource;

#[derive(Debug, Snafu)]
pub enum WordCloudError {
    #[snafu(display("font resource {path} is not available"))]
    MissingFont { path: String },
    #[snafu(display("no words to draw"))]
    NoWords {},
    #[snafu(display("none of the {count} words fit on a {width}x{height} canvas"))]
    NothingPlaced { count: usize, width: u32, height: u32 },
}

#[derive(PartialEq, Debug, Clone)]
pub struct WordCloudOptions {
    pub width: u32,
    pub height: u32,
    pub max_words: usize,
    pub min_font_size: f64,
    pub max_font_size: f64,
    pub background_color: String,
}

impl Default for WordCloudOptions {
    fn default() -> Self {
        WordCloudOptions {
            width: 800,
            height: 400,
            max_words: 200,
            min_font_size: 10.0,
            max_font_size: 96.0,
            background_color: "white".to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct WordFrequency {
    pub word: String,
    pub count: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct PlacedWord {
    pub word: String,
    pub count: usize,
    pub font_size: f64,
    /// Top-left corner of the box of the word.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: &'static str,
}

impl PlacedWord {
    fn overlaps(&self, x: f64, y: f64, w: f64, h: f64) -> bool {
        x < self.x + self.width && self.x < x + w && y < self.y + self.height && self.y < y + h
    }

    /// Vertical position of the text baseline.
    pub fn baseline(&self) -> f64 {
        self.y + self.font_size * ASCENT
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct WordCloud {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub font_family: String,
    pub words: Vec<PlacedWord>,
}

const PALETTE: [&str; 8] = [
    "#440154", "#46327e", "#365c8d", "#277f8e", "#1fa187", "#4ac16d", "#a0da39", "#d9a200",
];
const ASCENT: f64 = 0.88;
const LINE_HEIGHT: f64 = 1.15;
const SHRINK: f64 = 0.8;
const SPIRAL_STEP: f64 = 0.1;

/// Counts the tokens. The most frequent come first, ties in order of first
/// appearance.
pub fn word_frequencies(tokens: &[String]) -> Vec<WordFrequency> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, t) in tokens.iter().enumerate() {
        counts.entry(t.as_str()).or_insert((0, pos)).0 += 1;
    }
    let mut v: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(w, (count, first))| (w, count, first))
        .collect();
    v.sort_by_key(|(_, count, first)| (std::cmp::Reverse(*count), *first));
    v.into_iter()
        .map(|(w, count, _)| WordFrequency {
            word: w.to_string(),
            count,
        })
        .collect()
}

/// East Asian wide characters take a full em, the others a bit more than half.
fn char_advance(c: char) -> f64 {
    match c {
        '\u{1100}'..='\u{115F}'
        | '\u{2E80}'..='\u{A4CF}'
        | '\u{AC00}'..='\u{D7A3}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FE30}'..='\u{FE4F}'
        | '\u{FF00}'..='\u{FF60}'
        | '\u{FFE0}'..='\u{FFE6}'
        | '\u{20000}'..='\u{3FFFD}' => 1.0,
        c if c.is_whitespace() => 0.3,
        _ => 0.6,
    }
}

/// Estimated size of the box of a word at a given font size.
pub fn text_extent(word: &str, font_size: f64) -> (f64, f64) {
    let em: f64 = word.chars().map(char_advance).sum();
    (em * font_size, font_size * LINE_HEIGHT)
}

/// Walks an Archimedean spiral from the centre of the canvas until the box
/// fits without touching any placed word.
fn find_spot(w: f64, h: f64, placed: &[PlacedWord], width: f64, height: f64) -> Option<(f64, f64)> {
    if w > width || h > height {
        return None;
    }
    let (cx, cy) = (width / 2.0, height / 2.0);
    let max_radius = (cx * cx + cy * cy).sqrt();
    let aspect = height / width;
    let mut t: f64 = 0.0;
    loop {
        let r = 2.0 * t;
        if r > max_radius {
            return None;
        }
        let x = cx + r * t.cos() - w / 2.0;
        let y = cy + r * aspect * t.sin() - h / 2.0;
        let inside = x >= 0.0 && y >= 0.0 && x + w <= width && y + h <= height;
        if inside && !placed.iter().any(|p| p.overlaps(x, y, w, h)) {
            return Some((x, y));
        }
        t += SPIRAL_STEP;
    }
}

/// Lays out the most frequent tokens on the canvas.
///
/// The font size grows linearly with the frequency of the word. A word that
/// cannot be placed is retried with smaller fonts, and dropped once the font
/// goes below the minimum size.
pub fn generate(
    tokens: &[String],
    font: &FontResource,
    options: &WordCloudOptions,
) -> Result<WordCloud, WordCloudError> {
    if !font.available {
        return Err(WordCloudError::MissingFont {
            path: font.path.clone(),
        });
    }
    let mut freqs = word_frequencies(tokens);
    freqs.truncate(options.max_words);
    if freqs.is_empty() {
        return Err(WordCloudError::NoWords {});
    }
    let max_count = freqs[0].count as f64;
    let (width, height) = (options.width as f64, options.height as f64);

    let mut placed: Vec<PlacedWord> = Vec::new();
    for (idx, wf) in freqs.iter().enumerate() {
        let rel = wf.count as f64 / max_count;
        let mut font_size =
            options.min_font_size + (options.max_font_size - options.min_font_size) * rel;
        while font_size >= options.min_font_size {
            let (w, h) = text_extent(&wf.word, font_size);
            if let Some((x, y)) = find_spot(w, h, &placed, width, height) {
                placed.push(PlacedWord {
                    word: wf.word.clone(),
                    count: wf.count,
                    font_size,
                    x,
                    y,
                    width: w,
                    height: h,
                    color: PALETTE[idx % PALETTE.len()],
                });
                break;
            }
            font_size *= SHRINK;
        }
        if placed.last().map(|p| p.word != wf.word).unwrap_or(true) {
            debug!("generate: no room left for {:?}", wf.word);
        }
    }

    if placed.is_empty() {
        return Err(WordCloudError::NothingPlaced {
            count: freqs.len(),
            width: options.width,
            height: options.height,
        });
    }
    debug!("generate: placed {} of {} words", placed.len(), freqs.len());
    Ok(WordCloud {
        width: options.width,
        height: options.height,
        background_color: options.background_color.clone(),
        font_family: font.family.clone(),
        words: placed,
    })
}
