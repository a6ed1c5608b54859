// HTML and SVG output of a dashboard pass.

use std::path::Path;

use handlebars::Handlebars;
use serde::Serialize;

use crate::dashboard::wordcloud::{self, WordCloud, WordCloudOptions};
use crate::dashboard::*;

pub const INSUFFICIENT_TEXT: &str = "在目前的篩選條件下，沒有足夠的文字回饋來產生詞雲。";

const FONT_FAMILY: &str = "FeedbackCJK";
const FALLBACK_FONTS: &str = "'Noto Sans TC', 'PingFang TC', 'Microsoft JhengHei', sans-serif";

/// The font file that provides the Chinese glyphs.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FontResource {
    pub path: String,
    /// Location usable from the HTML page.
    pub url: Option<String>,
    pub available: bool,
    pub family: String,
}

impl FontResource {
    pub fn probe(path: &Path) -> FontResource {
        let available = path.is_file();
        if !available {
            warn!("Font resource {:?} not found, charts fall back to system fonts", path);
        }
        FontResource {
            path: path.display().to_string(),
            url: fs::canonicalize(path)
                .ok()
                .map(|p| format!("file://{}", p.display())),
            available,
            family: FONT_FAMILY.to_string(),
        }
    }

    /// The CSS font stack.
    pub fn css_stack(&self) -> String {
        if self.available {
            format!("'{}', {}", self.family, FALLBACK_FONTS)
        } else {
            FALLBACK_FONTS.to_string()
        }
    }
}

/// What the word cloud panel shows.
#[derive(PartialEq, Debug, Clone)]
pub enum WordCloudPanel {
    Image(WordCloud),
    Info(String),
    Error(String),
}

/// Runs the word cloud layout. Failures only affect the panel.
pub fn word_cloud_panel(
    pass: &DashboardPass,
    font: &FontResource,
    options: &WordCloudOptions,
) -> WordCloudPanel {
    if pass.corpus_empty {
        return WordCloudPanel::Info(INSUFFICIENT_TEXT.to_string());
    }
    match wordcloud::generate(&pass.tokens, font, options) {
        Ok(wc) => WordCloudPanel::Image(wc),
        Err(e) => {
            warn!("Word cloud generation failed: {}", e);
            WordCloudPanel::Error(panel_error(&e))
        }
    }
}

fn panel_error(e: &dyn std::error::Error) -> String {
    format!("產生詞雲時發生錯誤: {}", e)
}

// ******** Template views *********

#[derive(Serialize, Debug)]
struct BarView {
    label: String,
    value_text: String,
    y: String,
    text_y: String,
    bar_width: String,
    value_x: String,
}

#[derive(Serialize, Debug)]
struct TickView {
    x: String,
    label: String,
}

#[derive(Serialize, Debug)]
struct ChartView {
    title: String,
    x_label: String,
    font_stack: String,
    color: String,
    width: u32,
    height: u32,
    plot_left: u32,
    plot_top: u32,
    plot_bottom: u32,
    plot_right: u32,
    title_x: u32,
    x_label_y: u32,
    bar_height: u32,
    bars: Vec<BarView>,
    ticks: Vec<TickView>,
}

#[derive(Serialize, Debug)]
struct WordView {
    text: String,
    x: String,
    y: String,
    size: String,
    color: String,
    count: usize,
}

#[derive(Serialize, Debug)]
struct WordCloudView {
    width: u32,
    height: u32,
    background_color: String,
    font_stack: String,
    words: Vec<WordView>,
}

#[derive(Serialize, Debug)]
struct RoleView {
    name: String,
    selected: bool,
}

#[derive(Serialize, Debug)]
struct ResponseView {
    index: usize,
    role: String,
    attractive_part: String,
    suggestions: String,
    feedback_to_lecturer: String,
    additional_comments: Option<String>,
}

#[derive(Serialize, Debug)]
struct DashboardView {
    title: String,
    description: String,
    font_face_url: Option<String>,
    font_family: String,
    font_stack: String,
    warnings: Vec<String>,
    roles: Vec<RoleView>,
    no_filter: bool,
    total_responses: String,
    overall_satisfaction: String,
    satisfaction_chart: String,
    familiarity_chart: String,
    word_cloud_svg: Option<String>,
    word_cloud_info: Option<String>,
    word_cloud_error: Option<String>,
    responses: Vec<ResponseView>,
}

const CHART_WIDTH: u32 = 640;
const CHART_LEFT: u32 = 170;
const CHART_RIGHT_MARGIN: u32 = 60;
const CHART_TOP: u32 = 50;
const CHART_BOTTOM_MARGIN: u32 = 60;
const ROW_HEIGHT: u32 = 40;
const SCALE_MAX: f64 = 5.0;

fn chart_view(
    title: &str,
    means: &[ColumnMean],
    color: &str,
    font: &FontResource,
) -> ChartView {
    let plot_right = CHART_WIDTH - CHART_RIGHT_MARGIN;
    let plot_width = (plot_right - CHART_LEFT) as f64;
    let scale = |v: f64| v.clamp(0.0, SCALE_MAX) / SCALE_MAX * plot_width;
    let plot_bottom = CHART_TOP + ROW_HEIGHT * means.len() as u32;
    let bar_height = ROW_HEIGHT * 7 / 10;

    // The first (lowest) mean is drawn at the bottom.
    let bars: Vec<BarView> = means
        .iter()
        .rev()
        .enumerate()
        .map(|(row, m)| {
            let top = CHART_TOP + ROW_HEIGHT * row as u32 + (ROW_HEIGHT - bar_height) / 2;
            let width = m.mean.map(scale).unwrap_or(0.0);
            BarView {
                label: m.label.clone(),
                value_text: format_mean(m.mean),
                y: top.to_string(),
                text_y: format!("{:.1}", top as f64 + bar_height as f64 * 0.7),
                bar_width: format!("{:.1}", width),
                value_x: format!("{:.1}", CHART_LEFT as f64 + width + scale(0.05)),
            }
        })
        .collect();
    let ticks: Vec<TickView> = (0..=5)
        .map(|i| TickView {
            x: format!("{:.1}", CHART_LEFT as f64 + scale(i as f64)),
            label: i.to_string(),
        })
        .collect();
    ChartView {
        title: title.to_string(),
        x_label: "平均分數".to_string(),
        font_stack: font.css_stack(),
        color: color.to_string(),
        width: CHART_WIDTH,
        height: plot_bottom + CHART_BOTTOM_MARGIN,
        plot_left: CHART_LEFT,
        plot_top: CHART_TOP,
        plot_bottom,
        plot_right,
        title_x: CHART_WIDTH / 2,
        x_label_y: plot_bottom + 45,
        bar_height,
        bars,
        ticks,
    }
}

fn word_cloud_view(wc: &WordCloud, font: &FontResource) -> WordCloudView {
    WordCloudView {
        width: wc.width,
        height: wc.height,
        background_color: wc.background_color.clone(),
        font_stack: font.css_stack(),
        words: wc
            .words
            .iter()
            .map(|w| WordView {
                text: w.word.clone(),
                x: format!("{:.1}", w.x),
                y: format!("{:.1}", w.baseline()),
                size: format!("{:.1}", w.font_size),
                color: w.color.to_string(),
                count: w.count,
            })
            .collect(),
    }
}

const BAR_CHART_TEMPLATE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="{{width}}" height="{{height}}" viewBox="0 0 {{width}} {{height}}" font-family="{{font_stack}}">
  <rect width="100%" height="100%" fill="white"/>
  <text x="{{title_x}}" y="28" font-size="18" text-anchor="middle">{{title}}</text>
  {{#each ticks}}<line x1="{{x}}" y1="{{../plot_top}}" x2="{{x}}" y2="{{../plot_bottom}}" stroke="#e0e0e0"/>
  <text x="{{x}}" y="{{../plot_bottom}}" dy="18" font-size="12" text-anchor="middle">{{label}}</text>
  {{/each}}{{#each bars}}<text x="{{../plot_left}}" dx="-8" y="{{text_y}}" font-size="14" text-anchor="end">{{label}}</text>
  <rect x="{{../plot_left}}" y="{{y}}" width="{{bar_width}}" height="{{../bar_height}}" fill="{{../color}}"/>
  <text x="{{value_x}}" y="{{text_y}}" font-size="13">{{value_text}}</text>
  {{/each}}<line x1="{{plot_left}}" y1="{{plot_bottom}}" x2="{{plot_right}}" y2="{{plot_bottom}}" stroke="black"/>
  <text x="{{title_x}}" y="{{x_label_y}}" font-size="14" text-anchor="middle">{{x_label}}</text>
</svg>"##;

const WORD_CLOUD_TEMPLATE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="{{width}}" height="{{height}}" viewBox="0 0 {{width}} {{height}}" font-family="{{font_stack}}">
  <rect width="100%" height="100%" fill="{{background_color}}"/>
  {{#each words}}<text x="{{x}}" y="{{y}}" font-size="{{size}}" fill="{{color}}"><title>{{text}}: {{count}}</title>{{text}}</text>
  {{/each}}
</svg>"##;

const DASHBOARD_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>
{{#if font_face_url}}@font-face { font-family: '{{{font_family}}}'; src: url("{{{font_face_url}}}"); }
{{/if}}body { font-family: {{{font_stack}}}; margin: 0; display: flex; }
aside { width: 220px; padding: 1em; background: #f0f2f6; min-height: 100vh; }
main { flex: 1; padding: 1em 2em; }
.kpis { display: flex; gap: 4em; }
.kpi .value { font-size: 2em; }
.tabs > input { display: none; }
.tabs > label { padding: 0.5em 1em; cursor: pointer; border-bottom: 2px solid transparent; }
.tabs > input:checked + label { border-bottom-color: #ff4b4b; }
.panel { display: none; padding-top: 1em; }
#tab-charts:checked ~ #panel-charts, #tab-cloud:checked ~ #panel-cloud, #tab-text:checked ~ #panel-text { display: block; }
.columns { display: flex; flex-wrap: wrap; gap: 2em; }
.warning { background: #fff8e1; padding: 0.5em 1em; }
.info { background: #e8f0fe; padding: 0.5em 1em; }
.error { background: #fdecea; padding: 0.5em 1em; }
blockquote { border-left: 3px solid #ccc; margin: 0.3em 0 1em 0; padding-left: 0.8em; white-space: pre-wrap; }
</style>
</head>
<body>
<aside>
<h2>篩選器</h2>
<hr>
<h4>選擇身份查看</h4>
<ul>
{{#each roles}}<li>{{#if selected}}☑{{else}}☐{{/if}} {{name}}</li>
{{/each}}</ul>
{{#if no_filter}}<p><small>未選擇身份時不套用篩選，顯示全部回饋。</small></p>{{/if}}
</aside>
<main>
<h1>{{title}}</h1>
<p>{{description}}</p>
{{#each warnings}}<p class="warning">⚠️ {{this}}</p>
{{/each}}<div class="kpis">
<div class="kpi"><div>總回饋數</div><div class="value">{{total_responses}}</div></div>
<div class="kpi"><div>平均整體滿意度</div><div class="value">{{overall_satisfaction}}</div></div>
</div>
<hr>
<div class="tabs">
<input type="radio" name="tabs" id="tab-charts" checked><label for="tab-charts">📈 滿意度與熟悉度分析</label>
<input type="radio" name="tabs" id="tab-cloud"><label for="tab-cloud">☁️ 文字回饋與詞雲</label>
<input type="radio" name="tabs" id="tab-text"><label for="tab-text">📄 完整回饋留言</label>
<section class="panel" id="panel-charts">
<h2>各項滿意度與主題熟悉度分佈</h2>
<div class="columns">
<div><h3>課程滿意度 (1-5分)</h3>
{{{satisfaction_chart}}}
</div>
<div><h3>課後主題熟悉度 (1-5分)</h3>
{{{familiarity_chart}}}
</div>
</div>
</section>
<section class="panel" id="panel-cloud">
<h2>Word Cloud</h2>
{{#if word_cloud_svg}}{{{word_cloud_svg}}}{{/if}}
{{#if word_cloud_info}}<p class="info">{{word_cloud_info}}</p>{{/if}}
{{#if word_cloud_error}}<p class="error">{{word_cloud_error}}</p>{{/if}}
</section>
<section class="panel" id="panel-text">
<h2>完整回饋留言</h2>
<p>以下是篩選後，每份回饋的完整文字內容。</p>
{{#each responses}}<details>
<summary>💬 回饋 #{{index}} ({{role}})</summary>
<p><strong>【最吸引我的部分】</strong></p><blockquote>{{attractive_part}}</blockquote>
<p><strong>【期待與建議】</strong></p><blockquote>{{suggestions}}</blockquote>
<p><strong>【給講師的回饋】</strong></p><blockquote>{{feedback_to_lecturer}}</blockquote>
{{#if additional_comments}}<p><strong>【補充事項】</strong></p><blockquote>{{additional_comments}}</blockquote>
{{/if}}</details>
{{/each}}
</section>
</div>
</main>
</body>
</html>
"##;

pub struct Renderer {
    hb: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> DashResult<Renderer> {
        let mut hb = Handlebars::new();
        for (name, tpl) in [
            ("bar_chart", BAR_CHART_TEMPLATE),
            ("word_cloud", WORD_CLOUD_TEMPLATE),
            ("dashboard", DASHBOARD_TEMPLATE),
        ] {
            hb.register_template_string(name, tpl)
                .context(TemplateRegistrationSnafu { name })?;
        }
        Ok(Renderer { hb })
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> DashResult<String> {
        self.hb
            .render(name, data)
            .context(TemplateRenderingSnafu { name })
    }

    pub fn bar_chart(
        &self,
        title: &str,
        means: &[ColumnMean],
        color: &str,
        font: &FontResource,
    ) -> DashResult<String> {
        self.render("bar_chart", &chart_view(title, means, color, font))
    }

    pub fn word_cloud(&self, wc: &WordCloud, font: &FontResource) -> DashResult<String> {
        self.render("word_cloud", &word_cloud_view(wc, font))
    }

    /// The svg, info and error slots of the word cloud panel. A template
    /// error is shown in the panel too.
    fn panel_slots(
        &self,
        panel: WordCloudPanel,
        font: &FontResource,
    ) -> (Option<String>, Option<String>, Option<String>) {
        match panel {
            WordCloudPanel::Image(wc) => match self.word_cloud(&wc, font) {
                Ok(svg) => (Some(svg), None, None),
                Err(e) => {
                    warn!("Word cloud rendering failed: {}", e);
                    (None, None, Some(panel_error(&e)))
                }
            },
            WordCloudPanel::Info(msg) => (None, Some(msg), None),
            WordCloudPanel::Error(msg) => (None, None, Some(msg)),
        }
    }

    /// The complete page for one pass.
    pub fn dashboard(
        &self,
        pass: &DashboardPass,
        settings: &DashboardSettings,
        font: &FontResource,
    ) -> DashResult<String> {
        let mut warnings: Vec<String> = Vec::new();
        if !font.available {
            warnings.push(format!(
                "找不到字型檔 {}，圖表改用系統字型，詞雲無法產生。",
                font.path
            ));
        }

        let satisfaction_chart =
            self.bar_chart("各項滿意度平均分數", &pass.satisfaction, "skyblue", font)?;
        let familiarity_chart =
            self.bar_chart("課後主題熟悉度平均分數", &pass.familiarity, "lightgreen", font)?;

        let (word_cloud_svg, word_cloud_info, word_cloud_error) =
            self.panel_slots(word_cloud_panel(pass, font, &settings.word_cloud), font);

        let view = DashboardView {
            title: settings.title.clone(),
            description: settings.description.clone(),
            font_face_url: if font.available {
                font.url.clone()
            } else {
                None
            },
            font_family: font.family.clone(),
            font_stack: font.css_stack(),
            warnings,
            roles: pass
                .roles
                .iter()
                .map(|r| RoleView {
                    name: r.clone(),
                    selected: pass.selected_roles.is_empty() || pass.selected_roles.contains(r),
                })
                .collect(),
            no_filter: pass.selected_roles.is_empty(),
            total_responses: format!("{} 份", pass.kpis.total_responses),
            overall_satisfaction: pass.kpis.overall_display(),
            satisfaction_chart,
            familiarity_chart,
            word_cloud_svg,
            word_cloud_info,
            word_cloud_error,
            responses: pass
                .listing
                .iter()
                .map(|l| ResponseView {
                    index: l.index,
                    role: l.role.clone(),
                    attractive_part: l.attractive_part.clone(),
                    suggestions: l.suggestions.clone(),
                    feedback_to_lecturer: l.feedback_to_lecturer.clone(),
                    additional_comments: l.additional_comments.clone(),
                })
                .collect(),
        };
        self.render("dashboard", &view)
    }
}
