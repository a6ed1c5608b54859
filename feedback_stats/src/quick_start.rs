/*!

# Quick start

`feedback_stats` works on the export of a course-feedback form with 19
columns: the role of the respondent, eight satisfaction questions, five
familiarity questions, one multi-select question and four open questions.
The columns are read by position, in the order of [crate::SCHEMA].

## Building a table

The cells are passed as strings, as they come out of a CSV reader:

```
use feedback_stats::*;

let header: Vec<String> = SCHEMA.iter().map(|s| s.to_string()).collect();
let mut row: Vec<String> = vec!["幹部".to_string()];
row.extend(std::iter::repeat("4".to_string()).take(13));
row.extend(["".to_string(), "實作".to_string(), "".to_string(), "".to_string(), "".to_string()]);

let table = table_from_rows(&header, &[row])?;
assert_eq!(table.len(), 1);
assert_eq!(table.roles(), vec!["幹部".to_string()]);
# Ok::<(), FeedbackError>(())
```

A header that does not have exactly 19 columns is an error, and no partial
table is returned.

## Filtering and aggregating

```
use feedback_stats::*;

let table = Table::default();
// No role selected: everything is shown.
let view = filter_roles(&table, &[]);
let satisfaction = aggregate(&view, &ColumnSet::satisfaction());
assert_eq!(satisfaction.len(), 8);
assert_eq!(kpis(&view).overall_display(), "n/a / 5.0");
```

The means come sorted by increasing value, which is the order of a
horizontal bar chart drawn from the bottom.

## Word cloud input

[build_wordcloud_input] concatenates the open answers, segments the text with
a [Segmenter] and removes the [StopWords]. The [JiebaSegmenter] handles mixed
Chinese and English answers.

*/
