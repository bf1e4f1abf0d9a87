use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::date::{NO_DATE_PLACEHOLDER, PublishedDate};
use crate::model::{CanonicalRecord, Format};

pub const CSV_HEADER: [&str; 12] = [
    "Read",
    "Owned",
    "Published",
    "Title",
    "Type",
    "Available In",
    "Hardcover",
    "Paperback",
    "Ebook",
    "Audiobook",
    "Movie",
    "Miniseries",
];

const AVAILABLE_MARK: &str = "✓";

static HYPERLINK_FORMULA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^=HYPERLINK\("((?:[^"]|"")*)",\s*"((?:[^"]|"")*)"\)$"#)
        .expect("hyperlink formula pattern")
});

/// Excel `=HYPERLINK(...)` formula with embedded double quotes doubled.
pub fn excel_hyperlink(url: &str, text: &str) -> String {
    let escaped_url = url.replace('"', "\"\"");
    let escaped_text = text.replace('"', "\"\"");
    format!("=HYPERLINK(\"{escaped_url}\", \"{escaped_text}\")")
}

/// Split a hyperlink formula back into (url, text). A cell that is not a
/// formula comes back with no url and its text unchanged.
pub fn parse_excel_hyperlink(cell: &str) -> (Option<String>, String) {
    match HYPERLINK_FORMULA.captures(cell) {
        Some(captures) => {
            let url = captures[1].replace("\"\"", "\"");
            let text = captures[2].replace("\"\"", "\"");
            (Some(url), text)
        }
        None => (None, cell.to_owned()),
    }
}

/// One canonical record as the 12 export cells, shared by the CSV writer and
/// the HTML table.
pub fn export_row(record: &CanonicalRecord) -> Vec<String> {
    let title_cell = if record.url.is_empty() {
        record.title.clone()
    } else {
        excel_hyperlink(&record.url, &record.title)
    };

    let collection_cell = match (&record.collection_name, &record.collection_url) {
        (Some(name), Some(url)) => excel_hyperlink(url, name),
        (Some(name), None) => name.clone(),
        (None, _) => String::new(),
    };

    let mut row = vec![
        String::new(), // Read
        String::new(), // Owned
        record.published_date.as_iso().unwrap_or_default(),
        title_cell,
        record.work_type.clone(),
        collection_cell,
    ];
    for format in Format::ALL {
        row.push(if record.formats.contains(&format) {
            AVAILABLE_MARK.to_owned()
        } else {
            String::new()
        });
    }
    row
}

pub fn write_csv(path: &Path, records: &[CanonicalRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create csv export: {}", path.display()))?;

    writer
        .write_record(CSV_HEADER)
        .context("write csv header")?;
    for record in records {
        writer
            .write_record(export_row(record))
            .with_context(|| format!("write csv row: {}", record.title))?;
    }

    writer
        .flush()
        .with_context(|| format!("flush csv export: {}", path.display()))?;
    Ok(())
}

pub fn write_html(path: &Path, rows: &[Vec<String>]) -> anyhow::Result<()> {
    let document = html_page(&html_table(rows));
    std::fs::write(path, document)
        .with_context(|| format!("write html export: {}", path.display()))?;
    Ok(())
}

/// Export file name carrying the run timestamp, e.g.
/// `stephen_king_works_20260101_120000.csv`.
pub fn timestamped_name(extension: &str, now: DateTime<Local>) -> String {
    format!("stephen_king_works_{}.{extension}", now.format("%Y%m%d_%H%M%S"))
}

fn html_table(rows: &[Vec<String>]) -> String {
    let mut table = String::from("<table class=\"works-table\">\n<thead>\n<tr>\n");
    for (index, header) in CSV_HEADER.iter().enumerate() {
        let class = column_class(index);
        table.push_str(&format!("<th class=\"{class}\">{header}</th>\n"));
    }
    table.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in rows {
        table.push_str("<tr>\n");

        let title_cell = cell(row, 3);
        let (_, title_text) = parse_excel_hyperlink(title_cell);
        let title_attr = html_escape(&title_text);

        let read = !cell(row, 0).is_empty();
        let owned = !cell(row, 1).is_empty();
        table.push_str(&checkbox_cell(&title_attr, "read", read));
        table.push_str(&checkbox_cell(&title_attr, "owned", owned));

        let (display_date, sort_date) = html_date(cell(row, 2));
        table.push_str(&format!(
            "<td class=\"date-col\" data-sort=\"{sort_date}\">{display_date}</td>\n"
        ));

        table.push_str(&format!(
            "<td class=\"title-col\">{}</td>\n",
            hyperlink_to_anchor(title_cell)
        ));
        table.push_str(&format!(
            "<td class=\"type-col\">{}</td>\n",
            html_escape(cell(row, 4))
        ));
        table.push_str(&format!(
            "<td class=\"collection-col\">{}</td>\n",
            hyperlink_to_anchor(cell(row, 5))
        ));

        for index in 6..CSV_HEADER.len() {
            table.push_str(&format!(
                "<td class=\"format-col\">{}</td>\n",
                html_escape(cell(row, index))
            ));
        }

        table.push_str("</tr>\n");
    }

    table.push_str("</tbody>\n</table>");
    table
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or_default()
}

fn column_class(index: usize) -> &'static str {
    match index {
        0 | 1 => "narrow-col",
        2 => "date-col",
        3 => "title-col",
        4 => "type-col",
        5 => "collection-col",
        _ => "format-col",
    }
}

fn checkbox_cell(title_attr: &str, kind: &str, checked: bool) -> String {
    let checked_attr = if checked { " checked" } else { "" };
    format!(
        "<td class=\"narrow-col\"><input type=\"checkbox\" class=\"status-checkbox\" \
         data-title=\"{title_attr}\" data-type=\"{kind}\"{checked_attr}></td>\n"
    )
}

/// Display/sort values for the date column. Empty and placeholder dates show
/// blank and carry a far-future sort key so they land at the bottom.
fn html_date(raw: &str) -> (String, String) {
    if raw.is_empty() || raw == NO_DATE_PLACEHOLDER {
        return (String::new(), "9999-99-99".to_owned());
    }
    match PublishedDate::parse(raw) {
        PublishedDate::Known(_) => (raw.to_owned(), raw.to_owned()),
        PublishedDate::Unknown => (String::new(), "9999-99-99".to_owned()),
    }
}

fn hyperlink_to_anchor(cell: &str) -> String {
    match parse_excel_hyperlink(cell) {
        (Some(url), text) => format!(
            "<a href=\"{}\"><strong>{}</strong></a>",
            html_escape(&url),
            html_escape(&text)
        ),
        (None, text) => html_escape(&text),
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn html_page(table: &str) -> String {
    format!(
        "{HTML_HEAD}\n<body>\n    <div class=\"container\">\n        \
         <h1>Stephen King Bibliography</h1>\n{table}\n    </div>\n</body>\n</html>\n"
    )
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Stephen King Bibliography</title>
    <link href="https://fonts.googleapis.com/css2?family=Plus+Jakarta+Sans:wght@400;500;600;800&display=swap" rel="stylesheet">
    <link href="https://fonts.googleapis.com/css2?family=Special+Elite&display=swap" rel="stylesheet">
    <link rel="stylesheet" type="text/css" href="https://cdn.datatables.net/1.13.4/css/jquery.dataTables.css">
    <style>
        :root {
            --blood-red: #8B0000;
            --border-color: #2c3e50;
            --hover-color: #2a2a2a;
            --text-secondary: #b3b3b3;
            --background-dark: #1e1e1e;
            --background-darker: #252525;
            --text-primary: #ffffff;
        }

        body {
            font-family: 'Plus Jakarta Sans', sans-serif;
            margin: 0;
            padding: 20px;
            background-color: var(--background-dark);
            color: var(--text-primary);
        }

        .container {
            max-width: 1200px;
            margin: 0 auto;
        }

        h1 {
            font-family: 'Special Elite', cursive;
            color: var(--blood-red);
            text-align: center;
            margin-bottom: 30px;
            text-shadow: 2px 2px 4px rgba(0,0,0,0.5);
            font-size: 3.5rem;
            letter-spacing: 2px;
        }

        .dataTables_wrapper {
            margin-top: 20px;
            padding: 20px;
            background-color: var(--background-darker);
            border-radius: 8px;
            box-shadow: 0 4px 6px rgba(0,0,0,0.3);
        }

        .dataTables_filter input,
        .dataTables_length select {
            border: 1px solid var(--border-color) !important;
            border-radius: 4px !important;
            padding: 6px 10px !important;
            background-color: var(--background-dark) !important;
            color: var(--text-primary) !important;
        }

        .works-table {
            background-color: var(--background-darker) !important;
            color: var(--text-primary) !important;
        }

        .works-table thead th {
            background-color: #990000 !important;
            color: var(--text-primary) !important;
            border-bottom: 2px solid var(--border-color) !important;
            cursor: pointer;
        }

        .works-table tbody td {
            background-color: var(--background-darker) !important;
            color: var(--text-primary) !important;
            border-bottom: 1px solid var(--border-color) !important;
        }

        .works-table tbody tr:hover td {
            background-color: var(--hover-color) !important;
        }

        .dataTables_info,
        .dataTables_length label,
        .dataTables_filter label {
            color: var(--text-secondary) !important;
        }

        .paginate_button {
            color: var(--text-secondary) !important;
            background-color: var(--background-darker) !important;
        }

        .paginate_button.current {
            color: var(--text-primary) !important;
            background-color: #990000 !important;
            border: 1px solid #990000 !important;
        }

        .works-table a {
            color: #cc0000 !important;
            text-decoration: none !important;
        }

        .works-table a:hover {
            color: #ff0000 !important;
            text-decoration: underline !important;
        }
    </style>
    <script type="text/javascript" src="https://code.jquery.com/jquery-3.7.0.min.js"></script>
    <script type="text/javascript" src="https://cdn.datatables.net/1.13.4/js/jquery.dataTables.min.js"></script>
    <script>
        $(document).ready(function() {
            $('.works-table').DataTable({
                pageLength: 50,
                order: [[2, 'asc']],
                fixedHeader: true
            });
        });
    </script>
</head>"#;
