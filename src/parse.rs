use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::model::Format;

static WORK_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.row.work").expect("work row selector"));
static WORK_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.works-title").expect("work title selector"));
static WORK_TYPE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.works-type").expect("work type selector"));
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").expect("heading selector"));
static GRID_CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.grid-content").expect("grid content selector"));
static TEXT_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.text-link").expect("text link selector"));
static CONTAINERS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, section, span, p, li, a").expect("container selector"));
static SECTIONS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, section").expect("section selector"));
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("meta selector"));

/// One entry from the works listing page, before the detail fetch.
#[derive(Debug, Clone)]
pub struct WorkStub {
    pub title: String,
    pub url: String,
    /// Raw `data-date` attribute value; may be empty or the placeholder.
    pub published_date: String,
    pub work_type: String,
}

/// Fields only available on a work's own page.
#[derive(Debug, Clone, Default)]
pub struct WorkDetail {
    pub collection_name: Option<String>,
    pub collection_url: Option<String>,
    pub formats: BTreeSet<Format>,
}

/// Extract work stubs from the bibliography listing page.
///
/// Rows without a title or without a resolvable link are dropped here so the
/// reconciler only ever sees well-formed records.
pub fn parse_listing(html: &str, base_url: &Url) -> Vec<WorkStub> {
    let document = Html::parse_document(html);
    let mut stubs = Vec::new();

    for row in document.select(&WORK_ROW) {
        let title = element_text(&row, &WORK_TITLE);
        if title.is_empty() {
            tracing::warn!("skipping listing row with empty title");
            continue;
        }

        let Some(href) = row.value().attr("href") else {
            tracing::warn!(title = %title, "skipping listing row without href");
            continue;
        };
        let url = match base_url.join(href) {
            Ok(url) => url.to_string(),
            Err(err) => {
                tracing::warn!(title = %title, href, %err, "skipping listing row with bad href");
                continue;
            }
        };

        let published_date = row.value().attr("data-date").unwrap_or_default().trim().to_owned();
        let work_type = normalize_work_type(&element_text(&row, &WORK_TYPE));

        stubs.push(WorkStub {
            title,
            url,
            published_date,
            work_type,
        });
    }

    stubs
}

/// Extract collection membership and available formats from a work's page.
pub fn parse_detail(html: &str, base_url: &Url) -> WorkDetail {
    let document = Html::parse_document(html);
    let (collection_name, collection_url) = extract_collection(&document, base_url);
    let formats = extract_formats(&document);

    WorkDetail {
        collection_name,
        collection_url,
        formats,
    }
}

/// Map a scraped free-text work type onto a standard label. More specific
/// keys are checked first ("novella" would otherwise be swallowed by
/// "novel"); anything unmatched is title-cased as-is.
pub fn normalize_work_type(raw: &str) -> String {
    const TYPE_LABELS: [(&str, &str); 9] = [
        ("novella", "Novella"),
        ("short story", "Short Story"),
        ("collection", "Story Collection"),
        ("anthology", "Anthology"),
        ("bachman", "Bachman Novel"),
        ("nonfiction", "Non-Fiction"),
        ("screenplay", "Screenplay"),
        ("poem", "Poem"),
        ("novel", "Novel"),
    ];

    let lowered = raw.trim().to_lowercase();
    for (key, label) in TYPE_LABELS {
        if lowered.contains(key) {
            return label.to_owned();
        }
    }
    title_case(&lowered)
}

/// The "Available In" section: an `h2` heading followed by a
/// `div.grid-content` block whose `a.text-link` names the collection.
fn extract_collection(document: &Html, base_url: &Url) -> (Option<String>, Option<String>) {
    let heading = document
        .select(&HEADING)
        .find(|h2| h2.text().collect::<String>().trim() == "Available In");
    let Some(heading) = heading else {
        return (None, None);
    };

    let Some(section) = following_grid_content(&heading) else {
        return (None, None);
    };
    let Some(link) = section.select(&TEXT_LINK).next() else {
        return (None, None);
    };

    let name = link.text().collect::<String>().trim().to_owned();
    if name.is_empty() {
        return (None, None);
    }

    let url = link
        .value()
        .attr("href")
        .filter(|href| !href.is_empty())
        .and_then(|href| base_url.join(href).ok())
        .map(|url| url.to_string());

    (Some(name), url)
}

/// First `div.grid-content` at or under a sibling following the heading.
fn following_grid_content<'a>(heading: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    for sibling in heading.next_siblings() {
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        if element.value().name() == "div" && has_class(&element, "grid-content") {
            return Some(element);
        }
        if let Some(nested) = element.select(&GRID_CONTENT).next() {
            return Some(nested);
        }
    }
    None
}

/// Scan the page for format availability, most specific location first:
/// format-labelled sections, then general content containers, then the meta
/// description.
fn extract_formats(document: &Html) -> BTreeSet<Format> {
    let mut found = BTreeSet::new();

    for section in document.select(&SECTIONS) {
        let classes_mention_format = section
            .value()
            .attr("class")
            .is_some_and(|class| class.to_lowercase().contains("format"));
        if !classes_mention_format {
            continue;
        }
        detect_formats(&lowercase_text(&section), &mut found);
    }

    if found.len() < Format::ALL.len() {
        for container in document.select(&CONTAINERS) {
            detect_formats(&lowercase_text(&container), &mut found);
            if found.len() == Format::ALL.len() {
                break;
            }
        }
    }

    if found.len() < Format::ALL.len()
        && let Some(meta) = document.select(&META_DESCRIPTION).next()
        && let Some(content) = meta.value().attr("content")
    {
        detect_formats(&content.to_lowercase(), &mut found);
    }

    found
}

fn detect_formats(text: &str, found: &mut BTreeSet<Format>) {
    for format in Format::ALL {
        if found.contains(&format) {
            continue;
        }
        if format.indicators().iter().any(|phrase| text.contains(phrase)) {
            found.insert(format);
        }
    }
}

fn element_text(row: &ElementRef<'_>, selector: &Selector) -> String {
    row.select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_owned())
        .unwrap_or_default()
}

fn lowercase_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().to_lowercase()
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|candidate| candidate == class)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.stephenking.com/works/").expect("base url")
    }

    const LISTING: &str = r#"<!doctype html>
<html><body>
  <a class="row work" href="/works/novel/carrie.html" data-date="1974-04-05">
    <div class="works-title">Carrie</div>
    <div class="works-type">Novel</div>
  </a>
  <a class="row work" href="/works/short-story/jerusalems-lot.html" data-date="0000-00-00">
    <div class="works-title">Jerusalem's Lot</div>
    <div class="works-type">Short Story</div>
  </a>
  <a class="row work" href="/works/broken.html">
    <div class="works-title"></div>
    <div class="works-type">Novel</div>
  </a>
  <a class="row other" href="/not-a-work.html">
    <div class="works-title">Not A Work</div>
  </a>
</body></html>"#;

    #[test]
    fn listing_rows_become_stubs() {
        let stubs = parse_listing(LISTING, &base());

        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].title, "Carrie");
        assert_eq!(stubs[0].url, "https://www.stephenking.com/works/novel/carrie.html");
        assert_eq!(stubs[0].published_date, "1974-04-05");
        assert_eq!(stubs[0].work_type, "Novel");

        assert_eq!(stubs[1].title, "Jerusalem's Lot");
        assert_eq!(stubs[1].published_date, "0000-00-00");
        assert_eq!(stubs[1].work_type, "Short Story");
    }

    #[test]
    fn empty_titles_are_filtered_at_extraction() {
        let stubs = parse_listing(LISTING, &base());
        assert!(stubs.iter().all(|stub| !stub.title.is_empty()));
    }

    #[test]
    fn detail_page_yields_collection_and_formats() {
        let html = r#"<!doctype html>
<html><head><meta name="description" content="Also available as an ebook."></head>
<body>
  <section>
    <h2>Available In</h2>
    <div class="grid-content">
      <a class="text-link" href="/works/collection/night-shift.html">Night Shift</a>
    </div>
  </section>
  <div class="formats-list">
    <span>Hardcover</span>
    <span>Mass Market Paperback</span>
  </div>
</body></html>"#;

        let detail = parse_detail(html, &base());

        assert_eq!(detail.collection_name.as_deref(), Some("Night Shift"));
        assert_eq!(
            detail.collection_url.as_deref(),
            Some("https://www.stephenking.com/works/collection/night-shift.html")
        );
        assert!(detail.formats.contains(&Format::Hardcover));
        assert!(detail.formats.contains(&Format::Paperback));
        assert!(detail.formats.contains(&Format::Ebook));
        assert!(!detail.formats.contains(&Format::Movie));
    }

    #[test]
    fn detail_page_without_available_in_has_no_collection() {
        let html = r#"<html><body>
  <h2>About The Book</h2>
  <div class="grid-content"><a class="text-link" href="/x">Wrong</a></div>
</body></html>"#;

        let detail = parse_detail(html, &base());
        assert_eq!(detail.collection_name, None);
        assert_eq!(detail.collection_url, None);
    }

    #[test]
    fn collection_link_without_href_still_names_the_collection() {
        let html = r#"<html><body>
  <h2>Available In</h2>
  <div class="grid-content"><a class="text-link">Skeleton Crew</a></div>
</body></html>"#;

        let detail = parse_detail(html, &base());
        assert_eq!(detail.collection_name.as_deref(), Some("Skeleton Crew"));
        assert_eq!(detail.collection_url, None);
    }

    #[test]
    fn format_indicators_match_loose_phrasing() {
        let html = r#"<html><body>
  <p>Available on Kindle and as an Audible audiobook.</p>
  <p>Adapted as a TV series in 1979.</p>
</body></html>"#;

        let formats = parse_detail(html, &base()).formats;
        assert!(formats.contains(&Format::Ebook));
        assert!(formats.contains(&Format::Audiobook));
        assert!(formats.contains(&Format::Miniseries));
        assert!(!formats.contains(&Format::Hardcover));
    }

    #[test]
    fn work_types_map_onto_standard_labels() {
        assert_eq!(normalize_work_type("novel"), "Novel");
        assert_eq!(normalize_work_type("Novella"), "Novella");
        assert_eq!(normalize_work_type("story collection"), "Story Collection");
        assert_eq!(normalize_work_type("ANTHOLOGY"), "Anthology");
        assert_eq!(normalize_work_type("nonfiction"), "Non-Fiction");
        assert_eq!(normalize_work_type("radio drama"), "Radio Drama");
    }
}
