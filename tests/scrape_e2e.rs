use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use predicates::prelude::*;

const LISTING_HTML: &str = r#"<!doctype html>
<html><body>
  <a class="row work" href="/works/novel/the-shining.html" data-date="1977-01-28">
    <div class="works-title">The Shining</div>
    <div class="works-type">Novel</div>
  </a>
  <a class="row work" href="/works/novel/the-shining-expanded.html" data-date="2005-06-01">
    <div class="works-title">The Shining: Expanded Edition</div>
    <div class="works-type">Novel</div>
  </a>
  <a class="row work" href="/works/collection/night-shift.html" data-date="1978-02-01">
    <div class="works-title">Night Shift</div>
    <div class="works-type">Collection</div>
  </a>
  <a class="row work" href="/works/short-story/jerusalems-lot.html" data-date="0000-00-00">
    <div class="works-title">Jerusalem's Lot</div>
    <div class="works-type">Short Story</div>
  </a>
  <a class="row work" href="/works/poem/midnight-fragment.html" data-date="">
    <div class="works-title">Midnight Fragment</div>
    <div class="works-type">Poem</div>
  </a>
</body></html>
"#;

const SHINING_HTML: &str = r#"<!doctype html>
<html><body>
  <h2>About The Book</h2>
  <div class="formats"><span>Hardcover</span></div>
</body></html>
"#;

const SHINING_EXPANDED_HTML: &str = r#"<!doctype html>
<html><body>
  <div class="formats"><span>Paperback</span><span>Kindle</span></div>
</body></html>
"#;

const NIGHT_SHIFT_HTML: &str = r#"<!doctype html>
<html><body>
  <div class="formats"><span>Paperback</span></div>
</body></html>
"#;

const JERUSALEMS_LOT_HTML: &str = r#"<!doctype html>
<html><body>
  <h2>Available In</h2>
  <div class="grid-content">
    <a class="text-link" href="/works/collection/night-shift.html">Night Shift</a>
  </div>
</body></html>
"#;

const MIDNIGHT_FRAGMENT_HTML: &str = r#"<!doctype html>
<html><body>
  <p>A short verse.</p>
</body></html>
"#;

struct FixtureSite {
    base_url: String,
    requests: Arc<AtomicUsize>,
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FixtureSite {
    fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(AtomicUsize::new(0));

        let routes: HashMap<&'static str, &'static str> = HashMap::from([
            ("/works/", LISTING_HTML),
            ("/works/novel/the-shining.html", SHINING_HTML),
            ("/works/novel/the-shining-expanded.html", SHINING_EXPANDED_HTML),
            ("/works/collection/night-shift.html", NIGHT_SHIFT_HTML),
            ("/works/short-story/jerusalems-lot.html", JERUSALEMS_LOT_HTML),
            ("/works/poem/midnight-fragment.html", MIDNIGHT_FRAGMENT_HTML),
        ]);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let request_count = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                request_count.fetch_add(1, Ordering::SeqCst);

                let path = request.url().to_string();
                let response = match routes.get(path.as_str()) {
                    Some(body) => {
                        let header = tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/html; charset=utf-8"[..],
                        )
                        .expect("build header");
                        tiny_http::Response::from_string(*body).with_header(header)
                    }
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx,
            handle: Some(handle),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for FixtureSite {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn scrape(site: &FixtureSite, out_dir: &Path, cache_dir: &Path) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("kingworks");
    cmd.args([
        "scrape",
        "--url",
        &format!("{}/works/", site.base_url),
        "--out",
        out_dir.to_str().expect("out dir utf-8"),
        "--cache-dir",
        cache_dir.to_str().expect("cache dir utf-8"),
        "--delay-ms",
        "0",
        "--concurrency",
        "3",
    ])
    .assert()
}

fn find_export(dir: &Path, extension: &str) -> std::path::PathBuf {
    let mut matches: Vec<_> = fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| entry.expect("read entry").path())
        .filter(|path| {
            path.extension().and_then(|ext| ext.to_str()) == Some(extension)
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("stephen_king_works_"))
        })
        .collect();
    matches.sort();
    matches.pop().expect("export file")
}

#[test]
fn scrape_reconciles_the_fixture_site_into_csv_and_html() {
    let site = FixtureSite::spawn();
    let temp = tempfile::TempDir::new().expect("temp dir");
    let out_dir = temp.path().join("output");
    let cache_dir = temp.path().join("cache");

    scrape(&site, &out_dir, &cache_dir)
        .success()
        .stdout(predicate::str::contains("Found 4 distinct works"))
        .stdout(predicate::str::contains("CSV exported to"))
        .stdout(predicate::str::contains("HTML exported to"));

    let csv_path = find_export(&out_dir, "csv");
    let mut reader = csv::Reader::from_path(&csv_path).expect("open csv export");

    let header: Vec<String> = reader
        .headers()
        .expect("read header")
        .iter()
        .map(str::to_owned)
        .collect();
    assert_eq!(
        header.join(","),
        "Read,Owned,Published,Title,Type,Available In,Hardcover,Paperback,Ebook,Audiobook,Movie,Miniseries"
    );

    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("read rows");
    assert_eq!(rows.len(), 4);

    // row 0: the two Shining editions merged; variant title, earliest date,
    // union of formats across both detail pages
    assert_eq!(&rows[0][2], "1977-01-28");
    assert!(rows[0][3].contains("The Shining: Expanded Edition"));
    assert_eq!(&rows[0][4], "Novel");
    assert_eq!(&rows[0][6], "✓"); // Hardcover
    assert_eq!(&rows[0][7], "✓"); // Paperback
    assert_eq!(&rows[0][8], "✓"); // Ebook
    assert_eq!(&rows[0][9], ""); // Audiobook

    // row 1: the short story inherited Night Shift's date
    assert!(rows[1][3].contains("Jerusalem's Lot"));
    assert_eq!(&rows[1][2], "1978-02-01");
    assert!(rows[1][5].contains("Night Shift"));
    assert_eq!(&rows[1][4], "Short Story");

    // row 2: the collection itself, with its normalized type
    assert!(rows[2][3].contains("Night Shift"));
    assert_eq!(&rows[2][4], "Story Collection");
    assert_eq!(&rows[2][7], "✓"); // Paperback

    // row 3: undated poem sorts last, date cell empty (no 0000-00-00)
    assert!(rows[3][3].contains("Midnight Fragment"));
    assert_eq!(&rows[3][2], "");

    let html_path = find_export(&out_dir, "html");
    let html = fs::read_to_string(&html_path).expect("read html export");
    assert!(html.contains("<strong>Night Shift</strong>"));
    assert!(html.contains("data-sort=\"9999-99-99\""));
    assert!(html.contains("data-sort=\"1977-01-28\""));
}

#[test]
fn second_scrape_is_served_from_the_page_cache() {
    let site = FixtureSite::spawn();
    let temp = tempfile::TempDir::new().expect("temp dir");
    let cache_dir = temp.path().join("cache");

    scrape(&site, &temp.path().join("first"), &cache_dir).success();
    let after_first = site.request_count();
    // listing plus one detail page per work
    assert_eq!(after_first, 6);

    scrape(&site, &temp.path().join("second"), &cache_dir).success();
    assert_eq!(site.request_count(), after_first);
}

#[test]
fn render_rebuilds_html_from_the_latest_csv() {
    let site = FixtureSite::spawn();
    let temp = tempfile::TempDir::new().expect("temp dir");
    let out_dir = temp.path().join("output");

    scrape(&site, &out_dir, &temp.path().join("cache")).success();
    let html_before = find_export(&out_dir, "html");
    fs::remove_file(&html_before).expect("remove first html export");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("kingworks");
    cmd.args(["render", "--out", out_dir.to_str().expect("out dir utf-8")])
        .assert()
        .success()
        .stdout(predicate::str::contains("HTML exported to"));

    let html = fs::read_to_string(find_export(&out_dir, "html")).expect("read rendered html");
    assert!(html.contains("Jerusalem's Lot"));
    assert!(html.contains("Stephen King Bibliography"));
}

#[test]
fn clear_cache_removes_cached_pages() {
    let site = FixtureSite::spawn();
    let temp = tempfile::TempDir::new().expect("temp dir");
    let cache_dir = temp.path().join("cache");

    scrape(&site, &temp.path().join("output"), &cache_dir).success();
    assert!(fs::read_dir(&cache_dir).expect("read cache dir").count() > 0);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("kingworks");
    cmd.args([
        "clear-cache",
        "--cache-dir",
        cache_dir.to_str().expect("cache dir utf-8"),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed 6 cached page(s)"));

    assert_eq!(fs::read_dir(&cache_dir).expect("read cache dir").count(), 0);
}
