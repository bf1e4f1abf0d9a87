use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context as _;
use chrono::Local;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::cache::PageCache;
use crate::cli::{OutputFormat, ScrapeArgs};
use crate::config;
use crate::export;
use crate::http::RequestManager;
use crate::model::{CanonicalRecord, RawRecord};
use crate::parse::{self, WorkDetail, WorkStub};
use crate::reconcile::Reconciler;

pub async fn run(args: ScrapeArgs) -> anyhow::Result<()> {
    let mut settings = config::load(args.config.as_deref()).context("load settings")?;
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency.max(1);
    }
    if let Some(delay_ms) = args.delay_ms {
        settings.delay_ms = delay_ms;
    }
    if let Some(cache_dir) = &args.cache_dir {
        settings.cache_dir = PathBuf::from(cache_dir);
    }

    let works_url = match &args.url {
        Some(url) => Url::parse(url).with_context(|| format!("parse --url: {url}"))?,
        None => settings.works_url()?,
    };
    if works_url.scheme() != "http" && works_url.scheme() != "https" {
        anyhow::bail!("--url must be http/https: {works_url}");
    }

    let out_dir = PathBuf::from(&args.out);
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    let cache = (!args.no_cache).then(|| {
        PageCache::new(
            &settings.cache_dir,
            Duration::from_secs(settings.cache_ttl_secs),
        )
    });
    let manager = Arc::new(RequestManager::new(&settings).context("build request manager")?);

    tracing::info!(url = %works_url, "fetching works listing");
    let listing_html = fetch_page(&manager, cache.as_ref(), &works_url)
        .await
        .context("fetch works listing")?;

    let stubs = parse::parse_listing(&listing_html, &works_url);
    if stubs.is_empty() {
        anyhow::bail!("no works found at {works_url}");
    }
    tracing::info!(works = stubs.len(), "parsed works listing");

    let records = reconcile_stream(&manager, cache.as_ref(), stubs, settings.concurrency).await?;
    println!("Found {} distinct works", records.len());

    let now = Local::now();
    let mut exported: Vec<OutputFormat> = Vec::new();
    for format in &args.formats {
        if exported.contains(format) {
            continue;
        }
        exported.push(*format);

        match format {
            OutputFormat::Csv => {
                let path = out_dir.join(export::timestamped_name("csv", now));
                export::write_csv(&path, &records)?;
                println!("CSV exported to {}", path.display());
            }
            OutputFormat::Html => {
                let rows: Vec<Vec<String>> = records.iter().map(export::export_row).collect();
                let path = out_dir.join(export::timestamped_name("html", now));
                export::write_html(&path, &rows)?;
                println!("HTML exported to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Fetch every work's detail page with bounded parallelism and fold the
/// resulting raw records into a reconciler, serially, in completion order.
///
/// A failed detail fetch degrades to a record carrying only the listing data;
/// it never aborts the run.
async fn reconcile_stream(
    manager: &Arc<RequestManager>,
    cache: Option<&PageCache>,
    stubs: Vec<WorkStub>,
    concurrency: usize,
) -> anyhow::Result<Vec<CanonicalRecord>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    // Processed-URL dedup shared by the fetch tasks; the reconciler itself
    // only ever runs on this task.
    let seen_urls: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));

    let mut tasks = JoinSet::new();
    for stub in stubs {
        let manager = Arc::clone(manager);
        let cache = cache.cloned();
        let semaphore = Arc::clone(&semaphore);
        let seen_urls = Arc::clone(&seen_urls);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");

            let first_visit = seen_urls
                .lock()
                .expect("processed-url set poisoned")
                .insert(stub.url.clone());
            if !first_visit {
                tracing::debug!(url = %stub.url, "skipping already-processed url");
                return None;
            }

            let detail = fetch_detail(&manager, cache.as_ref(), &stub).await;
            Some(RawRecord {
                title: stub.title,
                url: stub.url,
                published_date: stub.published_date,
                work_type: stub.work_type,
                collection_name: detail.collection_name,
                collection_url: detail.collection_url,
                formats: detail.formats,
            })
        });
    }

    let mut reconciler = Reconciler::new();
    while let Some(joined) = tasks.join_next().await {
        let Some(raw) = joined.context("join detail fetch task")? else {
            continue;
        };
        let title = raw.title.clone();
        match reconciler.ingest(raw) {
            Ok(()) => tracing::debug!(title = %title, "ingested"),
            Err(err) => tracing::warn!(%err, "skipping record"),
        }
    }

    tracing::info!(distinct = reconciler.len(), "reconciled works");
    Ok(reconciler.finalize())
}

async fn fetch_detail(
    manager: &RequestManager,
    cache: Option<&PageCache>,
    stub: &WorkStub,
) -> WorkDetail {
    let url = match Url::parse(&stub.url) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(url = %stub.url, %err, "bad work url; keeping listing data");
            return WorkDetail::default();
        }
    };

    match fetch_page(manager, cache, &url).await {
        Ok(html) => parse::parse_detail(&html, &url),
        Err(err) => {
            tracing::warn!(url = %stub.url, %err, "detail fetch failed; keeping listing data");
            WorkDetail::default()
        }
    }
}

async fn fetch_page(
    manager: &RequestManager,
    cache: Option<&PageCache>,
    url: &Url,
) -> anyhow::Result<String> {
    if let Some(cache) = cache
        && let Some(body) = cache.get(url.as_str())
    {
        tracing::debug!(%url, "cache hit");
        return Ok(body);
    }

    let body = manager.get_text(url).await?;

    if let Some(cache) = cache
        && let Err(err) = cache.put(url.as_str(), &body)
    {
        tracing::warn!(%url, %err, "failed to cache page");
    }

    Ok(body)
}
