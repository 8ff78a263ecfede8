//! One-shot crawl management commands against the REST interface.

use std::future::Future;

use anyhow::Context;
use crawlwatch_engine::{CrawlApi, CreateCrawlRequest, ListQuery, ReqwestCrawlApi};
use crawlwatch_logging::watch_info;

use super::config::AppConfig;
use super::render::render_list;

pub fn list(config: &AppConfig, query: ListQuery) -> anyhow::Result<()> {
    let api = client(config)?;
    let page = block_on(api.list_crawls(&query))?.context("listing crawls failed")?;
    for line in render_list(&page) {
        println!("{line}");
    }
    Ok(())
}

pub fn create(config: &AppConfig, url: String, depth: u32) -> anyhow::Result<()> {
    let api = client(config)?;
    let request = CreateCrawlRequest { url, depth };
    let created = block_on(api.create_crawl(&request))?
        .with_context(|| format!("creating crawl of {} failed", request.url))?;
    watch_info!("created crawl {} for {}", created.crawl_id, request.url);
    println!("{} {}", created.crawl_id, created.status);
    Ok(())
}

pub fn cancel(config: &AppConfig, crawl_id: &str) -> anyhow::Result<()> {
    let api = client(config)?;
    let cancelled = block_on(api.delete_crawl(crawl_id))?
        .with_context(|| format!("cancelling crawl {crawl_id} failed"))?;
    watch_info!("cancelled crawl {}", cancelled.crawl_id);
    println!("{} {}", cancelled.crawl_id, cancelled.status);
    Ok(())
}

fn client(config: &AppConfig) -> anyhow::Result<ReqwestCrawlApi> {
    ReqwestCrawlApi::new(&config.api_settings())
        .with_context(|| format!("invalid api base {:?}", config.api_base))
}

fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    Ok(runtime.block_on(future))
}
