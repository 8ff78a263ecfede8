#![deny(missing_docs)]
//! Shared logging utilities for the crawlwatch workspace.
//!
//! This crate provides the `watch_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every macro prefixes
//! the message with the crawl the current thread is working on, if any.
//! Async tasks carry their crawl with [`in_crawl_context`] instead.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

thread_local! {
    /// Crawl identifier the current thread is synchronizing, if any.
    static CRAWL_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the crawl context for the current thread.
/// The host event loop calls this whenever the mounted crawl changes.
pub fn set_crawl_context(crawl_id: Option<&str>) {
    CRAWL_CONTEXT.with(|ctx| *ctx.borrow_mut() = crawl_id.map(ToOwned::to_owned));
}

/// Retrieves the crawl context for the current thread.
/// Returns `None` if no crawl is mounted on this thread.
pub fn crawl_context() -> Option<String> {
    CRAWL_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Runs `future` with the crawl context set while it is being polled, on
/// whichever thread polls it. The thread's own context is restored after
/// every poll.
pub fn in_crawl_context<F: Future>(crawl_id: impl Into<String>, future: F) -> InCrawlContext<F> {
    InCrawlContext {
        crawl_id: crawl_id.into(),
        future: Box::pin(future),
    }
}

/// Future returned by [`in_crawl_context`].
pub struct InCrawlContext<F> {
    crawl_id: String,
    future: Pin<Box<F>>,
}

impl<F: Future> Future for InCrawlContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        let this = self.get_mut();
        let previous = CRAWL_CONTEXT.with(|ctx| ctx.replace(Some(this.crawl_id.clone())));
        let result = this.future.as_mut().poll(cx);
        CRAWL_CONTEXT.with(|ctx| *ctx.borrow_mut() = previous);
        result
    }
}

/// Prefix prepended by the logging macros. Empty when no crawl is mounted.
#[doc(hidden)]
pub fn context_prefix() -> String {
    CRAWL_CONTEXT.with(|ctx| match ctx.borrow().as_deref() {
        Some(crawl_id) => format!("[crawl {crawl_id}] "),
        None => String::new(),
    })
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! watch_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! watch_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! watch_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! watch_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! watch_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefix_follows_thread_context() {
        set_crawl_context(None);
        assert_eq!(context_prefix(), "");

        set_crawl_context(Some("c1"));
        assert_eq!(crawl_context().as_deref(), Some("c1"));
        assert_eq!(context_prefix(), "[crawl c1] ");

        set_crawl_context(None);
        assert_eq!(crawl_context(), None);
    }

    struct NoopWake;

    impl std::task::Wake for NoopWake {
        fn wake(self: std::sync::Arc<Self>) {}
    }

    #[test]
    fn task_context_applies_only_while_polled() {
        let waker = std::task::Waker::from(std::sync::Arc::new(NoopWake));
        let mut cx = Context::from_waker(&waker);

        set_crawl_context(Some("host"));
        let mut task = in_crawl_context("c1", async { context_prefix() });
        assert_eq!(
            Pin::new(&mut task).poll(&mut cx),
            Poll::Ready("[crawl c1] ".to_string())
        );
        assert_eq!(crawl_context().as_deref(), Some("host"));
        set_crawl_context(None);
    }

    #[test]
    fn context_is_thread_local() {
        set_crawl_context(Some("main"));
        let other = std::thread::spawn(crawl_context).join().unwrap();
        assert_eq!(other, None);
        set_crawl_context(None);
    }
}
