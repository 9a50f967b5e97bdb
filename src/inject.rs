//! Injection timing for the page interceptor.
//!
//! The interceptor goes in as soon as the document is past `loading`, and
//! again after every client-side navigation. Navigations are detected by
//! comparing the URL whenever the document tree mutates; the re-injection
//! waits a short delay so the new page can settle first.

use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::intercept::Location;

/// Default wait between a detected navigation and re-injection.
pub const DEFAULT_REINJECT_DELAY: Duration = Duration::from_millis(100);

/// Document loading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// A page the interceptor can be injected into.
pub trait Page: Location {
    fn ready_state(&self) -> ReadyState;

    /// Install the interceptor into the page's execution context.
    fn inject_script(&self) -> Result<(), String>;
}

/// Decides when to (re)inject.
#[derive(Debug)]
pub struct Injector {
    delay: Duration,
    last_url: Option<String>,
    waiting_for_dom: bool,
    due: Option<Instant>,
    injections: usize,
}

impl Default for Injector {
    fn default() -> Self {
        Self::new(DEFAULT_REINJECT_DELAY)
    }
}

impl Injector {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_url: None,
            waiting_for_dom: false,
            due: None,
            injections: 0,
        }
    }

    /// Inject now, or wait for `DOMContentLoaded` while still loading.
    pub fn start(&mut self, page: &impl Page) {
        self.last_url = Some(page.href());
        if page.ready_state() == ReadyState::Loading {
            self.waiting_for_dom = true;
        } else {
            self.inject(page);
        }
    }

    pub fn on_dom_content_loaded(&mut self, page: &impl Page) {
        if self.waiting_for_dom {
            self.waiting_for_dom = false;
            self.inject(page);
        }
    }

    /// The document tree changed. Schedules a re-injection at `now + delay`
    /// when the URL differs from the last one seen.
    pub fn on_mutation(&mut self, page: &impl Page, now: Instant) {
        let url = page.href();
        if self.last_url.as_deref() == Some(url.as_str()) {
            return;
        }
        info!(%url, "URL changed, re-injecting interceptor");
        self.last_url = Some(url);
        self.due = Some(now + self.delay);
    }

    /// Run a scheduled re-injection once it is due. Returns `true` if one ran.
    pub fn poll(&mut self, page: &impl Page, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                self.inject(page);
                true
            }
            _ => false,
        }
    }

    /// When the next scheduled re-injection is due, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.due
    }

    /// Successful injections so far.
    pub fn injections(&self) -> usize {
        self.injections
    }

    fn inject(&mut self, page: &impl Page) {
        match page.inject_script() {
            Ok(()) => {
                self.injections += 1;
                info!(url = %page.href(), "interceptor injected");
            }
            Err(e) => error!(url = %page.href(), "failed to inject interceptor: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::{Cell, RefCell};

    struct FakePage {
        url: RefCell<String>,
        state: Cell<ReadyState>,
        fail: Cell<bool>,
        injected: Cell<usize>,
    }

    impl FakePage {
        fn new(state: ReadyState) -> Self {
            Self {
                url: RefCell::new("https://example.com/".into()),
                state: Cell::new(state),
                fail: Cell::new(false),
                injected: Cell::new(0),
            }
        }

        fn navigate(&self, url: &str) {
            *self.url.borrow_mut() = url.into();
        }
    }

    impl Location for FakePage {
        fn href(&self) -> String {
            self.url.borrow().clone()
        }
    }

    impl Page for FakePage {
        fn ready_state(&self) -> ReadyState {
            self.state.get()
        }

        fn inject_script(&self) -> Result<(), String> {
            if self.fail.get() {
                return Err("blocked by CSP".into());
            }
            self.injected.set(self.injected.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn injects_immediately_when_ready() {
        let page = FakePage::new(ReadyState::Interactive);
        let mut injector = Injector::default();

        injector.start(&page);
        assert_eq!(page.injected.get(), 1);
    }

    #[test]
    fn waits_for_dom_while_loading() {
        let page = FakePage::new(ReadyState::Loading);
        let mut injector = Injector::default();

        injector.start(&page);
        assert_eq!(page.injected.get(), 0);

        page.state.set(ReadyState::Interactive);
        injector.on_dom_content_loaded(&page);
        injector.on_dom_content_loaded(&page);
        assert_eq!(page.injected.get(), 1);
    }

    #[test]
    fn navigation_reinjects_after_delay() {
        let page = FakePage::new(ReadyState::Complete);
        let mut injector = Injector::new(Duration::from_millis(100));
        let t0 = Instant::now();
        injector.start(&page);

        // Mutation without navigation: nothing scheduled.
        injector.on_mutation(&page, t0);
        assert_eq!(injector.next_due(), None);

        page.navigate("https://example.com/account");
        injector.on_mutation(&page, t0);
        assert_eq!(injector.next_due(), Some(t0 + Duration::from_millis(100)));

        assert!(!injector.poll(&page, t0 + Duration::from_millis(50)));
        assert!(injector.poll(&page, t0 + Duration::from_millis(100)));
        assert!(!injector.poll(&page, t0 + Duration::from_millis(200)));
        assert_eq!(page.injected.get(), 2);
        assert_eq!(injector.injections(), 2);
    }

    #[test]
    fn inject_failure_is_not_counted() {
        let page = FakePage::new(ReadyState::Complete);
        page.fail.set(true);
        let mut injector = Injector::default();

        injector.start(&page);
        assert_eq!(injector.injections(), 0);
    }
}
