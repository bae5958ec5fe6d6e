//! Redirect controller: decides, on each activation, whether this context
//! should move itself to a different endpoint.
//!
//! One controller instance per execution context. Evaluation may run many
//! times (load, delayed re-check, content mutation, visibility change) and
//! is idempotent: once a redirect decision is made, later passes are
//! no-ops because navigation is already unloading the context.

use crate::detector::{BlockedPageDetector, PageSnapshot};
use crate::namegen::NameGenerator;
use crate::registry::LivenessRegistry;
use crate::store::{keys, SessionFlags, StateStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Where the next endpoint comes from when the current one is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// Rotate through the configured registry.
    Registry,
    /// Mint a fresh label; pure subdomain-rotation mode.
    Mint,
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Stay,
    Redirect { origin: String, url: String },
}

/// Performs the terminal navigation. Unobservable from inside the context
/// once it succeeds.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, url: &str) -> anyhow::Result<()>;
}

/// User-visible notice shown before navigating. Rendering is an external
/// concern; the default sink does nothing.
pub trait NoticeSink: Send + Sync {
    fn show(&self, target_origin: &str);
}

pub struct NoopNotice;

impl NoticeSink for NoopNotice {
    fn show(&self, _target_origin: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    Init,
    Evaluating,
    Staying,
    Redirecting,
}

#[derive(Clone, Debug)]
pub struct RedirectControllerConfig {
    pub mode: RotationMode,
    pub redirect_delay: Duration,
    /// Suppress a second redirect within this window, persisted per
    /// origin.
    pub throttle: Duration,
}

impl Default for RedirectControllerConfig {
    fn default() -> Self {
        Self {
            mode: RotationMode::Registry,
            redirect_delay: Duration::from_millis(1500),
            throttle: Duration::from_secs(300),
        }
    }
}

type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct RedirectController {
    registry: Arc<Mutex<LivenessRegistry>>,
    names: Arc<Mutex<NameGenerator>>,
    detector: Arc<dyn BlockedPageDetector>,
    session: Arc<SessionFlags>,
    store: Arc<dyn StateStore>,
    navigator: Arc<dyn Navigator>,
    notice: Arc<dyn NoticeSink>,
    config: RedirectControllerConfig,
    now: NowFn,
    state: ControllerState,
}

impl RedirectController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<Mutex<LivenessRegistry>>,
        names: Arc<Mutex<NameGenerator>>,
        detector: Arc<dyn BlockedPageDetector>,
        session: Arc<SessionFlags>,
        store: Arc<dyn StateStore>,
        navigator: Arc<dyn Navigator>,
        notice: Arc<dyn NoticeSink>,
        config: RedirectControllerConfig,
    ) -> Self {
        Self {
            registry,
            names,
            detector,
            session,
            store,
            navigator,
            notice,
            config,
            now: Arc::new(Utc::now),
            state: ControllerState::Init,
        }
    }

    /// Replace the clock used for the redirect throttle.
    pub fn with_clock(mut self, now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.now = Arc::new(now);
        self
    }

    /// One evaluation pass over the current page state.
    pub async fn evaluate(&mut self, page: &PageSnapshot) -> Decision {
        // Navigation already under way; the context is unloading
        if self.state == ControllerState::Redirecting {
            return Decision::Stay;
        }
        self.state = ControllerState::Evaluating;

        if self.session.already_redirected() {
            self.state = ControllerState::Staying;
            return Decision::Stay;
        }

        // Arriving on a minted endpoint latches the session flag so this
        // endpoint is not re-evaluated into a redirect loop
        if self.names.lock().await.is_minted_host(&page.hostname) {
            tracing::debug!(hostname = %page.hostname, "On a minted endpoint, latching session flag");
            self.session.mark_redirected();
            self.state = ControllerState::Staying;
            return Decision::Stay;
        }

        if self.recently_redirected().await {
            self.state = ControllerState::Staying;
            return Decision::Stay;
        }

        if !self.detector.classify(page) {
            let mut registry = self.registry.lock().await;
            let current = registry.current();
            registry.mark_available(&current.label).await;
            self.state = ControllerState::Staying;
            return Decision::Stay;
        }

        let origin = {
            let mut registry = self.registry.lock().await;
            let current = registry.current();
            registry.mark_blocked(&current.label).await;
            match self.config.mode {
                RotationMode::Registry => {
                    let next = registry.advance().await;
                    next.origin(registry.root_domain())
                }
                RotationMode::Mint => self.names.lock().await.mint_origin().await,
            }
        };

        self.stamp_redirect().await;
        self.state = ControllerState::Redirecting;

        let url = rebuild_url(&page.url, &origin);
        tracing::info!(target = %origin, "Redirect decided");
        Decision::Redirect { origin, url }
    }

    /// Full activation: evaluate, and if the decision is to move, show the
    /// notice, wait out the delay, and navigate. A navigation failure is
    /// logged and the context stays put.
    pub async fn activate(&mut self, page: &PageSnapshot) {
        let Decision::Redirect { origin, url } = self.evaluate(page).await else {
            return;
        };

        self.notice.show(&origin);
        tokio::time::sleep(self.config.redirect_delay).await;

        if let Err(e) = self.navigator.navigate(&url).await {
            tracing::warn!(url = %url, error = %e, "Navigation failed, staying on current endpoint");
            self.state = ControllerState::Staying;
        }
    }

    async fn recently_redirected(&self) -> bool {
        let stamp = match self.store.get(keys::LAST_REDIRECT_AT).await {
            Ok(Some(raw)) => match raw.parse::<DateTime<Utc>>() {
                Ok(stamp) => stamp,
                Err(_) => return false,
            },
            _ => return false,
        };

        let elapsed = (self.now)() - stamp;
        elapsed < chrono::Duration::from_std(self.config.throttle).unwrap_or_default()
    }

    async fn stamp_redirect(&self) {
        let stamp = (self.now)().to_rfc3339();
        if let Err(e) = self.store.put(keys::LAST_REDIRECT_AT, &stamp).await {
            tracing::warn!(error = %e, "Failed to persist redirect stamp");
        }
    }
}

/// Swap the host of `original`, keeping scheme, path, query, and fragment.
fn rebuild_url(original: &str, new_host: &str) -> String {
    match Url::parse(original) {
        Ok(mut url) => {
            if url.set_host(Some(new_host)).is_ok() {
                let _ = url.set_port(None);
                return url.to_string();
            }
            format!("https://{}/", new_host)
        }
        Err(_) => format!("https://{}/", new_host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::IndicatorDetector;
    use crate::namegen::NameGeneratorConfig;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingNavigator {
        navigations: std::sync::Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingNavigator {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                navigations: std::sync::Mutex::new(Vec::new()),
                fail,
            })
        }

        fn count(&self) -> usize {
            self.navigations.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Navigator for RecordingNavigator {
        async fn navigate(&self, url: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("navigation blocked by the embedder");
            }
            self.navigations.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct CountingNotice {
        shown: AtomicUsize,
    }

    impl NoticeSink for CountingNotice {
        fn show(&self, _target_origin: &str) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn controller(
        mode: RotationMode,
        navigator: Arc<RecordingNavigator>,
    ) -> (RedirectController, Arc<Mutex<LivenessRegistry>>) {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let registry = Arc::new(Mutex::new(
            LivenessRegistry::load(
                store.clone(),
                "example.com",
                vec!["a".into(), "b".into(), "c".into()],
            )
            .await,
        ));
        let names = Arc::new(Mutex::new(
            NameGenerator::load(
                store.clone(),
                NameGeneratorConfig {
                    root_domain: "example.com".to_string(),
                    ..NameGeneratorConfig::default()
                },
            )
            .await,
        ));

        let controller = RedirectController::new(
            registry.clone(),
            names,
            Arc::new(IndicatorDetector::default()),
            Arc::new(SessionFlags::new()),
            store,
            navigator,
            Arc::new(NoopNotice),
            RedirectControllerConfig {
                mode,
                redirect_delay: Duration::from_millis(10),
                throttle: Duration::from_secs(300),
            },
        );
        (controller, registry)
    }

    fn blocked_page() -> PageSnapshot {
        PageSnapshot {
            url: "https://a.example.com/landing?ref=qr#top".into(),
            hostname: "a.example.com".into(),
            title: "This page has been blocked".into(),
            body_text: "The page contains malicious content".into(),
            body_html: String::new(),
            user_agent: "MicroMessenger/8.0".into(),
        }
    }

    fn clean_page() -> PageSnapshot {
        PageSnapshot {
            url: "https://a.example.com/landing".into(),
            hostname: "a.example.com".into(),
            title: "Landing".into(),
            body_text: "Scan the code below to continue. ".repeat(10),
            body_html: String::new(),
            user_agent: "MicroMessenger/8.0".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_page_rotates_to_next_endpoint() {
        let navigator = RecordingNavigator::new(false);
        let (mut ctl, registry) = controller(RotationMode::Registry, navigator.clone()).await;

        ctl.activate(&blocked_page()).await;

        assert_eq!(navigator.count(), 1);
        assert_eq!(
            navigator.navigations.lock().unwrap()[0],
            "https://b.example.com/landing?ref=qr#top"
        );
        let registry = registry.lock().await;
        assert_eq!(registry.current().label, "b");
        assert_eq!(registry.status().blocked, vec!["a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mint_mode_mints_fresh_host() {
        let navigator = RecordingNavigator::new(false);
        let (mut ctl, _) = controller(RotationMode::Mint, navigator.clone()).await;

        let decision = ctl.evaluate(&blocked_page()).await;
        let Decision::Redirect { origin, url } = decision else {
            panic!("expected a redirect decision");
        };
        assert!(origin.ends_with(".example.com"));
        assert_eq!(origin.len(), "abc123.example.com".len());
        assert!(url.contains(&origin));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_evaluation_after_decision_is_noop() {
        let navigator = RecordingNavigator::new(false);
        let (mut ctl, _) = controller(RotationMode::Registry, navigator.clone()).await;

        assert!(matches!(
            ctl.evaluate(&blocked_page()).await,
            Decision::Redirect { .. }
        ));
        assert_eq!(ctl.evaluate(&blocked_page()).await, Decision::Stay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_flag_prevents_renavigation() {
        let navigator = RecordingNavigator::new(false);
        let (mut ctl, _) = controller(RotationMode::Registry, navigator.clone()).await;
        ctl.session.mark_redirected();

        ctl.activate(&blocked_page()).await;
        ctl.activate(&blocked_page()).await;

        assert_eq!(navigator.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_minted_host_latches_session_flag() {
        let navigator = RecordingNavigator::new(false);
        let (mut ctl, _) = controller(RotationMode::Mint, navigator.clone()).await;

        let mut page = blocked_page();
        page.hostname = "x7k2p9.example.com".into();
        page.url = "https://x7k2p9.example.com/landing".into();

        assert_eq!(ctl.evaluate(&page).await, Decision::Stay);
        assert!(ctl.session.already_redirected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_redirect_throttled_within_window() {
        let navigator = RecordingNavigator::new(false);
        let (mut ctl, _) = controller(RotationMode::Registry, navigator.clone()).await;

        ctl.activate(&blocked_page()).await;
        assert_eq!(navigator.count(), 1);

        // A fresh session on the same origin shares the persisted stamp
        let session = Arc::new(SessionFlags::new());
        ctl.session = session;
        ctl.state = ControllerState::Init;
        ctl.activate(&blocked_page()).await;
        assert_eq!(navigator.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_page_marks_current_available() {
        let navigator = RecordingNavigator::new(false);
        let (mut ctl, registry) = controller(RotationMode::Registry, navigator.clone()).await;
        registry.lock().await.mark_blocked("a").await;

        assert_eq!(ctl.evaluate(&clean_page()).await, Decision::Stay);
        assert_eq!(registry.lock().await.blocked_len(), 0);
        assert_eq!(navigator.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_stays_put() {
        let navigator = RecordingNavigator::new(true);
        let (mut ctl, registry) = controller(RotationMode::Registry, navigator.clone()).await;

        ctl.activate(&blocked_page()).await;

        // Decision was made (endpoint rotated) but the context stayed
        assert_eq!(navigator.count(), 0);
        assert_eq!(registry.lock().await.current().label, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_notice_shown_before_navigation() {
        let navigator = RecordingNavigator::new(false);
        let (mut ctl, _) = controller(RotationMode::Registry, navigator.clone()).await;
        let notice = Arc::new(CountingNotice {
            shown: AtomicUsize::new(0),
        });
        ctl.notice = notice.clone();

        ctl.activate(&blocked_page()).await;
        assert_eq!(notice.shown.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rebuild_url_preserves_components() {
        assert_eq!(
            rebuild_url("https://a.example.com:8443/p/q?x=1#frag", "b.example.com"),
            "https://b.example.com/p/q?x=1#frag"
        );
        assert_eq!(
            rebuild_url("not a url", "b.example.com"),
            "https://b.example.com/"
        );
    }
}
