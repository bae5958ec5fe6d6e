//! Blocked-page detection port.
//!
//! The heuristics that decide whether a rendered page is an interception
//! notice are policy, not architecture: navigation logic only consumes the
//! boolean. `IndicatorDetector` is the default policy; swap the trait
//! implementation to change it.

use serde::{Deserialize, Serialize};

/// Observable state of the page a context is currently showing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub hostname: String,
    pub title: String,
    pub body_text: String,
    pub body_html: String,
    pub user_agent: String,
}

/// Classifies the current page state: true means the page looks like a
/// block/interception notice rather than our content.
pub trait BlockedPageDetector: Send + Sync {
    fn classify(&self, page: &PageSnapshot) -> bool;
}

/// Substring-scan detector. Only pages viewed through one of the targeted
/// client agents are ever classified as blocked; everything else short-
/// circuits to false.
#[derive(Debug, Clone)]
pub struct IndicatorDetector {
    /// User-agent fragments identifying the in-app browsers that inject
    /// block notices.
    pub client_agents: Vec<String>,
    /// Phrases that appear in block-notice titles and bodies.
    pub indicators: Vec<String>,
    /// Hosts the client redirects intercepted pages to.
    pub interstitial_hosts: Vec<String>,
    /// URL fragments marking an interstitial warning page.
    pub interstitial_markers: Vec<String>,
    /// A very short replaced page containing one of these words is
    /// treated as a block notice.
    pub replaced_content_markers: Vec<String>,
}

impl Default for IndicatorDetector {
    fn default() -> Self {
        Self {
            client_agents: vec![
                "micromessenger".into(),
                "wechat".into(),
                "weixin".into(),
            ],
            indicators: vec![
                "has been blocked".into(),
                "has been reported".into(),
                "malicious content".into(),
                "fraudulent content".into(),
                "violates regulations".into(),
                "cannot be accessed".into(),
                "page unavailable for review".into(),
            ],
            interstitial_hosts: vec!["weixin.qq.com".into(), "wechat.com".into()],
            interstitial_markers: vec![
                "safecenter".into(),
                "blocked".into(),
                "warning".into(),
            ],
            replaced_content_markers: vec!["blocked".into(), "warning".into(), "security".into()],
        }
    }
}

impl IndicatorDetector {
    fn is_client_agent(&self, user_agent: &str) -> bool {
        let ua = user_agent.to_lowercase();
        self.client_agents.iter().any(|a| ua.contains(a))
    }

    fn contains_indicator(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.indicators
            .iter()
            .any(|i| text.contains(&i.to_lowercase()))
    }

    fn is_interstitial_url(&self, page: &PageSnapshot) -> bool {
        let url = page.url.to_lowercase();
        let hostname = page.hostname.to_lowercase();
        self.interstitial_hosts.iter().any(|h| hostname.contains(h))
            || (self.interstitial_hosts.iter().any(|h| url.contains(h))
                && self.interstitial_markers.iter().any(|m| url.contains(m)))
    }

    /// A tiny page whose remaining text is a warning word: the client
    /// replaced our content wholesale.
    fn is_replaced_content(&self, page: &PageSnapshot) -> bool {
        if page.body_text.len() >= 100 {
            return false;
        }
        let text = page.body_text.to_lowercase();
        self.replaced_content_markers
            .iter()
            .any(|m| text.contains(m))
    }
}

impl BlockedPageDetector for IndicatorDetector {
    fn classify(&self, page: &PageSnapshot) -> bool {
        if !self.is_client_agent(&page.user_agent) {
            return false;
        }

        let blocked = self.contains_indicator(&page.title)
            || self.contains_indicator(&page.body_text)
            || self.contains_indicator(&page.body_html)
            || self.is_interstitial_url(page)
            || self.is_replaced_content(page);

        if blocked {
            tracing::info!(hostname = %page.hostname, "Page classified as blocked");
        }
        blocked
    }
}
