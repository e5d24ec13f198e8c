#![allow(dead_code)]

use async_trait::async_trait;
use followerbot_rs::browser::{Browser, BrowserError, Element, Locate};
use followerbot_rs::config::{BatchLimit, Config, DelayRange};
use followerbot_rs::engine::identifier::Identifier;
use followerbot_rs::engine::pacing::Pacer;
use followerbot_rs::engine::queue::WorkQueue;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const ROOT: &str = "https://www.flickr.com/";
pub const OWNER: &str = "https://www.flickr.com/people/me";

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub href: String,
    pub text: String,
}

/// What a click changes on the current page.
#[derive(Debug, Clone)]
pub enum Effect {
    Remove(String),
    Add(String, Vec<FakeElement>),
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
    effects: HashMap<String, Vec<Effect>>,
    intercepted: HashSet<String>,
}

impl FakePage {
    pub fn links(&mut self, selector: &str, hrefs: &[&str]) -> &mut Self {
        let list = self.elements.entry(selector.to_string()).or_default();
        list.extend(hrefs.iter().map(|h| FakeElement { href: h.to_string(), text: String::new() }));
        self
    }

    pub fn texts(&mut self, selector: &str, texts: &[&str]) -> &mut Self {
        let list = self.elements.entry(selector.to_string()).or_default();
        list.extend(texts.iter().map(|t| FakeElement { href: String::new(), text: t.to_string() }));
        self
    }

    /// A single element without attributes.
    pub fn shows(&mut self, selector: &str) -> &mut Self {
        self.elements.entry(selector.to_string()).or_default().push(FakeElement::default());
        self
    }

    pub fn on_click(&mut self, selector: &str, effect: Effect) -> &mut Self {
        self.effects.entry(selector.to_string()).or_default().push(effect);
        self
    }

    pub fn intercept(&mut self, selector: &str) -> &mut Self {
        self.intercepted.insert(selector.to_string());
        self
    }

    fn get(&self, selector: &str) -> &[FakeElement] {
        self.elements.get(selector).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Scripted in-memory site. Unknown URLs load as empty pages.
#[derive(Debug, Default)]
pub struct FakeBrowser {
    pages: HashMap<String, FakePage>,
    unreachable: HashSet<String>,
    current: String,
    /// Where the browser lands after Enter is pressed on a login field.
    pub after_enter: Option<String>,
    pub visits: Vec<String>,
    pub clicks: Vec<(String, String)>,
    pub typed: Vec<(String, String)>,
    pub scrolls: usize,
    pub cookies: Vec<Value>,
    pub local: BTreeMap<String, String>,
    pub session: BTreeMap<String, String>,
    pub quit_called: bool,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&mut self, url: &str) -> &mut FakePage {
        self.pages.entry(url.to_string()).or_default()
    }

    pub fn unreachable(&mut self, url: &str) -> &mut Self {
        self.unreachable.insert(url.to_string());
        self
    }

    pub fn visits_of(&self, url: &str) -> usize {
        self.visits.iter().filter(|v| v.as_str() == url).count()
    }

    pub fn clicked(&self, url: &str, selector: &str) -> bool {
        self.clicks.iter().any(|(u, s)| u == url && s == selector)
    }

    fn current_page(&self) -> Option<&FakePage> {
        self.pages.get(&self.current)
    }

    fn elements(&self, selector: &str) -> Vec<FakeElement> {
        self.current_page().map(|p| p.get(selector).to_vec()).unwrap_or_default()
    }

    fn click_index(&mut self, selector: &str, index: usize) -> Result<(), BrowserError> {
        let url = self.current.clone();
        let page = self.pages.entry(url.clone()).or_default();
        if page.get(selector).len() <= index {
            return Err(BrowserError::NoSuchElement(selector.to_string()));
        }
        if page.intercepted.contains(selector) {
            return Err(BrowserError::ClickIntercepted(selector.to_string()));
        }
        for effect in page.effects.get(selector).cloned().unwrap_or_default() {
            match effect {
                Effect::Remove(target) => {
                    page.elements.remove(&target);
                }
                Effect::Add(target, elements) => {
                    page.elements.entry(target).or_default().extend(elements);
                }
            }
        }
        self.clicks.push((url, selector.to_string()));
        Ok(())
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<bool, BrowserError> {
        self.visits.push(url.to_string());
        if self.unreachable.contains(url) {
            return Ok(false);
        }
        self.current = url.to_string();
        Ok(true)
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        Ok(self.current.clone())
    }

    async fn locate(&mut self, selector: &str, _opts: Locate) -> Result<Vec<Element>, BrowserError> {
        Ok((0..self.elements(selector).len())
            .map(|i| Element { id: format!("{}#{}", selector, i) })
            .collect())
    }

    async fn read_attributes(&mut self, selector: &str, _name: &str, _opts: Locate) -> Result<Vec<String>, BrowserError> {
        Ok(self.elements(selector).into_iter().map(|e| e.href).collect())
    }

    async fn read_attribute_at(&mut self, selector: &str, index: usize, _name: &str) -> Result<String, BrowserError> {
        self.elements(selector)
            .get(index)
            .map(|e| e.href.clone())
            .ok_or_else(|| BrowserError::IndexOutOfRange { selector: selector.to_string(), index })
    }

    async fn read_text(&mut self, selector: &str, index: usize) -> Result<String, BrowserError> {
        self.elements(selector)
            .get(index)
            .map(|e| e.text.clone())
            .ok_or_else(|| BrowserError::IndexOutOfRange { selector: selector.to_string(), index })
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.click_index(selector, 0)
    }

    async fn click_nth(&mut self, selector: &str, index: usize) -> Result<(), BrowserError> {
        self.click_index(selector, index)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.scrolls += 1;
        Ok(())
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BrowserError> {
        Ok(self.elements(selector).len())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        self.typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn press_enter(&mut self, _selector: &str) -> Result<(), BrowserError> {
        if let Some(url) = &self.after_enter {
            self.current = url.clone();
        }
        Ok(())
    }

    async fn switch_to_frame(&mut self, selector: &str) -> Result<bool, BrowserError> {
        Ok(!self.elements(selector).is_empty())
    }

    async fn switch_to_parent(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn cookies(&mut self) -> Result<Vec<Value>, BrowserError> {
        Ok(self.cookies.clone())
    }

    async fn set_cookies(&mut self, cookies: &[Value]) -> Result<(), BrowserError> {
        self.cookies = cookies.to_vec();
        Ok(())
    }

    async fn local_storage(&mut self) -> Result<BTreeMap<String, String>, BrowserError> {
        Ok(self.local.clone())
    }

    async fn set_local_storage(&mut self, items: &BTreeMap<String, String>) -> Result<(), BrowserError> {
        self.local = items.clone();
        Ok(())
    }

    async fn session_storage(&mut self) -> Result<BTreeMap<String, String>, BrowserError> {
        Ok(self.session.clone())
    }

    async fn set_session_storage(&mut self, items: &BTreeMap<String, String>) -> Result<(), BrowserError> {
        self.session = items.clone();
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), BrowserError> {
        self.quit_called = true;
        Ok(())
    }
}

const NO_DELAY: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

/// Default configuration with every delay zeroed and persistence off.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.timing.step = NO_DELAY;
    config.timing.wait_task = NO_DELAY;
    config.persistence.enabled = false;
    config.system.user_email = "me@example.com".to_string();
    config.system.user_password = "secret".to_string();
    config
}

pub fn fixed(n: u32) -> BatchLimit {
    BatchLimit { min: n, max: n }
}

pub fn pacer() -> Pacer {
    Pacer::new(NO_DELAY, Some(7))
}

pub fn queue(items: &[&str]) -> WorkQueue {
    items.iter().map(|s| Identifier::new(*s)).collect()
}

pub fn contents(queue: &WorkQueue) -> Vec<String> {
    queue.iter().map(|id| id.as_str().to_string()).collect()
}

pub fn id(raw: &str) -> Identifier {
    Identifier::new(raw)
}

pub fn owner_url(suffix: &str) -> String {
    format!("{}{}", OWNER, suffix)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
