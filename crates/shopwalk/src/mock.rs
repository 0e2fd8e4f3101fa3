//! In-memory DOM driver for exercising the harness without a browser.
//!
//! [`MockDriver`] keeps a flat list of [`MockElement`]s keyed by the
//! [`Selector`] that finds them. Elements can appear late, reject a
//! number of native clicks, go stale on click, or trigger [`DomEffect`]s
//! that reshape the page, which is enough to model every timing hazard the
//! wait and interaction layers defend against.

use crate::driver::{BrowserDriver, ElementHandle, ElementSnapshot};
use crate::locator::{Locator, Selector};
use crate::result::{ShopwalkError, ShopwalkResult};
use crate::session::{DriverFactory, SessionProfile};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A change applied to the mock DOM when an element is activated
#[derive(Debug, Clone)]
pub enum DomEffect {
    /// Make matching elements displayed
    Show(Selector),
    /// Make matching elements displayed once the delay has passed
    ShowAfter(Selector, Duration),
    /// Hide matching elements
    Hide(Selector),
    /// Remove matching elements (outstanding handles go stale)
    Remove(Selector),
    /// Insert a new element
    Insert(Box<MockElement>),
    /// Replace the text of matching elements
    SetText(Selector, String),
    /// Treat the text as an integer and add the delta
    AddToNumber(Selector, i64),
    /// Re-render matching elements under fresh ids
    Rerender(Selector),
    /// Change the current URL
    Navigate(String),
}

/// An element in the mock DOM
#[derive(Debug, Clone)]
pub struct MockElement {
    id: u64,
    name: String,
    selector: Selector,
    tag: String,
    text: String,
    attributes: HashMap<String, String>,
    displayed: bool,
    enabled: bool,
    appear_delay: Option<Duration>,
    visible_from: Option<Instant>,
    reject_clicks: u32,
    stale_clicks: u32,
    rerender_reads: u32,
    reject_js_clicks: bool,
    options: Vec<String>,
    on_click: Vec<DomEffect>,
    on_hover: Vec<DomEffect>,
    on_enter: Vec<DomEffect>,
    on_select: Vec<DomEffect>,
}

impl MockElement {
    /// Element found by `locator`, displayed and enabled
    #[must_use]
    pub fn new(locator: &Locator) -> Self {
        Self {
            id: 0,
            name: locator.name().to_string(),
            selector: locator.selector().clone(),
            tag: "div".to_string(),
            text: String::new(),
            attributes: HashMap::new(),
            displayed: true,
            enabled: true,
            appear_delay: None,
            visible_from: None,
            reject_clicks: 0,
            stale_clicks: 0,
            rerender_reads: 0,
            reject_js_clicks: false,
            options: Vec::new(),
            on_click: Vec::new(),
            on_hover: Vec::new(),
            on_enter: Vec::new(),
            on_select: Vec::new(),
        }
    }

    /// Set tag name
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set text (or value for inputs)
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Present in the DOM but not displayed
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Disabled control
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Becomes displayed `delay` after insertion
    #[must_use]
    pub const fn appears_after(mut self, delay: Duration) -> Self {
        self.appear_delay = Some(delay);
        self
    }

    /// Reject the next `n` native pointer or keyboard actions as intercepted
    #[must_use]
    pub const fn rejects_clicks(mut self, n: u32) -> Self {
        self.reject_clicks = n;
        self
    }

    /// Re-render (and report staleness) on the next `n` native clicks
    #[must_use]
    pub const fn stale_on_click(mut self, n: u32) -> Self {
        self.stale_clicks = n;
        self
    }

    /// Re-render right after each of the next `n` inspections, so the
    /// handle a wait just returned is already stale
    #[must_use]
    pub const fn rerenders_after_read(mut self, n: u32) -> Self {
        self.rerender_reads = n;
        self
    }

    /// Reject programmatic clicks too
    #[must_use]
    pub const fn rejects_js_clicks(mut self) -> Self {
        self.reject_js_clicks = true;
        self
    }

    /// Options of a `<select>`; the text holds the selected one
    #[must_use]
    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag = "select".to_string();
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Effect of a successful click
    #[must_use]
    pub fn on_click(mut self, effect: DomEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    /// Effect of hovering
    #[must_use]
    pub fn on_hover(mut self, effect: DomEffect) -> Self {
        self.on_hover.push(effect);
        self
    }

    /// Effect of pressing Enter
    #[must_use]
    pub fn on_enter(mut self, effect: DomEffect) -> Self {
        self.on_enter.push(effect);
        self
    }

    /// Effect of selecting an option
    #[must_use]
    pub fn on_select(mut self, effect: DomEffect) -> Self {
        self.on_select.push(effect);
        self
    }

    fn is_displayed(&self, now: Instant) -> bool {
        self.displayed && self.visible_from.map_or(true, |from| now >= from)
    }

    fn handle(&self) -> ElementHandle {
        ElementHandle::new(format!("mock-{}", self.id), self.name.clone())
    }
}

#[derive(Debug)]
struct MockDom {
    url: String,
    elements: Vec<MockElement>,
    next_id: u64,
    history: Vec<String>,
    screenshot: Vec<u8>,
    quit: bool,
}

impl MockDom {
    fn insert(&mut self, mut element: MockElement) {
        self.next_id += 1;
        element.id = self.next_id;
        if let Some(delay) = element.appear_delay.take() {
            element.visible_from = Some(Instant::now() + delay);
        }
        self.elements.push(element);
    }

    fn ensure_alive(&self) -> ShopwalkResult<()> {
        if self.quit {
            Err(ShopwalkError::driver("session terminated"))
        } else {
            Ok(())
        }
    }

    fn position(&self, handle: &ElementHandle) -> ShopwalkResult<usize> {
        self.ensure_alive()?;
        self.elements
            .iter()
            .position(|e| format!("mock-{}", e.id) == handle.id)
            .ok_or_else(|| ShopwalkError::StaleReference {
                element: handle.id.clone(),
            })
    }

    fn rerender_at(&mut self, index: usize) {
        self.next_id += 1;
        self.elements[index].id = self.next_id;
    }

    fn apply(&mut self, effects: Vec<DomEffect>) {
        let now = Instant::now();
        for effect in effects {
            match effect {
                DomEffect::Show(sel) => self.each(&sel, |e| {
                    e.displayed = true;
                    e.visible_from = None;
                }),
                DomEffect::ShowAfter(sel, delay) => self.each(&sel, |e| {
                    e.displayed = true;
                    e.visible_from = Some(now + delay);
                }),
                DomEffect::Hide(sel) => self.each(&sel, |e| e.displayed = false),
                DomEffect::Remove(sel) => self.elements.retain(|e| e.selector != sel),
                DomEffect::Insert(element) => self.insert(*element),
                DomEffect::SetText(sel, text) => self.each(&sel, |e| e.text.clone_from(&text)),
                DomEffect::AddToNumber(sel, delta) => self.each(&sel, |e| {
                    let current: i64 = e.text.trim().parse().unwrap_or(0);
                    e.text = (current + delta).to_string();
                }),
                DomEffect::Rerender(sel) => {
                    let indices: Vec<usize> = self
                        .elements
                        .iter()
                        .enumerate()
                        .filter(|(_, e)| e.selector == sel)
                        .map(|(i, _)| i)
                        .collect();
                    for i in indices {
                        self.rerender_at(i);
                    }
                }
                DomEffect::Navigate(url) => self.url = url,
            }
        }
    }

    fn each(&mut self, sel: &Selector, mut f: impl FnMut(&mut MockElement)) {
        self.elements
            .iter_mut()
            .filter(|e| &e.selector == sel)
            .for_each(|e| f(e));
    }
}

/// Scriptable driver backed by an in-memory DOM
#[derive(Debug)]
pub struct MockDriver {
    dom: Mutex<MockDom>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create an empty page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self {
            dom: Mutex::new(MockDom {
                url: "about:blank".to_string(),
                elements: Vec::new(),
                next_id: 0,
                history: Vec::new(),
                screenshot: vec![0x89, b'P', b'N', b'G'],
                quit: false,
            }),
        }
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(self, element: MockElement) -> Self {
        self.insert(element);
        self
    }

    /// Insert an element into the live DOM
    pub fn insert(&self, element: MockElement) {
        self.dom.lock().insert(element);
    }

    /// Apply effects as if the page changed on its own
    pub fn apply(&self, effects: Vec<DomEffect>) {
        self.dom.lock().apply(effects);
    }

    /// Every recorded call, e.g. `click:add button`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.dom.lock().history.clone()
    }

    /// Number of recorded calls with the given prefix
    #[must_use]
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.dom
            .lock()
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.count_calls(prefix) > 0
    }

    /// Text of the first element matching the locator
    #[must_use]
    pub fn text_of(&self, locator: &Locator) -> Option<String> {
        self.dom
            .lock()
            .elements
            .iter()
            .find(|e| &e.selector == locator.selector())
            .map(|e| e.text.clone())
    }

    /// Whether `quit` has been called
    #[must_use]
    pub fn is_quit(&self) -> bool {
        self.dom.lock().quit
    }

    fn record(&self, call: String) {
        self.dom.lock().history.push(call);
    }

    fn rejected(handle: &ElementHandle, reason: &str) -> ShopwalkError {
        ShopwalkError::InteractionRejected {
            locator: handle.origin.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> ShopwalkResult<()> {
        let mut dom = self.dom.lock();
        dom.ensure_alive()?;
        dom.history.push(format!("navigate:{url}"));
        dom.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> ShopwalkResult<String> {
        let dom = self.dom.lock();
        dom.ensure_alive()?;
        Ok(dom.url.clone())
    }

    async fn find_all(&self, locator: &Locator) -> ShopwalkResult<Vec<ElementHandle>> {
        let dom = self.dom.lock();
        dom.ensure_alive()?;
        Ok(dom
            .elements
            .iter()
            .filter(|e| &e.selector == locator.selector())
            .map(MockElement::handle)
            .collect())
    }

    async fn inspect(&self, element: &ElementHandle) -> ShopwalkResult<ElementSnapshot> {
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        let el = &mut dom.elements[idx];
        let snapshot = ElementSnapshot {
            tag: el.tag.clone(),
            text: el.text.clone(),
            displayed: el.is_displayed(Instant::now()),
            enabled: el.enabled,
        };
        if el.rerender_reads > 0 {
            el.rerender_reads -= 1;
            dom.rerender_at(idx);
        }
        Ok(snapshot)
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> ShopwalkResult<Option<String>> {
        let dom = self.dom.lock();
        let el = &dom.elements[dom.position(element)?];
        if name == "value" && matches!(el.tag.as_str(), "input" | "textarea" | "select") {
            return Ok(Some(el.text.clone()));
        }
        Ok(el.attributes.get(name).cloned())
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        let mut dom = self.dom.lock();
        let _ = dom.position(element)?;
        dom.history.push(format!("scroll:{}", element.origin));
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.record(format!("click:{}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        let now = Instant::now();
        let el = &mut dom.elements[idx];
        if !el.is_displayed(now) {
            return Err(Self::rejected(element, "element not interactable"));
        }
        if !el.enabled {
            return Err(Self::rejected(element, "element is disabled"));
        }
        if el.stale_clicks > 0 {
            el.stale_clicks -= 1;
            dom.rerender_at(idx);
            return Err(ShopwalkError::StaleReference {
                element: element.id.clone(),
            });
        }
        if el.reject_clicks > 0 {
            el.reject_clicks -= 1;
            return Err(Self::rejected(element, "click intercepted by overlay"));
        }
        let effects = el.on_click.clone();
        dom.apply(effects);
        Ok(())
    }

    async fn js_click(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.record(format!("js_click:{}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        let el = &dom.elements[idx];
        if el.reject_js_clicks {
            return Err(Self::rejected(element, "programmatic click ignored"));
        }
        let effects = el.on_click.clone();
        dom.apply(effects);
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.record(format!("hover:{}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        let now = Instant::now();
        let el = &mut dom.elements[idx];
        if !el.is_displayed(now) {
            return Err(Self::rejected(element, "element not interactable"));
        }
        if el.reject_clicks > 0 {
            el.reject_clicks -= 1;
            return Err(Self::rejected(element, "pointer intercepted by overlay"));
        }
        let effects = el.on_hover.clone();
        dom.apply(effects);
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.record(format!("clear:{}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        dom.elements[idx].text.clear();
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> ShopwalkResult<()> {
        self.record(format!("send_keys:{}:{text}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        let now = Instant::now();
        let el = &mut dom.elements[idx];
        if !el.is_displayed(now) || !el.enabled {
            return Err(Self::rejected(element, "element not interactable"));
        }
        if el.reject_clicks > 0 {
            el.reject_clicks -= 1;
            return Err(Self::rejected(element, "input covered by overlay"));
        }
        el.text.push_str(text);
        Ok(())
    }

    async fn press_enter(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.record(format!("enter:{}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        let el = &mut dom.elements[idx];
        if el.reject_clicks > 0 {
            el.reject_clicks -= 1;
            return Err(Self::rejected(element, "input covered by overlay"));
        }
        let effects = el.on_enter.clone();
        dom.apply(effects);
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, label: &str) -> ShopwalkResult<()> {
        self.record(format!("select:{}:{label}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        let el = &mut dom.elements[idx];
        if !el.options.iter().any(|o| o == label) {
            return Err(Self::rejected(element, &format!("no option {label:?}")));
        }
        el.text = label.to_string();
        let effects = el.on_select.clone();
        dom.apply(effects);
        Ok(())
    }

    async fn set_value_js(&self, element: &ElementHandle, text: &str) -> ShopwalkResult<()> {
        self.record(format!("set_value_js:{}:{text}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        dom.elements[idx].text = text.to_string();
        Ok(())
    }

    async fn dispatch_event(&self, element: &ElementHandle, event: &str) -> ShopwalkResult<()> {
        self.record(format!("dispatch:{}:{event}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        let effects = match event {
            "mouseover" | "mouseenter" => dom.elements[idx].on_hover.clone(),
            "click" => dom.elements[idx].on_click.clone(),
            _ => Vec::new(),
        };
        dom.apply(effects);
        Ok(())
    }

    async fn dispatch_key(&self, element: &ElementHandle, key: &str) -> ShopwalkResult<()> {
        self.record(format!("dispatch_key:{}:{key}", element.origin));
        let mut dom = self.dom.lock();
        let idx = dom.position(element)?;
        if key == "Enter" {
            let effects = dom.elements[idx].on_enter.clone();
            dom.apply(effects);
        }
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> ShopwalkResult<serde_json::Value> {
        let dom = self.dom.lock();
        dom.ensure_alive()?;
        if script.contains("document.readyState") {
            return Ok(serde_json::Value::String("complete".to_string()));
        }
        Ok(serde_json::Value::Null)
    }

    async fn screenshot(&self) -> ShopwalkResult<Vec<u8>> {
        let mut dom = self.dom.lock();
        dom.ensure_alive()?;
        dom.history.push("screenshot".to_string());
        Ok(dom.screenshot.clone())
    }

    async fn quit(&self) -> ShopwalkResult<()> {
        let mut dom = self.dom.lock();
        dom.history.push("quit".to_string());
        dom.quit = true;
        Ok(())
    }
}

/// Factory handing out mock drivers built by a closure
pub struct MockDriverFactory {
    build: Box<dyn Fn() -> MockDriver + Send + Sync>,
    launched: Mutex<Vec<Arc<MockDriver>>>,
    profiles: Mutex<Vec<SessionProfile>>,
}

impl std::fmt::Debug for MockDriverFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriverFactory")
            .field("launched", &self.launched.lock().len())
            .finish_non_exhaustive()
    }
}

impl MockDriverFactory {
    /// Create a factory from a DOM builder
    pub fn new(build: impl Fn() -> MockDriver + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
            launched: Mutex::new(Vec::new()),
            profiles: Mutex::new(Vec::new()),
        }
    }

    /// Every driver launched so far, oldest first
    #[must_use]
    pub fn launched(&self) -> Vec<Arc<MockDriver>> {
        self.launched.lock().clone()
    }

    /// The most recent driver
    #[must_use]
    pub fn last(&self) -> Option<Arc<MockDriver>> {
        self.launched.lock().last().cloned()
    }

    /// Profiles passed to `launch`
    #[must_use]
    pub fn profiles(&self) -> Vec<SessionProfile> {
        self.profiles.lock().clone()
    }
}

#[async_trait]
impl DriverFactory for MockDriverFactory {
    async fn launch(&self, profile: &SessionProfile) -> ShopwalkResult<Arc<dyn BrowserDriver>> {
        let driver = Arc::new((self.build)());
        self.launched.lock().push(Arc::clone(&driver));
        self.profiles.lock().push(profile.clone());
        Ok(driver)
    }
}
