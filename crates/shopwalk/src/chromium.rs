//! Real browser backend over the Chrome DevTools Protocol.
//!
//! Elements resolved by [`ChromiumDriver::find_all`] are registered in a
//! page-global table (`window.__sw_handles`) and addressed by id afterwards.
//! A navigation wipes the table and a re-render disconnects the node, so a
//! handle that is missing or no longer connected answers
//! [`ShopwalkError::StaleReference`].
//!
//! Native clicks and hovers go through `Input.dispatchMouseEvent` at the
//! element's centre. The point is hit-tested first: when another node sits
//! on top (a cookie banner, a spinner overlay), the click is rejected
//! instead of landing on the overlay.

use crate::driver::{BrowserDriver, ElementHandle, ElementSnapshot};
use crate::locator::{js_string, Locator};
use crate::result::{ShopwalkError, ShopwalkResult};
use crate::session::{DriverFactory, SessionProfile};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const REGISTRY: &str = "window.__sw_handles";

fn cdp_error(e: impl std::fmt::Display) -> ShopwalkError {
    ShopwalkError::driver(e.to_string())
}

/// Wrap `body` (a JS function of the element) so it runs against a
/// registered handle, reporting staleness instead of throwing.
fn element_script(handle_id: &str, body: &str) -> String {
    format!(
        "(() => {{ const el = ({REGISTRY} || {{}})[{id}]; \
         if (!el || !el.isConnected) return {{ stale: true, value: null }}; \
         const v = ({body})(el); \
         return {{ stale: false, value: v === undefined ? null : v }}; }})()",
        id = js_string(handle_id),
    )
}

fn find_all_script(query_all: &str) -> String {
    format!(
        "(() => {{ const reg = {REGISTRY} = {REGISTRY} || {{}}; \
         window.__sw_next = window.__sw_next || 0; \
         for (const k of Object.keys(reg)) {{ if (!reg[k].isConnected) delete reg[k]; }} \
         return ({query_all}).map(el => {{ \
           if (!el.__sw_id) el.__sw_id = 'sw-' + (++window.__sw_next); \
           reg[el.__sw_id] = el; return el.__sw_id; }}); }})()"
    )
}

const INSPECT: &str = "el => { \
    const s = getComputedStyle(el); const r = el.getBoundingClientRect(); \
    const tag = el.tagName.toLowerCase(); \
    let text; \
    if (tag === 'input' || tag === 'textarea') text = el.value; \
    else if (tag === 'select') text = el.selectedOptions.length ? el.selectedOptions[0].text : ''; \
    else text = el.innerText; \
    return { tag, text: text || '', \
      displayed: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none' && s.opacity !== '0', \
      enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true' }; }";

const TARGET_POINT: &str = "el => { \
    el.scrollIntoView({ block: 'center', inline: 'center' }); \
    const r = el.getBoundingClientRect(); \
    if (r.width === 0 || r.height === 0) return { x: 0, y: 0, hit: false, blocker: 'zero-size box' }; \
    const x = r.left + r.width / 2; const y = r.top + r.height / 2; \
    const top = document.elementFromPoint(x, y); \
    const hit = !!top && (top === el || el.contains(top)); \
    const blocker = top ? top.tagName.toLowerCase() + (top.className ? '.' + String(top.className).split(' ').join('.') : '') : 'nothing'; \
    return { x, y, hit, blocker }; }";

#[derive(Debug, Deserialize)]
struct Wrapped {
    stale: bool,
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TargetPoint {
    x: f64,
    y: f64,
    hit: bool,
    blocker: String,
}

/// [`BrowserDriver`] over a single Chromium tab
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    async fn eval(&self, script: &str) -> ShopwalkResult<serde_json::Value> {
        let result = self.page.evaluate(script).await.map_err(cdp_error)?;
        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    async fn on_element(
        &self,
        element: &ElementHandle,
        body: &str,
    ) -> ShopwalkResult<serde_json::Value> {
        let raw = self.eval(&element_script(&element.id, body)).await?;
        let wrapped: Wrapped = serde_json::from_value(raw)?;
        if wrapped.stale {
            return Err(ShopwalkError::StaleReference {
                element: element.id.clone(),
            });
        }
        Ok(wrapped.value)
    }

    /// Centre point of the element, rejected when something covers it
    async fn target_point(&self, element: &ElementHandle) -> ShopwalkResult<(f64, f64)> {
        let point: TargetPoint =
            serde_json::from_value(self.on_element(element, TARGET_POINT).await?)?;
        if !point.hit {
            return Err(ShopwalkError::InteractionRejected {
                locator: element.origin.clone(),
                reason: format!("point covered by {}", point.blocker),
            });
        }
        Ok((point.x, point.y))
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> ShopwalkResult<()> {
        let mut builder = DispatchMouseEventParams::builder().r#type(kind.clone()).x(x).y(y);
        if kind != DispatchMouseEventType::MouseMoved {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(cdp_error)?;
        self.page.execute(params).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn focus(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        let focused = self
            .on_element(element, "el => { el.focus(); return document.activeElement === el; }")
            .await?;
        if focused.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(ShopwalkError::InteractionRejected {
                locator: element.origin.clone(),
                reason: "element cannot take focus".to_string(),
            })
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> ShopwalkResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ShopwalkError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> ShopwalkResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    async fn find_all(&self, locator: &Locator) -> ShopwalkResult<Vec<ElementHandle>> {
        let ids: Vec<String> =
            serde_json::from_value(self.eval(&find_all_script(&locator.to_query_all())).await?)?;
        let origin = locator.to_string();
        Ok(ids
            .into_iter()
            .map(|id| ElementHandle::new(id, origin.clone()))
            .collect())
    }

    async fn inspect(&self, element: &ElementHandle) -> ShopwalkResult<ElementSnapshot> {
        Ok(serde_json::from_value(self.on_element(element, INSPECT).await?)?)
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> ShopwalkResult<Option<String>> {
        let body = format!(
            "el => {{ const n = {n}; if (n === 'value' && 'value' in el) return String(el.value); \
             return el.getAttribute(n); }}",
            n = js_string(name)
        );
        Ok(self
            .on_element(element, &body)
            .await?
            .as_str()
            .map(str::to_string))
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.on_element(
            element,
            "el => el.scrollIntoView({ block: 'center', inline: 'center' })",
        )
        .await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        let (x, y) = self.target_point(element).await?;
        self.mouse(DispatchMouseEventType::MouseMoved, x, y).await?;
        self.mouse(DispatchMouseEventType::MousePressed, x, y).await?;
        self.mouse(DispatchMouseEventType::MouseReleased, x, y).await
    }

    async fn js_click(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.on_element(element, "el => el.click()").await?;
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        let (x, y) = self.target_point(element).await?;
        self.mouse(DispatchMouseEventType::MouseMoved, x, y).await
    }

    async fn clear(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.set_value_js(element, "").await
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> ShopwalkResult<()> {
        self.focus(element).await?;
        let params = InsertTextParams::builder()
            .text(text)
            .build()
            .map_err(cdp_error)?;
        self.page.execute(params).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn press_enter(&self, element: &ElementHandle) -> ShopwalkResult<()> {
        self.focus(element).await?;
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(kind.clone())
                .key("Enter")
                .code("Enter")
                .windows_virtual_key_code(13)
                .native_virtual_key_code(13);
            if kind == DispatchKeyEventType::KeyDown {
                builder = builder.text("\r");
            }
            let params = builder.build().map_err(cdp_error)?;
            self.page.execute(params).await.map_err(cdp_error)?;
        }
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, label: &str) -> ShopwalkResult<()> {
        let body = format!(
            "el => {{ const o = Array.from(el.options || []).find(o => o.text.trim() === {l}); \
             if (!o) return false; el.value = o.value; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }}",
            l = js_string(label)
        );
        if self.on_element(element, &body).await?.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(ShopwalkError::InteractionRejected {
                locator: element.origin.clone(),
                reason: format!("no option {label:?}"),
            })
        }
    }

    async fn set_value_js(&self, element: &ElementHandle, text: &str) -> ShopwalkResult<()> {
        let body = format!(
            "el => {{ el.focus(); el.value = {t}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); }}",
            t = js_string(text)
        );
        self.on_element(element, &body).await?;
        Ok(())
    }

    async fn dispatch_event(&self, element: &ElementHandle, event: &str) -> ShopwalkResult<()> {
        let body = format!(
            "el => el.dispatchEvent(new MouseEvent({e}, {{ bubbles: true, cancelable: true, view: window }}))",
            e = js_string(event)
        );
        self.on_element(element, &body).await?;
        Ok(())
    }

    async fn dispatch_key(&self, element: &ElementHandle, key: &str) -> ShopwalkResult<()> {
        let body = format!(
            "el => {{ const k = {k}; \
             for (const type of ['keydown', 'keypress', 'keyup']) \
               el.dispatchEvent(new KeyboardEvent(type, \
                 {{ key: k, code: k, bubbles: true, cancelable: true }})); \
             if (k === 'Enter' && el.form) el.form.requestSubmit(); }}",
            k = js_string(key)
        );
        self.on_element(element, &body).await?;
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> ShopwalkResult<serde_json::Value> {
        self.eval(script).await
    }

    async fn screenshot(&self) -> ShopwalkResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(|e| ShopwalkError::Screenshot {
                message: e.to_string(),
            })?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| ShopwalkError::Screenshot {
                message: e.to_string(),
            })
    }

    async fn quit(&self) -> ShopwalkResult<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await.map_err(cdp_error);
        let _ = browser.wait().await;
        self.handler.abort();
        closed.map(|_| ())
    }
}

/// Launches one Chromium per session
#[derive(Debug, Clone, Default)]
pub struct ChromiumFactory {
    executable: Option<PathBuf>,
}

impl ChromiumFactory {
    /// Use the Chromium found on `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific Chromium binary
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }
}

#[async_trait]
impl DriverFactory for ChromiumFactory {
    async fn launch(&self, profile: &SessionProfile) -> ShopwalkResult<Arc<dyn BrowserDriver>> {
        let mut builder = CdpConfig::builder()
            .window_size(profile.window_width, profile.window_height)
            .args(profile.chrome_args());

        if !profile.headless {
            builder = builder.with_head();
        }
        if profile.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(dir) = &profile.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|message| ShopwalkError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(config)
                .await
                .map_err(|e| ShopwalkError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(ShopwalkError::BrowserLaunch {
                    message: e.to_string(),
                });
            }
        };

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(profile.window_width))
            .height(i64::from(profile.window_height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|message| ShopwalkError::BrowserLaunch { message })?;
        if let Err(e) = page.execute(metrics).await {
            tracing::warn!(error = %e, "viewport override rejected");
        }

        tracing::info!(headless = profile.headless, "chromium launched");
        Ok(Arc::new(ChromiumDriver {
            browser: Mutex::new(browser),
            page,
            handler,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_script_checks_connection() {
        let script = element_script("sw-4", "el => el.click()");
        assert!(script.contains("window.__sw_handles"));
        assert!(script.contains("\"sw-4\""));
        assert!(script.contains("isConnected"));
    }

    #[test]
    fn test_find_all_script_embeds_query() {
        let loc = Locator::css("add button", "button[data-qa-action='add-to-cart']");
        let script = find_all_script(&loc.to_query_all());
        assert!(script.contains("querySelectorAll"));
        assert!(script.contains("__sw_id"));
    }
}
