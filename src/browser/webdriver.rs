use crate::browser::types::{chrome_capabilities, element_ids, NewSession, Timeouts, WireError, WireResponse, ELEMENT_KEY};
use crate::browser::{Browser, BrowserError, Element, Locate};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

const ENTER_KEY: &str = "\u{E007}";

const READ_STORAGE: &str = "var s = window[arguments[0]]; var o = {}; \
    for (var i = 0; i < s.length; i++) { var k = s.key(i); o[k] = s.getItem(k); } return o;";

const WRITE_STORAGE: &str = "var s = window[arguments[0]]; s.clear(); var items = arguments[1]; \
    for (var k in items) { s.setItem(k, items[k]); }";

/// Browser session driven through a W3C WebDriver endpoint (chromedriver or a
/// Selenium hub).
pub struct WebDriver {
    client: Client,
    base: String,
    session_id: String,
    implicit_ms: u64,
}

impl WebDriver {
    pub async fn connect(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let timeout_ms = (config.timeout_secs * 1000.0) as u64;
        let client = Client::builder()
            // Page loads are bounded by the session timeouts, leave headroom.
            .timeout(Duration::from_millis(timeout_ms.saturating_mul(4).max(30_000)))
            .build()?;
        let base = config.webdriver_url.trim_end_matches('/').to_string();

        let caps = chrome_capabilities(
            &config.arguments,
            config.window_width,
            config.window_height,
            config.chrome_binary.as_deref(),
            timeout_ms,
        );
        let res = client.post(format!("{}/session", base)).json(&caps).send().await?;
        let body: WireResponse = res.json().await?;
        if let Some(err) = WireError::from_value(&body.value) {
            return Err(BrowserError::Protocol { error: err.error, message: err.message });
        }
        let session: NewSession = serde_json::from_value(body.value)
            .map_err(|e| BrowserError::Malformed(e.to_string()))?;
        debug!("WebDriver session {} opened on {}", session.session_id, base);

        Ok(Self {
            client,
            base,
            session_id: session.session_id,
            implicit_ms: timeout_ms,
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, BrowserError> {
        let url = format!("{}/session/{}{}", self.base, self.session_id, path);
        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let body: WireResponse = res
            .json()
            .await
            .map_err(|e| BrowserError::Malformed(format!("{} ({})", e, status)))?;

        if !status.is_success() {
            let err = WireError::from_value(&body.value).unwrap_or(WireError {
                error: status.to_string(),
                message: body.value.to_string(),
            });
            return Err(BrowserError::Protocol { error: err.error, message: err.message });
        }
        Ok(body.value)
    }

    async fn set_implicit(&self, ms: u64) -> Result<(), BrowserError> {
        let timeouts = Timeouts { page_load: None, implicit: Some(ms), script: None };
        self.command(Method::POST, "/timeouts", Some(json!(timeouts))).await?;
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Vec<String>, BrowserError> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        Ok(element_ids(&value))
    }

    async fn find_with(&self, selector: &str, no_wait: bool) -> Result<Vec<String>, BrowserError> {
        if !no_wait {
            return self.find(selector).await;
        }
        self.set_implicit(0).await?;
        let found = self.find(selector).await;
        self.set_implicit(self.implicit_ms).await?;
        found
    }

    async fn nth(&self, selector: &str, index: usize) -> Result<String, BrowserError> {
        let ids = self.find(selector).await?;
        if ids.is_empty() {
            return Err(BrowserError::NoSuchElement(selector.to_string()));
        }
        ids.into_iter().nth(index).ok_or(BrowserError::IndexOutOfRange {
            selector: selector.to_string(),
            index,
        })
    }

    async fn displayed(&self, id: &str) -> bool {
        match self.command(Method::GET, &format!("/element/{}/displayed", id), None).await {
            Ok(v) => v.as_bool().unwrap_or(false),
            // Stale references count as gone.
            Err(_) => false,
        }
    }

    async fn attribute(&self, id: &str, name: &str) -> Result<Option<String>, BrowserError> {
        // Properties resolve relative hrefs to absolute URLs.
        let value = self.command(Method::GET, &format!("/element/{}/property/{}", id, name), None).await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn click_element(&self, selector: &str, id: &str) -> Result<(), BrowserError> {
        match self.command(Method::POST, &format!("/element/{}/click", id), Some(json!({}))).await {
            Err(BrowserError::Protocol { error, .. }) if error == "element click intercepted" => {
                Err(BrowserError::ClickIntercepted(selector.to_string()))
            }
            other => other.map(|_| ()),
        }
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError> {
        self.command(Method::POST, "/execute/sync", Some(json!({ "script": script, "args": args })))
            .await
    }

    async fn read_storage(&self, name: &str) -> Result<BTreeMap<String, String>, BrowserError> {
        let value = self.execute(READ_STORAGE, vec![json!(name)]).await?;
        let items = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Ok(items)
    }

    async fn write_storage(&self, name: &str, items: &BTreeMap<String, String>) -> Result<(), BrowserError> {
        self.execute(WRITE_STORAGE, vec![json!(name), json!(items)]).await?;
        Ok(())
    }
}

#[async_trait]
impl Browser for WebDriver {
    async fn navigate(&mut self, url: &str) -> Result<bool, BrowserError> {
        match self.command(Method::POST, "/url", Some(json!({ "url": url }))).await {
            Ok(_) => Ok(true),
            Err(BrowserError::Protocol { error, message })
                if error == "timeout" || message.contains("net::ERR") =>
            {
                warn!("Navigation to {} failed: {} {}", url, error, message);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        let value = self.command(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| BrowserError::Malformed("url is not a string".to_string()))
    }

    async fn locate(&mut self, selector: &str, opts: Locate) -> Result<Vec<Element>, BrowserError> {
        let ids = self.find_with(selector, opts.no_wait).await?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if opts.visible_only && !self.displayed(&id).await {
                continue;
            }
            found.push(Element { id });
        }
        Ok(found)
    }

    async fn read_attributes(&mut self, selector: &str, name: &str, opts: Locate) -> Result<Vec<String>, BrowserError> {
        let elements = self.locate(selector, opts).await?;
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            if let Some(v) = self.attribute(&element.id, name).await? {
                values.push(v);
            }
        }
        Ok(values)
    }

    async fn read_attribute_at(&mut self, selector: &str, index: usize, name: &str) -> Result<String, BrowserError> {
        let id = self.nth(selector, index).await?;
        Ok(self.attribute(&id, name).await?.unwrap_or_default())
    }

    async fn read_text(&mut self, selector: &str, index: usize) -> Result<String, BrowserError> {
        let id = self.nth(selector, index).await?;
        let value = self.command(Method::GET, &format!("/element/{}/text", id), None).await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let id = self.nth(selector, 0).await?;
        self.click_element(selector, &id).await
    }

    async fn click_nth(&mut self, selector: &str, index: usize) -> Result<(), BrowserError> {
        let id = self.nth(selector, index).await?;
        self.click_element(selector, &id).await
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.execute("window.scrollTo(0, document.body.scrollHeight);", vec![]).await?;
        Ok(())
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BrowserError> {
        Ok(self.find(selector).await?.len())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let id = self.nth(selector, 0).await?;
        self.command(Method::POST, &format!("/element/{}/value", id), Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn press_enter(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.type_text(selector, ENTER_KEY).await
    }

    async fn switch_to_frame(&mut self, selector: &str) -> Result<bool, BrowserError> {
        let frames = self.find_with(&format!("iframe{}", selector), true).await?;
        let Some(id) = frames.into_iter().next() else {
            return Ok(false);
        };
        self.command(Method::POST, "/frame", Some(json!({ "id": { ELEMENT_KEY: id } })))
            .await?;
        Ok(true)
    }

    async fn switch_to_parent(&mut self) -> Result<(), BrowserError> {
        self.command(Method::POST, "/frame/parent", Some(json!({}))).await?;
        Ok(())
    }

    async fn cookies(&mut self) -> Result<Vec<Value>, BrowserError> {
        let value = self.command(Method::GET, "/cookie", None).await?;
        Ok(value.as_array().cloned().unwrap_or_default())
    }

    async fn set_cookies(&mut self, cookies: &[Value]) -> Result<(), BrowserError> {
        self.command(Method::DELETE, "/cookie", None).await?;
        for cookie in cookies {
            if let Err(e) = self.command(Method::POST, "/cookie", Some(json!({ "cookie": cookie }))).await {
                warn!("Cookie rejected: {}", e);
            }
        }
        Ok(())
    }

    async fn local_storage(&mut self) -> Result<BTreeMap<String, String>, BrowserError> {
        self.read_storage("localStorage").await
    }

    async fn set_local_storage(&mut self, items: &BTreeMap<String, String>) -> Result<(), BrowserError> {
        self.write_storage("localStorage", items).await
    }

    async fn session_storage(&mut self) -> Result<BTreeMap<String, String>, BrowserError> {
        self.read_storage("sessionStorage").await
    }

    async fn set_session_storage(&mut self, items: &BTreeMap<String, String>) -> Result<(), BrowserError> {
        self.write_storage("sessionStorage", items).await
    }

    async fn quit(&mut self) -> Result<(), BrowserError> {
        let url = format!("{}/session/{}", self.base, self.session_id);
        self.client.delete(&url).send().await?;
        Ok(())
    }
}
