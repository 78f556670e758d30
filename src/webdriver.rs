//! Minimal W3C WebDriver client over HTTP — just the commands the
//! flight bot needs (chromedriver speaks this protocol natively).

use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const ELEMENT_WAIT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// An element reference handed back by the driver.
pub struct Element(String);

pub struct Session {
    http: reqwest::Client,
    base: String,
}

impl Session {
    /// Open a Chrome session against a chromedriver endpoint.
    pub async fn start(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut args = vec![
            "--no-sandbox",
            "--start-maximized",
            "--disable-dev-shm-usage",
            "--disable-gpu",
        ];
        if headless {
            args.push("--headless=new");
        }
        let caps = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let http = reqwest::Client::new();
        let resp: Value = http
            .post(format!("{webdriver_url}/session"))
            .json(&caps)
            .send()
            .await?
            .json()
            .await
            .context("chromedriver returned a non-JSON session response")?;
        let value = unwrap_value(resp)?;
        let id = value["sessionId"]
            .as_str()
            .ok_or_else(|| anyhow!("WebDriver returned no session id: {value}"))?;
        Ok(Session {
            http,
            base: format!("{webdriver_url}/session/{id}"),
        })
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    /// Find one element by XPath. Errors if nothing matches yet.
    pub async fn find(&self, xpath: &str) -> Result<Element> {
        let value = self
            .post("/element", json!({ "using": "xpath", "value": xpath }))
            .await?;
        value[ELEMENT_KEY]
            .as_str()
            .map(|s| Element(s.to_string()))
            .ok_or_else(|| anyhow!("no element reference in response: {value}"))
    }

    /// Poll [`Session::find`] until the element exists — the explicit-wait
    /// idiom, since page renders lag navigation.
    pub async fn wait_for(&self, xpath: &str) -> Result<Element> {
        let deadline = Instant::now() + ELEMENT_WAIT;
        loop {
            match self.find(xpath).await {
                Ok(el) => return Ok(el),
                Err(e) if Instant::now() >= deadline => {
                    return Err(e.context(format!("timed out waiting for {xpath}")))
                }
                Err(_) => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    pub async fn clear(&self, el: &Element) -> Result<()> {
        self.post(&format!("/element/{}/clear", el.0), json!({}))
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, el: &Element, text: &str) -> Result<()> {
        self.post(&format!("/element/{}/value", el.0), json!({ "text": text }))
            .await?;
        Ok(())
    }

    pub async fn click(&self, el: &Element) -> Result<()> {
        self.post(&format!("/element/{}/click", el.0), json!({}))
            .await?;
        Ok(())
    }

    pub async fn attribute(&self, el: &Element, name: &str) -> Result<Option<String>> {
        let value = self
            .get(&format!("/element/{}/attribute/{}", el.0, name))
            .await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    pub async fn execute(&self, script: &str) -> Result<Value> {
        self.post("/execute/sync", json!({ "script": script, "args": [] }))
            .await
    }

    /// Best-effort teardown; a leaked session only costs a browser process.
    pub async fn quit(&self) {
        let _ = self.http.delete(&self.base).send().await;
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let resp: Value = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        unwrap_value(resp)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let resp: Value = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .await?
            .json()
            .await?;
        unwrap_value(resp)
    }
}

/// Responses wrap their payload in "value"; protocol errors carry
/// "error" and "message" inside it.
fn unwrap_value(mut resp: Value) -> Result<Value> {
    let value = resp["value"].take();
    if let Some(err) = value["error"].as_str() {
        let msg = value["message"].as_str().unwrap_or("");
        bail!("WebDriver {err}: {msg}");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_value_extracts_payload() {
        let v = unwrap_value(json!({ "value": { "sessionId": "abc" } })).unwrap();
        assert_eq!(v["sessionId"].as_str(), Some("abc"));
    }

    #[test]
    fn unwrap_value_surfaces_protocol_errors() {
        let err = unwrap_value(json!({
            "value": { "error": "no such element", "message": "not found" }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("no such element"));
    }
}
