//! Headless Chrome search session.
//!
//! Drives the course search page through the Chrome DevTools Protocol and
//! reads result rows from the rendered HTML.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use scraper::{Html, Selector};
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{Config, Semester};
use crate::services::SearchSession;
use crate::utils::wait_until;

/// Element present once the search form has rendered.
const FORM_READY_SELECTOR: &str = "#srchOpenSchyy";

/// A browser with one page pointed at the course search form.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    search_url: String,
    year: u16,
    semester: Semester,
    row_selector: String,
    page_script: String,
    page_timeout: Duration,
    poll_interval: Duration,
}

impl BrowserSession {
    /// Launch Chrome with the monitor settings.
    pub async fn launch(config: &Config) -> Result<Self> {
        let monitor = &config.monitor;

        let mut builder = BrowserConfig::builder();
        if let Some(path) = &monitor.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !monitor.headless {
            builder = builder.with_head();
        }
        builder = builder
            .window_size(1600, 1000)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");

        let browser_config = builder.build().map_err(AppError::automation)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(AppError::automation)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(AppError::automation)?;

        log::debug!("Browser launched (headless: {})", monitor.headless);

        Ok(Self {
            browser,
            page,
            handler,
            search_url: monitor.search_url.clone(),
            year: config.term.year,
            semester: config.term.semester,
            row_selector: monitor.row_selector.clone(),
            page_script: monitor.page_script.clone(),
            page_timeout: Duration::from_millis(monitor.page_timeout_ms),
            poll_interval: Duration::from_millis(monitor.poll_interval_ms),
        })
    }

    /// Close the browser and stop its event loop.
    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await.map_err(AppError::automation);
        self.handler.abort();
        closed.map(|_| ())
    }

    async fn run_script(&self, script: String) -> Result<()> {
        self.page
            .evaluate(script)
            .await
            .map_err(AppError::automation)?;
        Ok(())
    }
}

/// Script that fills the search form and submits it.
fn inquiry_script(year: u16, semester: Semester, subject: &str) -> Result<String> {
    let subject = serde_json::to_string(subject.trim())?;
    Ok(format!(
        "document.getElementById('srchOpenSchyy').value = '{year}';\
         document.getElementById('srchOpenShtm').value = '{code}';\
         document.getElementById('srchSbjtCd').value = {subject};\
         fnInquiry();",
        code = semester.code(),
    ))
}

/// Cell texts of every row matched by `selector`.
fn extract_rows(html: &str, selector: &str) -> Result<Vec<Vec<String>>> {
    let row_sel = Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
    let cell_sel = Selector::parse("td").map_err(|e| AppError::selector("td", format!("{e:?}")))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .collect())
}

#[async_trait]
impl SearchSession for BrowserSession {
    async fn open(&self, subject: &str) -> Result<()> {
        self.page
            .goto(self.search_url.as_str())
            .await
            .map_err(AppError::automation)?;

        let page = &self.page;
        let ready = wait_until(self.page_timeout, self.poll_interval, move || async move {
            Ok::<_, AppError>(page.find_element(FORM_READY_SELECTOR).await.is_ok())
        })
        .await?;
        if !ready {
            return Err(AppError::automation(format!(
                "search form did not load within {:?}",
                self.page_timeout
            )));
        }

        self.run_script(inquiry_script(self.year, self.semester, subject)?)
            .await
    }

    async fn rows(&self) -> Result<Vec<Vec<String>>> {
        let html = self.page.content().await.map_err(AppError::automation)?;
        extract_rows(&html, &self.row_selector)
    }

    async fn goto_page(&self, page: usize) -> Result<()> {
        let script = self.page_script.replace("{page}", &page.to_string());
        self.run_script(script).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inquiry_script_escapes_subject() {
        let script = inquiry_script(2025, Semester::Second, "445.206'").unwrap();
        assert!(script.contains("value = '2025'"));
        assert!(script.contains("U000200002U000300001"));
        assert!(script.contains(r#"value = "445.206'""#));
        assert!(script.ends_with("fnInquiry();"));
    }

    #[test]
    fn test_extract_rows() {
        let html = r#"
            <table class="tbl_basic"><thead><tr><th>h</th></tr></thead>
            <tbody>
              <tr><td> 445.206 </td><td>002</td></tr>
              <tr><td>445.206</td><td><span>00</span><span>3</span></td></tr>
            </tbody></table>
            <table class="other"><tbody><tr><td>x</td></tr></tbody></table>
        "#;
        let rows = extract_rows(html, "table.tbl_basic tbody tr").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["445.206", "002"]);
        assert_eq!(rows[1][1], "003");
    }
}
