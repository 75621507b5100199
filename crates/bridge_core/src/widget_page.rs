use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use shared::domain::Widget;

use crate::error::BridgeError;

const SHOW_BUTTON_SELECTOR: &str = ".vcbutton";
const RUNNING_BORDER: &str = "border: 3px solid #00E600;";
const ARMED_BORDER: &str = "border: 3px solid #FFAA00;";

/// Supplies the console's current show buttons when the lighting socket opens.
#[async_trait]
pub trait WidgetSource: Send + Sync {
    async fn fetch_widgets(&self) -> Result<Vec<Widget>, BridgeError>;
}

/// Scrapes the lighting console's web UI.
pub struct HttpWidgetSource {
    http: Client,
    url: String,
}

impl HttpWidgetSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl WidgetSource for HttpWidgetSource {
    async fn fetch_widgets(&self) -> Result<Vec<Widget>, BridgeError> {
        let html = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_widget_page(&html)
    }
}

/// Extracts every show button from the console status page.
///
/// Running and armed states are only exposed through the inline border style.
/// Buttons without an `id` cannot be addressed and are skipped.
pub fn parse_widget_page(html: &str) -> Result<Vec<Widget>, BridgeError> {
    let selector = Selector::parse(SHOW_BUTTON_SELECTOR)
        .map_err(|err| BridgeError::StatusPageParse(err.to_string()))?;
    let document = Html::parse_document(html);

    let widgets = document
        .select(&selector)
        .filter_map(|element| {
            let id = element.value().attr("id")?;
            let style = element.value().attr("style").unwrap_or_default();
            let text: String = element.text().collect();
            Some(Widget {
                id: id.into(),
                text: text.trim().to_string(),
                active: style.contains(RUNNING_BORDER),
                monitoring: style.contains(ARMED_BORDER),
            })
        })
        .collect();
    Ok(widgets)
}

#[cfg(test)]
#[path = "tests/widget_page_tests.rs"]
mod tests;
