//! System browser launcher

use tracing::debug;

use super::traits::BrowserOpener;

/// Opens URLs with the desktop's default handler, or a named application
/// when a browser hint is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str, browser_hint: Option<&str>) -> Result<(), String> {
        let result = match browser_hint.map(str::trim).filter(|hint| !hint.is_empty()) {
            Some(app) => {
                debug!(app, "opening authorization URL with requested browser");
                open::with(url, app)
            }
            None => {
                debug!("opening authorization URL with default browser");
                open::that(url)
            }
        };

        result.map_err(|e| format!("failed to launch browser: {e}"))
    }
}
