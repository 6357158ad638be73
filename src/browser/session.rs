//! Browser lifetime: one Chrome process, one isolated context, one page
use chromiumoxide::cdp::browser_protocol::emulation::SetLocaleOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::{Browser, BrowserConfig, Handler};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ChromiumPage;
use crate::config::BrowserSettings;
use crate::error::{Result, ScrapeError};

/// A launched browser holding a single automation page.
///
/// Acquire with [`BrowserSession::acquire`] and always finish with [`BrowserSession::release`].
pub struct BrowserSession {
    browser: Browser,
    page: ChromiumPage,
    context_id: Option<BrowserContextId>,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch the browser and open a page configured with the locale and user agent
    pub async fn acquire(settings: &BrowserSettings) -> Result<Self> {
        let config = browser_config(settings)?;

        info!(
            "🌐 Launching browser (headless: {}, locale: {})",
            settings.headless, settings.locale
        );
        let (mut browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;
        let handler_task = spawn_handler_task(handler);

        match open_page(&mut browser, settings).await {
            Ok((page, context_id)) => Ok(Self {
                browser,
                page,
                context_id,
                handler_task,
            }),
            Err(e) => {
                warn!("Browser setup failed, shutting down: {}", e);
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                Err(e)
            }
        }
    }

    pub fn page(&self) -> &ChromiumPage {
        &self.page
    }

    /// Close page, context and browser in that order. Teardown failures are only logged.
    pub async fn release(mut self) {
        if let Err(e) = self.page.into_inner().close().await {
            debug!("page close failed: {}", e);
        }

        if let Some(context_id) = self.context_id.take() {
            if let Err(e) = self.browser.dispose_browser_context(context_id).await {
                debug!("context dispose failed: {}", e);
            }
        }

        if let Err(e) = self.browser.close().await {
            debug!("browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("browser wait failed: {}", e);
        }
        self.handler_task.abort();
        debug!("browser session released");
    }
}

fn browser_config(settings: &BrowserSettings) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .window_size(settings.window_width, settings.window_height)
        .arg(format!("--lang={}", settings.locale));

    if !settings.headless {
        builder = builder.with_head();
    }

    if settings.no_sandbox {
        builder = builder.no_sandbox().arg("--disable-setuid-sandbox");
    }

    if let Some(executable) = &settings.chrome_executable {
        builder = builder.chrome_executable(executable);
    }

    builder.build().map_err(ScrapeError::Launch)
}

async fn open_page(
    browser: &mut Browser,
    settings: &BrowserSettings,
) -> Result<(ChromiumPage, Option<BrowserContextId>)> {
    // An isolated context keeps cookies and storage out of any default profile
    let context_id = match browser
        .create_browser_context(CreateBrowserContextParams::default())
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Could not create isolated context, using default: {}", e);
            None
        }
    };

    let target = blank_target(context_id.as_ref())?;
    let page = browser
        .new_page(target)
        .await
        .map_err(|e| ScrapeError::automation("open page", e))?;

    let mut user_agent = SetUserAgentOverrideParams::new(settings.user_agent.clone());
    user_agent.accept_language = Some(settings.locale.clone());
    page.set_user_agent(user_agent)
        .await
        .map_err(|e| ScrapeError::automation("set user agent", e))?;

    let locale = SetLocaleOverrideParams {
        locale: Some(settings.locale.clone()),
    };
    if let Err(e) = page.execute(locale).await {
        // Older Chrome builds reject the override; --lang still applies
        debug!("locale override rejected: {}", e);
    }

    Ok((ChromiumPage::new(page), context_id))
}

/// A blank page target, inside `context_id` when one was created
fn blank_target(context_id: Option<&BrowserContextId>) -> Result<CreateTargetParams> {
    let mut target = CreateTargetParams::builder().url("about:blank");
    if let Some(id) = context_id {
        target = target.browser_context_id(id.clone());
    }
    target
        .build()
        .map_err(|e| ScrapeError::automation("open page", e))
}

fn spawn_handler_task(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("chromiumoxide handler event error: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_target_uses_isolated_context() {
        let id = BrowserContextId::new("ctx-1");
        let target = blank_target(Some(&id)).unwrap();
        assert_eq!(target.url, "about:blank");
        assert_eq!(target.browser_context_id, Some(id));
    }

    #[test]
    fn test_blank_target_without_context() {
        let target = blank_target(None).unwrap();
        assert!(target.browser_context_id.is_none());
    }
}
