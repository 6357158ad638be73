//! Opening the transcript engagement panel on a watch page
//!
//! Two routes lead to the panel: the overflow ("More actions") menu under the player and the
//! "Show transcript" button inside the expanded description. Layouts differ between
//! experiments and regions, so every route is an ordered list of locators probed one by one.
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{self, Locator, PageDriver, WaitState};
use crate::config::TranscriptSettings;
use crate::deadline::Deadline;
use crate::error::{Result, ScrapeError};

/// How the panel ended up open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelRoute {
    /// Already open before any route reported success
    Preexisting,
    Overflow,
    Description,
}

/// An open panel and the segment list container found inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPanel {
    pub route: PanelRoute,
    pub container: Locator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelState {
    Closed,
    DismissingConsent,
    OverflowAttempt(u32),
    DescriptionAttempt,
    Open(PanelRoute),
    Failed,
}

fn log_state(state: PanelState) {
    debug!("transcript panel state: {:?}", state);
}

pub(crate) fn consent_buttons() -> Vec<Locator> {
    vec![
        Locator::text("button", "Reject all"),
        Locator::text("button", "I agree"),
        Locator::text("button", "Accept all"),
        Locator::css("#introAgreeButton"),
    ]
}

pub(crate) fn overflow_triggers() -> Vec<Locator> {
    vec![
        Locator::role("button", "more actions|more"),
        Locator::css("button[aria-label*=\"More actions\"]"),
        Locator::css("tp-yt-paper-icon-button[aria-label*=\"More actions\"]"),
        Locator::css("#menu tp-yt-paper-icon-button[aria-label*=\"More\"]"),
        Locator::css("#actions ytd-menu-renderer tp-yt-paper-icon-button[aria-label*=\"More\"]"),
        Locator::css("#top-level-buttons-computed tp-yt-paper-icon-button[aria-label*=\"More\"]"),
    ]
}

pub(crate) fn menu_popup() -> Locator {
    Locator::css("ytd-menu-popup-renderer")
}

pub(crate) fn transcript_menu_items() -> Vec<Locator> {
    vec![
        Locator::role("menuitem", "transcript").within(menu_popup()),
        Locator::text("tp-yt-paper-item", "Transcript|Show transcript|Open transcript")
            .within(menu_popup()),
    ]
}

pub(crate) fn description_expanders() -> Vec<Locator> {
    vec![
        Locator::text("ytd-text-inline-expander tp-yt-paper-button", "more"),
        Locator::text("tp-yt-paper-button", "more"),
        Locator::text("button", "more"),
    ]
}

pub(crate) fn description_triggers() -> Vec<Locator> {
    vec![
        Locator::text("ytd-transcript-inline-expander tp-yt-paper-button", "transcript"),
        Locator::text("yt-button-shape", "transcript"),
        Locator::text("a", "transcript"),
        Locator::text("tp-yt-paper-button", "transcript"),
        Locator::text("button, a", "transcript"),
    ]
}

/// Segment list containers, most specific layouts last
pub(crate) fn panel_containers() -> Vec<Locator> {
    vec![
        Locator::css("ytd-transcript-segment-list-renderer"),
        Locator::css("ytd-transcript-renderer ytd-transcript-segment-list-renderer"),
        Locator::css("ytd-engagement-panel-section-list-renderer ytd-transcript-segment-list-renderer"),
        Locator::css("ytd-transcript-tabs-renderer ytd-transcript-segment-list-renderer"),
    ]
}

pub struct PanelOpener<'a, P: PageDriver + ?Sized> {
    page: &'a P,
    settings: &'a TranscriptSettings,
}

impl<'a, P: PageDriver + ?Sized> PanelOpener<'a, P> {
    pub fn new(page: &'a P, settings: &'a TranscriptSettings) -> Self {
        Self { page, settings }
    }

    /// Drive the page until the transcript panel is visible or the deadline passes
    pub async fn open(&self, deadline: &Deadline) -> Result<OpenPanel> {
        log_state(PanelState::Closed);

        log_state(PanelState::DismissingConsent);
        self.dismiss_consent().await;
        self.page.pause(self.ms(self.settings.consent_settle_ms)).await;

        let mut via_overflow = false;
        for attempt in 1..=self.settings.overflow_attempts {
            if deadline.is_expired() {
                break;
            }
            log_state(PanelState::OverflowAttempt(attempt));
            if self.try_overflow_menu(deadline).await {
                via_overflow = true;
                break;
            }
            self.escape().await;
            self.page.pause(self.ms(self.settings.escape_pause_ms)).await;
        }

        let containers = panel_containers();
        if let Ok(container) = browser::wait_for_any(
            self.page,
            &containers,
            WaitState::Visible,
            deadline.cap(self.ms(self.settings.panel_probe_ms)),
            self.settings.poll_interval(),
        )
        .await
        {
            let route = if via_overflow {
                PanelRoute::Overflow
            } else {
                PanelRoute::Preexisting
            };
            return Ok(self.opened(route, container.clone()));
        }

        log_state(PanelState::DescriptionAttempt);
        self.try_description().await;

        match browser::wait_for_any(
            self.page,
            &containers,
            WaitState::Visible,
            deadline.remaining(),
            self.settings.poll_interval(),
        )
        .await
        {
            Ok(container) => Ok(self.opened(PanelRoute::Description, container.clone())),
            Err(_) => {
                log_state(PanelState::Failed);
                warn!("Transcript panel did not open (no transcript, or the layout changed)");
                Err(ScrapeError::selector_not_found("transcript panel"))
            }
        }
    }

    fn ms(&self, millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn opened(&self, route: PanelRoute, container: Locator) -> OpenPanel {
        log_state(PanelState::Open(route));
        info!("📖 Transcript panel open ({:?})", route);
        OpenPanel { route, container }
    }

    /// Click every consent button present; dialogs can be stacked
    async fn dismiss_consent(&self) {
        for button in consent_buttons() {
            if browser::try_click(self.page, &button).await {
                info!("🍪 Dismissed consent prompt via {}", button);
            }
        }
    }

    async fn escape(&self) {
        if let Err(e) = self.page.press_key("Escape").await {
            debug!("escape press failed: {}", e);
        }
    }

    /// One pass over the overflow triggers; true once a transcript menu item was clicked
    async fn try_overflow_menu(&self, deadline: &Deadline) -> bool {
        let popup = menu_popup();
        let items = transcript_menu_items();

        for trigger in overflow_triggers() {
            if deadline.is_expired() {
                return false;
            }
            if !browser::try_click(self.page, &trigger).await {
                continue;
            }

            let popup_wait = deadline.cap(self.ms(self.settings.popup_timeout_ms));
            if let Err(e) =
                browser::wait_for_visible(self.page, &popup, popup_wait, self.settings.poll_interval()).await
            {
                debug!("no menu after clicking {}: {}", trigger, e);
                continue;
            }

            for item in &items {
                if browser::try_click(self.page, item).await {
                    debug!("transcript menu item clicked: {}", item);
                    return true;
                }
            }

            // Menu opened without a transcript entry; close it before the next trigger
            self.escape().await;
        }

        false
    }

    async fn try_description(&self) {
        let mut expanded = false;
        for expander in description_expanders() {
            if browser::try_click(self.page, &expander).await {
                expanded = true;
            }
        }
        if expanded {
            self.page.pause(self.ms(self.settings.expand_pause_ms)).await;
        }

        for trigger in description_triggers() {
            if browser::try_click(self.page, &trigger).await {
                debug!("description transcript trigger clicked: {}", trigger);
                return;
            }
        }
        debug!("no transcript trigger in description");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakePage;

    fn fast_settings() -> TranscriptSettings {
        TranscriptSettings {
            consent_settle_ms: 1,
            escape_pause_ms: 1,
            popup_timeout_ms: 20,
            panel_probe_ms: 20,
            expand_pause_ms: 1,
            poll_interval_ms: 5,
            ..TranscriptSettings::default()
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_opens_through_overflow_menu() {
        let page = FakePage::new();
        let trigger = overflow_triggers()[0].clone();
        let item = transcript_menu_items()[0].clone();
        let container = panel_containers()[0].clone();
        page.show(trigger.clone());
        page.on_click_show(trigger.clone(), menu_popup());
        page.on_click_attach(trigger.clone(), item.clone());
        page.on_click_show(item.clone(), container.clone());

        let settings = fast_settings();
        let panel = PanelOpener::new(&page, &settings).open(&deadline()).await.unwrap();

        assert_eq!(panel.route, PanelRoute::Overflow);
        assert_eq!(panel.container, container);
        assert_eq!(page.clicks(), vec![trigger, item]);
        assert!(page.keys().is_empty());
    }

    #[tokio::test]
    async fn test_menu_without_transcript_entry_is_closed_and_retried() {
        let page = FakePage::new();
        let trigger = overflow_triggers()[2].clone();
        let container = panel_containers()[0].clone();
        page.show(trigger.clone());
        page.on_click_show(trigger.clone(), menu_popup());
        let description_trigger = description_triggers()[1].clone();
        page.attach(description_trigger.clone());
        page.on_click_show(description_trigger.clone(), container.clone());

        let settings = fast_settings();
        let panel = PanelOpener::new(&page, &settings).open(&deadline()).await.unwrap();

        assert_eq!(panel.route, PanelRoute::Description);
        // Per attempt: one Escape for the open menu, one between attempts
        assert_eq!(page.keys().len(), 6);
        assert!(page.keys().iter().all(|k| k == "Escape"));
        assert_eq!(page.clicks().last(), Some(&description_trigger));
    }

    #[tokio::test]
    async fn test_description_route_expands_then_clicks_trigger() {
        let page = FakePage::new();
        let expander = description_expanders()[1].clone();
        let trigger = description_triggers()[0].clone();
        let container = panel_containers()[2].clone();
        page.show(expander.clone());
        page.on_click_attach(expander.clone(), trigger.clone());
        page.on_click_show(trigger.clone(), container.clone());

        let settings = fast_settings();
        let panel = PanelOpener::new(&page, &settings).open(&deadline()).await.unwrap();

        assert_eq!(panel.route, PanelRoute::Description);
        assert_eq!(panel.container, container);
        assert_eq!(page.clicks(), vec![expander, trigger]);
        assert_eq!(page.keys().len(), 3);
    }

    #[tokio::test]
    async fn test_already_open_panel_is_preexisting() {
        let page = FakePage::new();
        let container = panel_containers()[1].clone();
        page.show(container.clone());

        let settings = fast_settings();
        let panel = PanelOpener::new(&page, &settings).open(&deadline()).await.unwrap();

        assert_eq!(panel.route, PanelRoute::Preexisting);
        assert_eq!(panel.container, container);
    }

    #[tokio::test]
    async fn test_consent_prompt_dismissed_first() {
        let page = FakePage::new();
        let consent = consent_buttons()[2].clone();
        page.show(consent.clone());
        page.show(panel_containers()[0].clone());

        let settings = fast_settings();
        PanelOpener::new(&page, &settings).open(&deadline()).await.unwrap();

        assert_eq!(page.clicks().first(), Some(&consent));
    }

    #[tokio::test]
    async fn test_stacked_consent_prompts_all_dismissed() {
        let page = FakePage::new();
        let reject = consent_buttons()[0].clone();
        let agree = consent_buttons()[1].clone();
        page.show(reject.clone());
        page.show(agree.clone());
        page.show(panel_containers()[0].clone());

        let settings = fast_settings();
        PanelOpener::new(&page, &settings).open(&deadline()).await.unwrap();

        assert_eq!(page.clicks(), vec![reject, agree]);
    }

    #[tokio::test]
    async fn test_no_route_fails_with_selector_not_found() {
        let page = FakePage::new();
        let settings = fast_settings();

        let err = PanelOpener::new(&page, &settings)
            .open(&Deadline::after(Duration::from_millis(150)))
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::SelectorNotFound { .. }));
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_attached_but_hidden_panel_is_not_open() {
        let page = FakePage::new();
        page.attach(panel_containers()[0].clone());
        let settings = fast_settings();

        let result = PanelOpener::new(&page, &settings)
            .open(&Deadline::after(Duration::from_millis(150)))
            .await;

        assert!(result.is_err());
    }
}
