//! Browser process wiring for the error-page layer.
//!
//! [`ErrorPageExtension`] owns the coordinator and the browser end of the
//! renderer channel. Engine notifications are forwarded to the coordinator
//! with a host wrapper that turns click-listener requests into IPC messages;
//! [`ErrorPageExtension::pump_clicks`] feeds button presses coming back from
//! the renderer into the coordinator.

use pd_core::BrowserError;
use pd_core::BrowserResult;
use pd_core::RequestHandle;
use pd_core::ViewId;
use pd_errorpage::ClickOutcome;
use pd_errorpage::ContentOverrides;
use pd_errorpage::ErrorPageConfig;
use pd_errorpage::ErrorPageCoordinator;
use pd_errorpage::LoadStatus;
use pd_errorpage::ViewHost;
use pd_ipc::ChannelConfig;
use pd_ipc::IpcMessage;
use pd_ipc::LocalIpcEndpoint;
use pd_ipc::ProcessRole;
use pd_renderer::ErrorPageClickRelay;
use pd_security::Certificate;
use std::time::Duration;

/// Summary of one [`ErrorPageExtension::pump_clicks`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickPump {
    pub invoked: usize,
    pub dropped: usize,
}

/// Browser-side owner of the error-page coordinator.
pub struct ErrorPageExtension {
    coordinator: ErrorPageCoordinator,
    endpoint: LocalIpcEndpoint,
}

impl ErrorPageExtension {
    pub fn new(config: ErrorPageConfig, endpoint: LocalIpcEndpoint) -> BrowserResult<Self> {
        if endpoint.role() != ProcessRole::Browser {
            return Err(BrowserError::new(
                "browser.extension_role_invalid",
                format!(
                    "error-page extension needs a browser endpoint, got {}",
                    endpoint.role().as_str()
                ),
            ));
        }

        Ok(Self {
            coordinator: ErrorPageCoordinator::new(config)?,
            endpoint,
        })
    }

    pub fn coordinator(&self) -> &ErrorPageCoordinator {
        &self.coordinator
    }

    pub fn attach_view(&mut self, view: ViewId) {
        self.coordinator.attach_view(view);
    }

    pub fn on_view_destroyed(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        let mut host = BridgedHost::new(host, &self.endpoint);
        self.coordinator.on_view_destroyed(&mut host, view);
    }

    pub fn on_load_status(&mut self, host: &mut dyn ViewHost, view: ViewId, status: LoadStatus) {
        let mut host = BridgedHost::new(host, &self.endpoint);
        self.coordinator.on_load_status(&mut host, view, status);
    }

    pub fn on_crashed(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        let mut host = BridgedHost::new(host, &self.endpoint);
        self.coordinator.on_crashed(&mut host, view);
    }

    pub fn on_navigation_request(&mut self, view: ViewId) {
        self.coordinator.on_navigation_request(view);
    }

    pub fn on_go_back_forward(&mut self, host: &mut dyn ViewHost, view: ViewId, delta: isize) {
        let mut host = BridgedHost::new(host, &self.endpoint);
        self.coordinator.on_go_back_forward(&mut host, view, delta);
    }

    /// Routes every click message already queued by the renderer.
    pub fn pump_clicks(&mut self, host: &mut dyn ViewHost) -> BrowserResult<ClickPump> {
        let mut pump = ClickPump::default();
        while let Some(message) = self.endpoint.try_recv()? {
            self.route_message(host, message, &mut pump);
        }
        Ok(pump)
    }

    /// Waits up to `timeout` for one message from the renderer and routes it.
    pub fn pump_clicks_timeout(
        &mut self,
        host: &mut dyn ViewHost,
        timeout: Duration,
    ) -> BrowserResult<ClickPump> {
        let mut pump = ClickPump::default();
        let message = self.endpoint.recv_timeout(timeout)?;
        self.route_message(host, message, &mut pump);
        Ok(pump)
    }

    /// Asks the renderer side of the channel to stop.
    pub fn shutdown(self) -> BrowserResult<()> {
        self.endpoint.send(&IpcMessage::Shutdown)
    }

    fn route_message(&mut self, host: &mut dyn ViewHost, message: IpcMessage, pump: &mut ClickPump) {
        let IpcMessage::ErrorPageClick {
            view_id,
            button_index,
        } = message
        else {
            log::warn!("unexpected message from renderer: {message:?}");
            pump.dropped += 1;
            return;
        };

        let mut host = BridgedHost::new(host, &self.endpoint);
        match self
            .coordinator
            .on_click(&mut host, view_id, button_index as usize)
        {
            ClickOutcome::Invoked => pump.invoked += 1,
            ClickOutcome::UnknownView
            | ClickOutcome::NoRegistrations
            | ClickOutcome::UnknownButton => pump.dropped += 1,
        }
    }
}

/// Creates an extension and a renderer relay joined by an in-process channel.
pub fn local_error_pages(
    config: ErrorPageConfig,
) -> BrowserResult<(ErrorPageExtension, ErrorPageClickRelay)> {
    let (browser, renderer) = pd_ipc::local_channel_pair(
        ChannelConfig::hardened(ProcessRole::Browser)?,
        ChannelConfig::hardened(ProcessRole::Renderer)?,
    )?;
    Ok((
        ErrorPageExtension::new(config, browser)?,
        ErrorPageClickRelay::new(renderer)?,
    ))
}

/// Host wrapper that mirrors click-listener changes to the renderer.
struct BridgedHost<'a> {
    inner: &'a mut dyn ViewHost,
    endpoint: &'a LocalIpcEndpoint,
}

impl<'a> BridgedHost<'a> {
    fn new(inner: &'a mut dyn ViewHost, endpoint: &'a LocalIpcEndpoint) -> Self {
        Self { inner, endpoint }
    }
}

impl ViewHost for BridgedHost<'_> {
    fn is_loading(&self, view: ViewId) -> bool {
        self.inner.is_loading(view)
    }

    fn uri(&self, view: ViewId) -> String {
        self.inner.uri(view)
    }

    fn history_index(&self, view: ViewId) -> usize {
        self.inner.history_index(view)
    }

    fn set_history_frozen(&mut self, view: ViewId, frozen: bool) {
        self.inner.set_history_frozen(view, frozen);
    }

    fn load_content(&mut self, view: ViewId, content: &str, uri: &str) -> BrowserResult<()> {
        self.inner.load_content(view, content, uri)
    }

    fn finish_request(&mut self, request: RequestHandle, content: &str) -> BrowserResult<()> {
        self.inner.finish_request(request, content)
    }

    fn set_content_overrides(&mut self, view: ViewId, overrides: Option<ContentOverrides>) {
        self.inner.set_content_overrides(view, overrides);
    }

    fn reload(&mut self, view: ViewId) -> BrowserResult<()> {
        self.inner.reload(view)
    }

    fn allow_certificate(&mut self, host: &str, certificate: &Certificate) -> BrowserResult<()> {
        self.inner.allow_certificate(host, certificate)
    }

    fn listen_for_clicks(&mut self, view: ViewId) -> BrowserResult<()> {
        self.inner.listen_for_clicks(view)?;
        self.endpoint
            .send(&IpcMessage::ListenErrorPage { view_id: view })
    }

    fn release_clicks(&mut self, view: ViewId) -> BrowserResult<()> {
        self.inner.release_clicks(view)?;
        self.endpoint
            .send(&IpcMessage::ReleaseErrorPage { view_id: view })
    }
}

#[cfg(test)]
mod tests {
    use super::ClickPump;
    use super::ErrorPageExtension;
    use super::local_error_pages;
    use pd_core::BrowserResult;
    use pd_core::RequestHandle;
    use pd_core::ViewId;
    use pd_errorpage::ContentOverrides;
    use pd_errorpage::ErrorDomain;
    use pd_errorpage::ErrorPageConfig;
    use pd_errorpage::LoadError;
    use pd_errorpage::LoadStatus;
    use pd_errorpage::Phase;
    use pd_errorpage::ViewHost;
    use pd_ipc::ChannelConfig;
    use pd_ipc::IpcMessage;
    use pd_ipc::ProcessRole;
    use pd_ipc::local_channel_pair;
    use pd_renderer::RelayControl;
    use pd_security::Certificate;
    use std::time::Duration;

    const VIEW: ViewId = ViewId::new(11);

    #[derive(Default)]
    struct IdleView {
        reloads: usize,
        content: Option<String>,
    }

    impl ViewHost for IdleView {
        fn is_loading(&self, _view: ViewId) -> bool {
            false
        }

        fn uri(&self, _view: ViewId) -> String {
            "http://example.com".to_owned()
        }

        fn history_index(&self, _view: ViewId) -> usize {
            0
        }

        fn set_history_frozen(&mut self, _view: ViewId, _frozen: bool) {}

        fn load_content(&mut self, _view: ViewId, content: &str, _uri: &str) -> BrowserResult<()> {
            self.content = Some(content.to_owned());
            Ok(())
        }

        fn finish_request(&mut self, _request: RequestHandle, _content: &str) -> BrowserResult<()> {
            Ok(())
        }

        fn set_content_overrides(&mut self, _view: ViewId, _overrides: Option<ContentOverrides>) {}

        fn reload(&mut self, _view: ViewId) -> BrowserResult<()> {
            self.reloads += 1;
            Ok(())
        }

        fn allow_certificate(&mut self, _host: &str, _certificate: &Certificate) -> BrowserResult<()> {
            Ok(())
        }

        fn listen_for_clicks(&mut self, _view: ViewId) -> BrowserResult<()> {
            Ok(())
        }

        fn release_clicks(&mut self, _view: ViewId) -> BrowserResult<()> {
            Ok(())
        }
    }

    fn network_failure() -> LoadStatus {
        LoadStatus::Failed {
            uri: "http://example.com".to_owned(),
            error: LoadError::new(ErrorDomain::Network, 2, "Connection refused"),
            request: None,
        }
    }

    #[test]
    fn extension_requires_browser_endpoint() {
        let pair = local_channel_pair(
            ChannelConfig::hardened(ProcessRole::Browser).unwrap_or_else(|_| unreachable!()),
            ChannelConfig::hardened(ProcessRole::Renderer).unwrap_or_else(|_| unreachable!()),
        );
        let (_browser, renderer) = pair.unwrap_or_else(|_| unreachable!());
        let extension = ErrorPageExtension::new(ErrorPageConfig::default(), renderer);
        assert!(extension.is_err());
        if let Err(error) = extension {
            assert_eq!(error.code, "browser.extension_role_invalid");
        }
    }

    #[test]
    fn renderer_click_reaches_reload_callback() {
        let pages = local_error_pages(ErrorPageConfig::default());
        assert!(pages.is_ok());
        let (mut extension, mut relay) = pages.unwrap_or_else(|_| unreachable!());
        let mut view = IdleView::default();

        extension.on_load_status(&mut view, VIEW, network_failure());
        assert!(view.content.is_some());
        assert_eq!(relay.poll(), Ok(RelayControl::Continue));
        assert!(!relay.is_listening(VIEW));

        extension.on_load_status(&mut view, VIEW, LoadStatus::Finished);
        assert_eq!(extension.coordinator().phase(VIEW), Phase::ErrorShown);
        assert_eq!(relay.poll(), Ok(RelayControl::Continue));
        assert!(relay.is_listening(VIEW));

        assert_eq!(relay.button_pressed(VIEW, "0"), Ok(true));
        let pump = extension.pump_clicks_timeout(&mut view, Duration::from_secs(1));
        assert_eq!(
            pump,
            Ok(ClickPump {
                invoked: 1,
                dropped: 0,
            })
        );
        assert_eq!(view.reloads, 1);
    }

    #[test]
    fn clicks_racing_navigation_are_dropped() {
        let (mut extension, mut relay) =
            local_error_pages(ErrorPageConfig::default()).unwrap_or_else(|_| unreachable!());
        let mut view = IdleView::default();
        extension.on_load_status(&mut view, VIEW, network_failure());
        extension.on_load_status(&mut view, VIEW, LoadStatus::Finished);
        assert_eq!(relay.poll(), Ok(RelayControl::Continue));

        assert_eq!(relay.button_pressed(VIEW, "0"), Ok(true));
        extension.on_navigation_request(VIEW);
        extension.on_load_status(&mut view, VIEW, LoadStatus::Provisional);

        assert_eq!(
            extension.pump_clicks(&mut view),
            Ok(ClickPump {
                invoked: 0,
                dropped: 1,
            })
        );
        assert_eq!(view.reloads, 0);

        assert_eq!(relay.poll(), Ok(RelayControl::Continue));
        assert!(!relay.is_listening(VIEW));
        assert_eq!(relay.button_pressed(VIEW, "0"), Ok(false));
    }

    #[test]
    fn crash_page_round_trip() {
        let (mut extension, mut relay) =
            local_error_pages(ErrorPageConfig::default()).unwrap_or_else(|_| unreachable!());
        let mut view = IdleView::default();
        extension.attach_view(VIEW);
        extension.on_crashed(&mut view, VIEW);
        assert!(
            view.content
                .as_deref()
                .is_some_and(|content| content.contains("Reload page"))
        );
        extension.on_load_status(&mut view, VIEW, LoadStatus::Finished);
        assert_eq!(relay.poll(), Ok(RelayControl::Continue));
        assert_eq!(relay.button_pressed(VIEW, "0"), Ok(true));
        assert_eq!(
            extension.pump_clicks(&mut view),
            Ok(ClickPump {
                invoked: 1,
                dropped: 0,
            })
        );
        assert_eq!(view.reloads, 1);
    }

    #[test]
    fn destroyed_view_drops_pending_clicks() {
        let (mut extension, mut relay) =
            local_error_pages(ErrorPageConfig::default()).unwrap_or_else(|_| unreachable!());
        let mut view = IdleView::default();
        extension.on_load_status(&mut view, VIEW, network_failure());
        extension.on_load_status(&mut view, VIEW, LoadStatus::Finished);
        assert_eq!(relay.poll(), Ok(RelayControl::Continue));
        assert_eq!(relay.button_pressed(VIEW, "0"), Ok(true));

        extension.on_view_destroyed(&mut view, VIEW);
        assert_eq!(extension.coordinator().active_subscriptions(VIEW), 0);
        assert_eq!(
            extension.pump_clicks(&mut view),
            Ok(ClickPump {
                invoked: 0,
                dropped: 1,
            })
        );

        assert_eq!(relay.poll(), Ok(RelayControl::Continue));
        assert!(!relay.is_listening(VIEW));
        assert_eq!(relay.button_pressed(VIEW, "0"), Ok(false));
    }

    #[test]
    fn superseded_pending_page_never_reaches_renderer() {
        let (browser, renderer) = local_channel_pair(
            ChannelConfig::hardened(ProcessRole::Browser).unwrap_or_else(|_| unreachable!()),
            ChannelConfig::hardened(ProcessRole::Renderer).unwrap_or_else(|_| unreachable!()),
        )
        .unwrap_or_else(|_| unreachable!());
        let mut extension = ErrorPageExtension::new(ErrorPageConfig::default(), browser)
            .unwrap_or_else(|_| unreachable!());
        let mut view = IdleView::default();

        extension.on_load_status(&mut view, VIEW, network_failure());
        extension.on_load_status(&mut view, VIEW, network_failure());
        assert_eq!(renderer.try_recv(), Ok(None));

        extension.on_load_status(&mut view, VIEW, LoadStatus::Finished);
        assert_eq!(
            renderer.try_recv(),
            Ok(Some(IpcMessage::ListenErrorPage { view_id: VIEW }))
        );
        assert_eq!(renderer.try_recv(), Ok(None));
    }

    #[test]
    fn shutdown_stops_relay() {
        let (extension, mut relay) =
            local_error_pages(ErrorPageConfig::default()).unwrap_or_else(|_| unreachable!());
        assert!(extension.shutdown().is_ok());
        assert_eq!(relay.poll(), Ok(RelayControl::Stop));
    }
}
