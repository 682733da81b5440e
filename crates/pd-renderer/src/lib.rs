//! Renderer process side of error-page buttons.
//!
//! Generated error pages carry `data-index` attributes on their buttons. The
//! renderer only forwards presses for pages the browser explicitly asked it to
//! listen on, so a press on a page that is already being replaced never
//! reaches the browser process.

use pd_core::BrowserError;
use pd_core::BrowserResult;
use pd_core::ViewId;
use pd_ipc::IpcMessage;
use pd_ipc::LocalIpcEndpoint;
use pd_ipc::ProcessRole;
use std::collections::BTreeSet;

/// Whether the relay should keep running after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayControl {
    Continue,
    Stop,
}

/// Forwards error-page button presses to the browser process.
pub struct ErrorPageClickRelay {
    endpoint: LocalIpcEndpoint,
    listening: BTreeSet<ViewId>,
}

impl ErrorPageClickRelay {
    pub fn new(endpoint: LocalIpcEndpoint) -> BrowserResult<Self> {
        if endpoint.role() != ProcessRole::Renderer {
            return Err(BrowserError::new(
                "renderer.relay_role_invalid",
                format!(
                    "click relay needs a renderer endpoint, got {}",
                    endpoint.role().as_str()
                ),
            ));
        }

        Ok(Self {
            endpoint,
            listening: BTreeSet::new(),
        })
    }

    pub fn is_listening(&self, view: ViewId) -> bool {
        self.listening.contains(&view)
    }

    pub fn handle_message(&mut self, message: IpcMessage) -> RelayControl {
        match message {
            IpcMessage::ListenErrorPage { view_id } => {
                self.listening.insert(view_id);
            }
            IpcMessage::ReleaseErrorPage { view_id } => {
                self.listening.remove(&view_id);
            }
            IpcMessage::Shutdown => return RelayControl::Stop,
            IpcMessage::ErrorPageClick { view_id, .. } => {
                log::warn!("renderer received a click message for {view_id}; ignoring");
            }
        }
        RelayControl::Continue
    }

    /// Applies every message queued by the browser process.
    pub fn poll(&mut self) -> BrowserResult<RelayControl> {
        while let Some(message) = self.endpoint.try_recv()? {
            if self.handle_message(message) == RelayControl::Stop {
                return Ok(RelayControl::Stop);
            }
        }
        Ok(RelayControl::Continue)
    }

    /// Reports a press on the button carrying `data_index`.
    ///
    /// Returns `false` when the press was dropped.
    pub fn button_pressed(&self, view: ViewId, data_index: &str) -> BrowserResult<bool> {
        if !self.is_listening(view) {
            log::trace!("ignoring button press on {view}: not an active error page");
            return Ok(false);
        }

        let button_index = data_index.trim().parse::<u32>().map_err(|error| {
            BrowserError::new(
                "renderer.button_index_invalid",
                format!("invalid error page button index `{data_index}`: {error}"),
            )
        })?;

        self.endpoint.send(&IpcMessage::ErrorPageClick {
            view_id: view,
            button_index,
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorPageClickRelay;
    use super::RelayControl;
    use pd_core::ViewId;
    use pd_ipc::ChannelConfig;
    use pd_ipc::IpcMessage;
    use pd_ipc::LocalIpcEndpoint;
    use pd_ipc::ProcessRole;
    use pd_ipc::local_channel_pair;
    use std::time::Duration;

    fn endpoints() -> (LocalIpcEndpoint, LocalIpcEndpoint) {
        let browser = ChannelConfig::hardened(ProcessRole::Browser);
        let renderer = ChannelConfig::hardened(ProcessRole::Renderer);
        local_channel_pair(
            browser.unwrap_or_else(|_| unreachable!()),
            renderer.unwrap_or_else(|_| unreachable!()),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn rejects_browser_endpoint() {
        let (browser, _renderer) = endpoints();
        let relay = ErrorPageClickRelay::new(browser);
        assert!(relay.is_err());
        if let Err(error) = relay {
            assert_eq!(error.code, "renderer.relay_role_invalid");
        }
    }

    #[test]
    fn forwards_presses_only_while_listening() {
        let (browser, renderer) = endpoints();
        let relay = ErrorPageClickRelay::new(renderer);
        assert!(relay.is_ok());
        let mut relay = relay.unwrap_or_else(|_| unreachable!());
        let view = ViewId::new(5);

        assert_eq!(relay.button_pressed(view, "0"), Ok(false));

        assert!(browser.send(&IpcMessage::ListenErrorPage { view_id: view }).is_ok());
        assert_eq!(relay.poll(), Ok(RelayControl::Continue));
        assert!(relay.is_listening(view));
        assert_eq!(relay.button_pressed(view, " 1 "), Ok(true));
        assert_eq!(
            browser.recv_timeout(Duration::from_secs(1)),
            Ok(IpcMessage::ErrorPageClick {
                view_id: view,
                button_index: 1,
            })
        );

        assert!(browser.send(&IpcMessage::ReleaseErrorPage { view_id: view }).is_ok());
        assert_eq!(relay.poll(), Ok(RelayControl::Continue));
        assert_eq!(relay.button_pressed(view, "1"), Ok(false));
    }

    #[test]
    fn malformed_index_is_an_error() {
        let (_browser, renderer) = endpoints();
        let mut relay = ErrorPageClickRelay::new(renderer).unwrap_or_else(|_| unreachable!());
        let view = ViewId::new(5);
        relay.handle_message(IpcMessage::ListenErrorPage { view_id: view });

        let pressed = relay.button_pressed(view, "first");
        assert!(pressed.is_err());
        if let Err(error) = pressed {
            assert_eq!(error.code, "renderer.button_index_invalid");
        }
    }

    #[test]
    fn shutdown_stops_polling() {
        let (browser, renderer) = endpoints();
        let mut relay = ErrorPageClickRelay::new(renderer).unwrap_or_else(|_| unreachable!());
        assert!(browser.send(&IpcMessage::Shutdown).is_ok());
        assert_eq!(relay.poll(), Ok(RelayControl::Stop));
    }
}
