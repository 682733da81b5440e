//! Scripted [`ViewHost`] used by the unit tests.

use crate::host::ContentOverrides;
use crate::host::ViewHost;
use pd_core::BrowserError;
use pd_core::BrowserResult;
use pd_core::RequestHandle;
use pd_core::ViewId;
use pd_security::Certificate;
use pd_security::CertificateOverrides;

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Single-view engine double that records every call.
#[derive(Debug, Default)]
pub(crate) struct RecordingHost {
    pub loading: bool,
    pub uri: String,
    pub index: usize,
    pub freeze_calls: Vec<bool>,
    pub injected: Vec<(ViewId, String, String)>,
    pub finished_requests: Vec<(RequestHandle, String)>,
    pub overrides: Option<ContentOverrides>,
    pub override_calls: Vec<Option<ContentOverrides>>,
    pub trusted: CertificateOverrides,
    pub listening: Vec<ViewId>,
    pub released: Vec<ViewId>,
    /// Ordered log of user-visible side effects.
    pub actions: Vec<String>,
    pub fail_injection: bool,
}

impl RecordingHost {
    pub fn loading_at(uri: &str) -> Self {
        Self {
            loading: true,
            uri: uri.to_owned(),
            ..Self::default()
        }
    }

    pub fn last_injected(&self) -> Option<&str> {
        self.injected
            .last()
            .map(|(_, content, _)| content.as_str())
    }
}

impl ViewHost for RecordingHost {
    fn is_loading(&self, _view: ViewId) -> bool {
        self.loading
    }

    fn uri(&self, _view: ViewId) -> String {
        self.uri.clone()
    }

    fn history_index(&self, _view: ViewId) -> usize {
        self.index
    }

    fn set_history_frozen(&mut self, _view: ViewId, frozen: bool) {
        self.freeze_calls.push(frozen);
    }

    fn load_content(&mut self, view: ViewId, content: &str, uri: &str) -> BrowserResult<()> {
        if self.fail_injection {
            return Err(BrowserError::new("test.inject_failed", "view refused content"));
        }
        self.injected
            .push((view, content.to_owned(), uri.to_owned()));
        Ok(())
    }

    fn finish_request(&mut self, request: RequestHandle, content: &str) -> BrowserResult<()> {
        self.finished_requests.push((request, content.to_owned()));
        Ok(())
    }

    fn set_content_overrides(&mut self, _view: ViewId, overrides: Option<ContentOverrides>) {
        self.overrides = overrides;
        self.override_calls.push(overrides);
    }

    fn reload(&mut self, view: ViewId) -> BrowserResult<()> {
        self.actions.push(format!("reload {view}"));
        Ok(())
    }

    fn allow_certificate(&mut self, host: &str, certificate: &Certificate) -> BrowserResult<()> {
        self.trusted.allow(host, certificate)?;
        self.actions.push(format!("allow {host}"));
        Ok(())
    }

    fn listen_for_clicks(&mut self, view: ViewId) -> BrowserResult<()> {
        self.listening.push(view);
        Ok(())
    }

    fn release_clicks(&mut self, view: ViewId) -> BrowserResult<()> {
        self.released.push(view);
        Ok(())
    }
}
