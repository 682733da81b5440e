//! Contract between the error-page layer and the embedding browser engine.

use pd_core::BrowserResult;
use pd_core::RequestHandle;
use pd_core::ViewId;
use pd_security::Certificate;

/// Engine error domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    Network,
    Policy,
    Plugin,
    Download,
    Tls,
}

impl ErrorDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Policy => "policy",
            Self::Plugin => "plugin",
            Self::Download => "download",
            Self::Tls => "tls",
        }
    }
}

/// Certificate details attached to a TLS failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateError {
    /// Engine failure flags in the order the engine reported them.
    pub flags: Vec<String>,
    pub certificate: Certificate,
}

/// Error reported by the engine alongside a failed load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub domain: ErrorDomain,
    pub code: i32,
    pub message: String,
    pub certificate: Option<CertificateError>,
}

impl LoadError {
    pub fn new(domain: ErrorDomain, code: i32, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            message: message.into(),
            certificate: None,
        }
    }

    pub fn with_certificate(mut self, flags: Vec<String>, certificate: Certificate) -> Self {
        self.certificate = Some(CertificateError { flags, certificate });
        self
    }
}

/// Anything the classifier can turn into an error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    Load(LoadError),
    /// The content-rendering process terminated unexpectedly.
    Crash,
}

/// Load-status notifications emitted by the engine for one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Provisional,
    Committed,
    Finished,
    Failed {
        uri: String,
        error: LoadError,
        /// Present when the failure belongs to a response still waiting for a body.
        request: Option<RequestHandle>,
    },
}

/// Per-view property overrides applied while an error page is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentOverrides {
    pub execute_page_scripts: bool,
    pub apply_page_styles: bool,
    pub run_user_scripts: bool,
}

impl ContentOverrides {
    pub const ERROR_PAGE: Self = Self {
        execute_page_scripts: false,
        apply_page_styles: false,
        run_user_scripts: false,
    };
}

/// Operations the coordinator needs from the embedding browser.
///
/// All calls happen on the control thread.
pub trait ViewHost {
    fn is_loading(&self, view: ViewId) -> bool;

    /// URI currently associated with the view.
    fn uri(&self, view: ViewId) -> String;

    /// Position of the current entry in the view's back/forward list.
    fn history_index(&self, view: ViewId) -> usize;

    /// Suppress (or resume) recording content navigations in history.
    fn set_history_frozen(&mut self, view: ViewId, frozen: bool);

    /// Load generated content as the current document for `uri`.
    fn load_content(&mut self, view: ViewId, content: &str, uri: &str) -> BrowserResult<()>;

    /// Answer a pending response with generated content.
    fn finish_request(&mut self, request: RequestHandle, content: &str) -> BrowserResult<()>;

    /// `Some` installs the overrides, `None` removes them.
    fn set_content_overrides(&mut self, view: ViewId, overrides: Option<ContentOverrides>);

    fn reload(&mut self, view: ViewId) -> BrowserResult<()>;

    /// Permanently trust `certificate` for `host` for the rest of the process lifetime.
    fn allow_certificate(&mut self, host: &str, certificate: &Certificate) -> BrowserResult<()>;

    /// Ask the content process to start forwarding button presses for the view.
    fn listen_for_clicks(&mut self, view: ViewId) -> BrowserResult<()>;

    /// Tell the content process the error page is gone.
    fn release_clicks(&mut self, view: ViewId) -> BrowserResult<()>;
}
