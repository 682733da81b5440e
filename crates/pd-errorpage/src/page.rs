//! Error page descriptions handed from the classifier to the renderer.

use crate::host::ViewHost;
use core::fmt;
use pd_core::BrowserResult;
use pd_core::RequestHandle;
use pd_core::ViewId;

/// Action run when a button on an error page is pressed.
pub type ButtonCallback = Box<dyn Fn(&mut dyn ViewHost, ViewId) -> BrowserResult<()>>;

pub struct ButtonSpec {
    pub label: String,
    pub css_class: String,
    pub callback: ButtonCallback,
}

impl ButtonSpec {
    pub fn new(
        label: impl Into<String>,
        css_class: impl Into<String>,
        callback: impl Fn(&mut dyn ViewHost, ViewId) -> BrowserResult<()> + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            css_class: css_class.into(),
            callback: Box::new(callback),
        }
    }

    /// Button that reloads the view.
    pub fn reload(label: impl Into<String>) -> Self {
        Self::new(label, "button", |host, view| host.reload(view))
    }
}

impl fmt::Debug for ButtonSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonSpec")
            .field("label", &self.label)
            .field("css_class", &self.css_class)
            .finish_non_exhaustive()
    }
}

/// Everything needed to render one error page.
#[derive(Debug)]
pub struct ErrorPageSpec {
    pub title: String,
    pub error_icon: String,
    pub heading: String,
    /// May contain `{uri}`; expanded during rendering.
    pub content: String,
    pub style: String,
    pub message: Vec<String>,
    pub buttons: Vec<ButtonSpec>,
    pub uri: String,
    pub request: Option<RequestHandle>,
}
