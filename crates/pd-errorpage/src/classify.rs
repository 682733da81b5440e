//! Maps engine failures to error-page categories and page descriptions.

use crate::config::ErrorPageConfig;
use crate::host::CertificateError;
use crate::host::ErrorDomain;
use crate::host::LoadError;
use crate::host::LoadFailure;
use crate::page::ButtonSpec;
use crate::page::ErrorPageSpec;
use crate::render::escape_html;
use pd_core::RequestHandle;
use pd_security::describe_certificate_failure;
use url::Url;

/// Expected interruptions that never produce an error page.
const IGNORED_ERRORS: &[(ErrorDomain, i32, &str)] = &[
    (ErrorDomain::Network, 302, "load request cancelled"),
    (
        ErrorDomain::Policy,
        102,
        "frame load interrupted by policy change",
    ),
    (ErrorDomain::Plugin, 204, "plugin will handle load"),
];

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Ignorable,
    Security,
    Crash,
    Generic,
}

impl FailureCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ignorable => "ignorable",
            Self::Security => "security",
            Self::Crash => "crash",
            Self::Generic => "generic",
        }
    }
}

pub fn categorize(failure: &LoadFailure) -> FailureCategory {
    let error = match failure {
        LoadFailure::Crash => return FailureCategory::Crash,
        LoadFailure::Load(error) => error,
    };

    if IGNORED_ERRORS
        .iter()
        .any(|(domain, code, _)| *domain == error.domain && *code == error.code)
    {
        return FailureCategory::Ignorable;
    }

    if error.domain == ErrorDomain::Tls || error.certificate.is_some() {
        return FailureCategory::Security;
    }

    FailureCategory::Generic
}

/// Builds the page for `failure`, or `None` when the failure is ignorable.
pub fn build_error_page(
    failure: LoadFailure,
    uri: &str,
    request: Option<RequestHandle>,
    config: &ErrorPageConfig,
) -> Option<ErrorPageSpec> {
    let category = categorize(&failure);
    match &failure {
        LoadFailure::Load(error) => log::debug!(
            "classified {} error {} for `{uri}` as {}",
            error.domain.as_str(),
            error.code,
            category.as_str()
        ),
        LoadFailure::Crash => log::debug!("classified crash of `{uri}` as {}", category.as_str()),
    }

    let mut page = match (category, failure) {
        (FailureCategory::Ignorable, _) => return None,
        (FailureCategory::Crash, _) => crash_page(),
        (FailureCategory::Security, LoadFailure::Load(error)) => security_page(error, uri, config),
        (_, LoadFailure::Load(error)) => generic_page(&error, config),
        (_, LoadFailure::Crash) => crash_page(),
    };

    page.style = config.style.clone();
    page.uri = uri.to_owned();
    page.request = request;
    Some(page)
}

fn blank_page(title: &str, error_icon: &str, heading: &str, content: &str) -> ErrorPageSpec {
    ErrorPageSpec {
        title: title.to_owned(),
        error_icon: error_icon.to_owned(),
        heading: heading.to_owned(),
        content: content.to_owned(),
        style: String::new(),
        message: Vec::new(),
        buttons: Vec::new(),
        uri: String::new(),
        request: None,
    }
}

fn generic_page(error: &LoadError, config: &ErrorPageConfig) -> ErrorPageSpec {
    let mut page = blank_page(
        "Error loading page",
        "&#9888;",
        "Unable to load page",
        "A problem occurred while loading the URL <code>{uri}</code>",
    );
    page.message.push(escape_html(&error.message));
    if let Some(proxy) = &config.proxy {
        page.message.push(format!(
            "Note: an HTTP proxy is configured (<code>{}</code>); it may be responsible.",
            escape_html(proxy)
        ));
    }
    page.buttons.push(ButtonSpec::reload("Try again"));
    page
}

fn security_page(error: LoadError, uri: &str, config: &ErrorPageConfig) -> ErrorPageSpec {
    let mut page = blank_page(
        "Security error",
        "&#128274;",
        "Your connection may be insecure!",
        "Failed to load the URL <code>{uri}</code>",
    );

    let Some(CertificateError { flags, certificate }) = error.certificate else {
        page.message.push(escape_html(&error.message));
        return page;
    };
    page.message
        .push(escape_html(&describe_certificate_failure(&flags)));

    if !config.security.allow_certificate_overrides {
        return page;
    }

    let host = Url::parse(uri)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned));
    match host {
        Some(host) => page.buttons.push(ButtonSpec::new(
            "Ignore danger",
            "button danger",
            move |view_host, view| {
                view_host.allow_certificate(&host, &certificate)?;
                view_host.reload(view)
            },
        )),
        None => log::debug!("no host in `{uri}`; certificate override not offered"),
    }
    page
}

fn crash_page() -> ErrorPageSpec {
    let mut page = blank_page(
        "Web process crashed",
        "&#9889;",
        "Web process crashed",
        "The process rendering <code>{uri}</code> terminated unexpectedly.",
    );
    page.message
        .push("Reloading the page may fix the problem.".to_owned());
    page.buttons.push(ButtonSpec::reload("Reload page"));
    page
}
