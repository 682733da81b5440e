//! Error pages for failed loads and crashed content processes.
//!
//! [`ErrorPageCoordinator`] consumes engine notifications for every view,
//! classifies failures, injects generated pages and routes button presses
//! coming back from the content process.

pub mod classify;
pub mod click;
pub mod config;
pub mod coordinator;
pub mod history;
pub mod host;
pub mod page;
pub mod render;
pub mod signal;

#[cfg(test)]
mod testing;

pub use classify::FailureCategory;
pub use classify::build_error_page;
pub use classify::categorize;
pub use click::ClickOutcome;
pub use config::ErrorPageConfig;
pub use coordinator::CycleId;
pub use coordinator::ErrorPageCoordinator;
pub use coordinator::Phase;
pub use host::CertificateError;
pub use host::ContentOverrides;
pub use host::ErrorDomain;
pub use host::LoadError;
pub use host::LoadFailure;
pub use host::LoadStatus;
pub use host::ViewHost;
pub use page::ButtonCallback;
pub use page::ButtonSpec;
pub use page::ErrorPageSpec;
pub use render::RenderedPage;
pub use render::render_page;
