//! Side channel for the pipeline's own problems
//!
//! Nothing here re-enters the pipeline: a failing transport reporting through
//! itself would loop. Reports go to stderr and to `tracing` under the
//! `log_pipeline::internal` target.

pub(crate) fn report_error(component: &str, message: impl AsRef<str>) {
    let message = message.as_ref();
    tracing::error!(target: "log_pipeline::internal", component, "{}", message);
    eprintln!("[LOGGER ERROR] {}: {}", component, message);
}

pub(crate) fn report_warning(component: &str, message: impl AsRef<str>) {
    let message = message.as_ref();
    tracing::warn!(target: "log_pipeline::internal", component, "{}", message);
    eprintln!("[LOGGER WARNING] {}: {}", component, message);
}
