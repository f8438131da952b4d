/// Application-level constants
pub const APP_NAME: &str = "Labvault";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when RUST_LOG is unset.
/// Debug builds trace the parser stages; release builds keep to warnings.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "labvault_lib=debug,labvault=debug,warn"
    } else {
        "labvault_lib=info,warn"
    }
}
