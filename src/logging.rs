#[derive(Clone, Copy, Debug)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Emits a `tracing` event with an optional JSON context attached as a field.
pub fn log_event(level: LogLevel, message: &str, context: Option<serde_json::Value>) {
    let context = context.map(|c| c.to_string()).unwrap_or_default();
    let level_name = level.as_str();
    match level {
        LogLevel::Debug => tracing::debug!(log_level = level_name, context = %context, "[Reconcile] {}", message),
        LogLevel::Info => tracing::info!(log_level = level_name, context = %context, "[Reconcile] {}", message),
        LogLevel::Warn => tracing::warn!(log_level = level_name, context = %context, "[Reconcile] {}", message),
        LogLevel::Error => tracing::error!(log_level = level_name, context = %context, "[Reconcile] {}", message),
    }
}
