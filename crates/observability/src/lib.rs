//! Tracing/logging setup shared by every erpdesk binary.

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::LogFormat;

/// Initialize process-wide tracing in the given output format.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_ignored() {
        init(LogFormat::Compact);
        init(LogFormat::Json);
    }
}
