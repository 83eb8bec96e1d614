//! Process-wide tracing setup shared by every warden binary.

/// Install the JSON subscriber with `RUST_LOG` filtering (default `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops and return `false`.
pub fn init() -> bool {
    tracing::init(tracing::DEFAULT_DIRECTIVE)
}

/// Tracing configuration (filters, layers).
pub mod tracing;

#[cfg(test)]
mod tests {
    #[test]
    fn init_installs_once() {
        super::init();
        assert!(!super::init());
    }
}
