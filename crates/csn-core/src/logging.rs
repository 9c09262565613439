use crate::Result;

/// Initialize logging/tracing for a binary.
///
/// Diagnostics go to stderr: stdout belongs to the MCP transport. Default
/// level is info for our crates; override with `RUST_LOG`.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,csn_core=info,csn_slack=info,{service_name}=info"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
