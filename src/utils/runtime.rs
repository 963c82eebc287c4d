use anyhow::Result;

/// The daemon runs everything on one thread. Requests are sequenced through
/// channels, so a single-threaded runtime is enough and keeps state races out
/// by construction.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
