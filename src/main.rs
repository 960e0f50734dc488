/// Entry point for the Creo API server.
///
/// Serves the versioned monitoring API, including live container event streams, on the
/// address given by `CREO_LISTEN_ADDR`.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., an unreadable machine id or a listen
/// address that cannot be bound).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug CREO_LISTEN_ADDR=127.0.0.1:3000 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    creo_api::run().await
}
