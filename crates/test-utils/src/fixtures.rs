//! Common fixtures for network tests.

use std::net::TcpListener;

/// Base URL of a local port with nothing listening on it.
///
/// The port is bound and released immediately, so connecting to it is
/// refused rather than timing out.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind scratch port");
    let port = listener
        .local_addr()
        .expect("Failed to read scratch port")
        .port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
