//! HTTP server configuration object and helpers.

use backend::inbound::http::state::HttpState;
use std::net::SocketAddr;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) http_state: Option<HttpState>,
}

impl ServerConfig {
    /// Construct a server configuration bound to `bind_addr`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            http_state: None,
        }
    }

    /// Attach the service-backed handler state.
    ///
    /// Without it the server answers from fixture ports, which is only
    /// useful for smoke tests.
    #[must_use]
    pub fn with_http_state(mut self, state: HttpState) -> Self {
        self.http_state = Some(state);
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
