//! Plain HTTP responder for quick reachability checks
//!
//! Answers every request on its port with a fixed text body. Holds no state
//! and speaks no session protocol.

use log::info;
use std::future::Future;
use std::net::SocketAddr;
use std::convert::Infallible;
use warp::{Filter, Reply};

pub const STATUS_BODY: &str = "Welcome to the AR multiplayer relay";

/// Every path and method gets the same `text/plain` body
pub fn routes() -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    warp::any().map(|| STATUS_BODY)
}

/// Binds the status page and returns the bound address and the server future
///
/// The future runs until dropped; spawn it next to the relay.
pub fn serve(
    addr: SocketAddr,
) -> Result<(SocketAddr, impl Future<Output = ()> + Send + 'static), warp::Error> {
    let (bound, server) = warp::serve(routes()).try_bind_ephemeral(addr)?;
    info!("Status page at http://{}/", bound);
    Ok((bound, server))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_any_path_and_method_gets_the_body() {
        let filter = routes();

        for (method, path) in [("GET", "/"), ("GET", "/anything"), ("POST", "/a/b?c=d")] {
            let response = warp::test::request()
                .method(method)
                .path(path)
                .reply(&filter)
                .await;

            assert_eq!(response.status(), 200);
            assert_eq!(&response.body()[..], STATUS_BODY.as_bytes());
            let content_type = response.headers()["content-type"].to_str().unwrap();
            assert!(content_type.starts_with("text/plain"));
        }
    }

    #[tokio::test]
    async fn test_serves_any_request() {
        let (addr, server) = serve(([127, 0, 0, 1], 0).into()).unwrap();
        tokio::spawn(server);

        let mut stream = TcpStream::connect(addr).await.unwrap();
        // Larger than any single read buffer a naive responder would use.
        let padding = "a".repeat(8 * 1024);
        let request = format!(
            "GET /anything HTTP/1.1\r\nHost: localhost\r\nX-Padding: {}\r\nConnection: close\r\n\r\n",
            padding
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.to_ascii_lowercase().contains("content-type: text/plain"));
        assert!(response.ends_with(STATUS_BODY));
    }
}
