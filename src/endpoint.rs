//! What a routed request does.
//!
//! The site has exactly three behaviors, so routes map to an [`Endpoint`]
//! value rather than to arbitrary handler closures. The router owns the
//! [`Site`] and hands it to the endpoint at request time.

use crate::request::Request;
use crate::response::Response;
use crate::site::Site;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endpoint {
    /// A fixed document from the content directory, e.g. `index.html`.
    Document(&'static str),
    /// The file named by the request path.
    File,
    /// Forward the body as one datagram, then redirect to `/`.
    Forward,
}

impl Endpoint {
    pub(crate) async fn call(self, site: &Site, req: &Request) -> Response {
        match self {
            Self::Document(name) => site.send_document(name).await,
            Self::File => site.handle_get(req).await,
            Self::Forward => site.handle_post(req).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::HeaderMap;

    use super::*;
    use crate::datagram::{DatagramReceiver, DatagramSender};
    use crate::method::Method;
    use crate::status::Status;

    fn request(method: Method, path: &str, body: &'static [u8]) -> Request {
        let mut headers = HeaderMap::new();
        headers.insert("content-length", body.len().into());
        let uri: http::Uri = path.parse().unwrap();
        Request::new(method, &uri, &headers, Bytes::from_static(body))
    }

    #[tokio::test]
    async fn document_ignores_the_request_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        let site = Site::new(dir.path(), DatagramSender::bind("127.0.0.1:9".parse().unwrap()).await.unwrap());

        let res = Endpoint::Document("index.html")
            .call(&site, &request(Method::Get, "/whatever", b""))
            .await;
        assert_eq!(res.status_code(), Status::Ok);
        assert_eq!(res.body(), b"<h1>home</h1>");
    }

    #[tokio::test]
    async fn forward_sends_body_and_redirects() {
        let dir = tempfile::tempdir().unwrap();
        let mut rx = DatagramReceiver::bind("127.0.0.1:0".parse().unwrap(), 64).await.unwrap();
        let site = Site::new(dir.path(), DatagramSender::bind(rx.local_addr().unwrap()).await.unwrap());

        let res = Endpoint::Forward
            .call(&site, &request(Method::Post, "/ignored", b"field=value"))
            .await;
        assert_eq!(res.status_code(), Status::Found);
        assert_eq!(res.header("location"), Some("/"));

        let (payload, _) = rx.recv().await.unwrap();
        assert_eq!(payload, b"field=value");
    }
}
