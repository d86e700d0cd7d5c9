//! The relay's HTTP front end.
//!
//! | Method | Path       | Behavior                                  |
//! |--------|------------|-------------------------------------------|
//! | GET    | `/`        | `index.html`                              |
//! | GET    | `/message` | `message.html`                            |
//! | GET    | other      | the file at `base_dir` + path, or 404     |
//! | POST   | any        | forward the body as a datagram, 302 → `/` |
//!
//! Missing files are answered with `error.html` and a 404.

use std::io;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::{debug, error, warn};

use crate::datagram::DatagramSender;
use crate::endpoint::Endpoint;
use crate::method::Method;
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::router::Router;
use crate::status::Status;

pub const INDEX_DOCUMENT: &str = "index.html";
pub const MESSAGE_DOCUMENT: &str = "message.html";
pub const NOT_FOUND_DOCUMENT: &str = "error.html";

/// Serves the static site and forwards form posts.
pub struct Site {
    base_dir: PathBuf,
    channel: DatagramSender,
}

impl Site {
    pub fn new(base_dir: impl Into<PathBuf>, channel: DatagramSender) -> Self {
        Self { base_dir: base_dir.into(), channel }
    }

    /// Wires the site into a [`Router`].
    pub fn into_router(self) -> Router {
        Router::new(self)
            .on(Method::Get, "/", Endpoint::Document(INDEX_DOCUMENT))
            .on(Method::Get, "/message", Endpoint::Document(MESSAGE_DOCUMENT))
            .fallback(Method::Get, Endpoint::File)
            .fallback(Method::Post, Endpoint::Forward)
    }

    /// Serves the file the request path names.
    pub async fn handle_get(&self, req: &Request) -> Response {
        match self.resolve(req.path()) {
            Some(path) => self.send_file(&path, Status::Ok).await,
            None => {
                debug!(path = req.path(), "rejected path outside the content directory");
                self.not_found().await
            }
        }
    }

    /// Forwards the body verbatim and redirects home. The redirect is sent
    /// whether or not the datagram reaches anyone.
    pub async fn handle_post(&self, req: &Request) -> Response {
        if let Err(e) = self.channel.send(req.body()).await {
            warn!(target_addr = %self.channel.target(), bytes = req.body().len(), "failed to forward form data: {e}");
        }
        Response::redirect("/")
    }

    pub(crate) async fn send_document(&self, name: &str) -> Response {
        self.send_file(&self.base_dir.join(name), Status::Ok).await
    }

    async fn send_file(&self, path: &Path, status: Status) -> Response {
        if !is_file(path).await {
            return self.not_found().await;
        }
        file_response(path, status, tokio::fs::read(path).await)
    }

    async fn not_found(&self) -> Response {
        let path = self.base_dir.join(NOT_FOUND_DOCUMENT);
        match tokio::fs::read(&path).await {
            Ok(body) => Response::builder()
                .status(Status::NotFound)
                .bytes(ContentType::Html, body),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    error!(path = %path.display(), "failed to read not-found document: {e}");
                }
                Response::builder().status(Status::NotFound).text("404 Not Found")
            }
        }
    }

    /// Maps a request path onto the content directory.
    ///
    /// The path is percent-decoded and its leading `/` stripped. Paths that
    /// would climb out of the directory (`..`, a second root, a drive prefix)
    /// resolve to nothing.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
        let relative = Path::new(decoded.strip_prefix('/').unwrap_or(&*decoded));

        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained || relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.base_dir.join(relative))
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

/// Turns the outcome of reading a file that passed the existence check into a
/// response. A read that fails anyway (the file vanished or became
/// unreadable in between) is a 500 with no body.
fn file_response(path: &Path, status: Status, read: io::Result<Vec<u8>>) -> Response {
    match read {
        Ok(body) => Response::builder()
            .status(status)
            .bytes(ContentType::from_path(path), body),
        Err(e) => {
            error!(path = %path.display(), "failed to read file: {e}");
            Response::status(Status::InternalServerError)
        }
    }
}
