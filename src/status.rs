//! HTTP status codes the relay answers with.
//!
//! ```rust
//! use formrelay::{Response, Status};
//!
//! // status-only, no body
//! Response::status(Status::NotFound);
//!
//! // redirect after a form post
//! Response::redirect("/");
//! ```

use http::StatusCode;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                  // 200
    Found,               // 302
    BadRequest,          // 400
    NotFound,            // 404
    InternalServerError, // 500
    NotImplemented,      // 501
}

impl From<Status> for StatusCode {
    fn from(s: Status) -> StatusCode {
        match s {
            Status::Ok                  => StatusCode::OK,
            Status::Found               => StatusCode::FOUND,
            Status::BadRequest          => StatusCode::BAD_REQUEST,
            Status::NotFound            => StatusCode::NOT_FOUND,
            Status::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Status::NotImplemented      => StatusCode::NOT_IMPLEMENTED,
        }
    }
}
