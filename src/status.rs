//! HTTP status codes as a typed enum.
//!
//! Only the codes the blog actually answers with. Use [`Status`] anywhere a
//! status code is accepted: `Response::status()`, `Response::builder().status()`,
//! or as a bare handler return value.
//!
//! ```rust
//! use quill::{Response, Status};
//!
//! Response::status(Status::NoContent);
//!
//! Response::builder()
//!     .status(Status::NotFound)
//!     .html("<h1>No such post</h1>");
//! ```

/// Status codes used by the application.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                    // 200
    NoContent,             // 204
    SeeOther,              // 303
    BadRequest,            // 400
    Unauthorized,          // 401
    NotFound,              // 404
    MethodNotAllowed,      // 405
    PayloadTooLarge,       // 413
    UnprocessableContent,  // 422
    InternalServerError,   // 500
    ServiceUnavailable,    // 503
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok                   => 200,
            Self::NoContent            => 204,
            Self::SeeOther             => 303,
            Self::BadRequest           => 400,
            Self::Unauthorized         => 401,
            Self::NotFound             => 404,
            Self::MethodNotAllowed     => 405,
            Self::PayloadTooLarge      => 413,
            Self::UnprocessableContent => 422,
            Self::InternalServerError  => 500,
            Self::ServiceUnavailable   => 503,
        }
    }
}

impl From<Status> for u16 {
    fn from(status: Status) -> u16 {
        status.code()
    }
}
