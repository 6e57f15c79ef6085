//! HTTP data models shared by the worker and the page controller.
//!
//! This module contains the request and response types that flow through
//! the fetch interception path:
//!
//! - `Request`, `RequestKey`: an outgoing request and its cache identity
//! - `Response`, `ResponseType`: a captured response, cloneable and persistable
//! - `Headers`: an ordered, case-insensitive header list

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::{Request, RequestKey};
pub use response::{Response, ResponseType};
