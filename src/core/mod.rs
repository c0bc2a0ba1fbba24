//! Core Components
//!
//! HTTP transport shared by the auth flow and the resource clients.

pub mod transport;

pub use transport::{
    form_urlencode, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
};
