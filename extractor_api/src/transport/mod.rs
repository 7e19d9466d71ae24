mod api;
mod http;
mod stub;

pub use api::{FetchMethod, FetchRequest, FetchResponse, Transport};
pub use http::HttpTransport;
pub use stub::StubTransport;
