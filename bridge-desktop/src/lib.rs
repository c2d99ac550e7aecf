//! Desktop and server implementations of the host bridge.
//!
//! Native hosts get a pooled [`ReqwestHttpClient`]; browser and mobile hosts
//! bring their own `HttpClient` instead. `core-runtime` installs this client
//! automatically when its `desktop-shims` feature is on.

mod http;

pub use http::ReqwestHttpClient;
