mod gemini;
mod proxy;

pub use gemini::Gemini;
pub use proxy::ProxyTransport;
