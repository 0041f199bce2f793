mod client;
mod decoder;

pub use client::HttpTransport;
pub use decoder::BodyDecoder;
