mod fetcher;

pub use fetcher::{AssetFetcher, AssetKind};
