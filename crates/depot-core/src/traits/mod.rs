pub mod fetcher;
pub mod resolver;

pub use fetcher::{FetchOptions, Fetcher, FetcherKind, Fetchers, RawContent};
pub use resolver::{PreferredVersions, ResolveOptions, Resolver};
