pub mod chunks;
pub mod fetcher;
pub mod normalize;
