pub mod bounded;
pub mod catalog;
pub mod composer;
pub mod engine;
pub mod persistence;
pub mod ranker;
pub mod sampler;
pub mod schema;
pub mod store;
pub mod tables;

pub use catalog::{CatalogLookup, MessageCatalog};
pub use composer::{CategoryWeights, compose};
pub use engine::{ContentEngine, EngineSettings, UserStats};
pub use persistence::{
    JsonlAdapter, MemoryAdapter, PersistenceAdapter, RedbAdapter, StoreError, open_adapter,
};
pub use schema::{
    Category, FeedbackKind, FeedbackSnapshot, LengthBucket, Mood, PreferredLength,
    SelectionContext, SelectionMetadata, SelectionRecord, SelectionResult,
};
pub use store::{StoreLimits, UserState};
pub use tables::TimeBucket;
