pub mod value_objects;

pub use value_objects::{
    AssetTag, ChunkPosition, ConfidenceClass, CryptoEntity, ErrorRecord, ErrorType,
    QualityScore, TemporalContext,
};
