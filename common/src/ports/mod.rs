pub mod crypto;
pub mod hash;
pub mod nlp;
pub mod source_adapter;

pub use crypto::{CredentialCipher, KeyProvider};
pub use hash::Hash;
pub use nlp::{EntityExtractor, QualityAnalyzer, TemporalExtractor};
pub use source_adapter::{
    AdapterRegistry, CollectedItem, ConfigValidation, SourceAdapter,
};
