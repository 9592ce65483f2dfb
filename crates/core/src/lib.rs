pub mod config;
pub mod domain;
pub mod errors;
pub mod matching;
pub mod ranking;
pub mod revenue;
pub mod signature;

pub use domain::catalog::CatalogIndex;
pub use domain::intent::{
    CallAnalysis, ExtractedProductIntent, Intent, IntentDraft, IntentId, IntentStage, IntentStamp,
    IntentType, Outcome, RejectionReason, Sentiment,
};
pub use domain::merchant::{MerchantId, MerchantMetadata};
pub use domain::product::{Product, ProductId, ProductVariant};
pub use domain::session::{Session, SessionId, TranscriptTurn};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use matching::CategoryMatch;
pub use ranking::{RankedProduct, MAX_RESULTS};
pub use revenue::{Attribution, OpportunityCost, PriceContext};
pub use signature::{SignatureError, WebhookVerifier};
