use serde::{Deserialize, Serialize};

use crate::domain::product::DEFAULT_CURRENCY;

pub const DEFAULT_LOCALE: &str = "en";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MerchantId(pub String);

impl MerchantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Merchant context embedded in language-model prompts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantMetadata {
    pub merchant_id: MerchantId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl MerchantMetadata {
    pub fn new(merchant_id: MerchantId) -> Self {
        Self {
            merchant_id,
            name: String::new(),
            industry: String::new(),
            currency: default_currency(),
            locale: default_locale(),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}
