use serde::Deserialize;

/// Getty Images access through the payment proxy
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagesConfig {
    /// Wallet address purchases are paid to; purchase history is filtered by it
    #[serde(default = "default_destination_address")]
    pub destination_address: String,
    /// Email attached to purchases
    #[serde(default)]
    pub user_email: Option<String>,
    /// Results per search page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Whether the user accepted the provider's terms of service.
    /// Purchases are refused until this is set.
    #[serde(default)]
    pub tos_confirmation: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            destination_address: default_destination_address(),
            user_email: None,
            page_size: default_page_size(),
            tos_confirmation: false,
        }
    }
}

fn default_destination_address() -> String {
    "0xbb20BafE0ddf663ad08DA6DB5d3bBeF7a28944AA".to_owned()
}

const fn default_page_size() -> u32 {
    10
}
