use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceType {
    Facial,
    Package,
    AddOn,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Facial => "Facial",
            ServiceType::Package => "Package",
            ServiceType::AddOn => "AddOn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Facial" => Some(ServiceType::Facial),
            "Package" => Some(ServiceType::Package),
            "AddOn" => Some(ServiceType::AddOn),
            _ => None,
        }
    }
}

/// Catalog entry shown on the booking page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub id: i64,
    pub service_name: String,
    #[serde(default)]
    pub promotion_name: Option<String>,
    pub service_type: ServiceType,
    pub card_title: String,
    pub card_content: String,
    pub card_img_src: String,
    #[serde(default)]
    pub card_overlay_content: Option<String>,
    #[serde(default)]
    pub package_items: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub not_bookable: Option<bool>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
