//! Display-only business contact details served to the page

use crate::{
    config::{non_empty, SiteConfig},
    contact::{normalize_phone, phone::digits_only},
};
use reqwest::Url;
use serde::Serialize;

pub const DEFAULT_SERVICE_AREA: &str = "Rio de Janeiro - RJ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneContact {
    pub display: String,
    pub whatsapp_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstagramContact {
    pub handle: String,
    pub url: Option<String>,
}

/// Absent fields are `None` so the page can hide the matching element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteProfile {
    pub business_name: String,
    pub phone: Option<PhoneContact>,
    pub instagram: Option<InstagramContact>,
    pub service_area: String,
    pub map_embed_url: Option<String>,
}

impl SiteProfile {
    pub fn from_config(config: &SiteConfig) -> Self {
        let whatsapp_url = non_empty(&config.whatsapp_number)
            .and_then(|number| whatsapp_link(number, &config.whatsapp_greeting));

        let phone = match (non_empty(&config.phone_display), whatsapp_url) {
            (Some(display), url) => Some(PhoneContact {
                display: display.to_string(),
                whatsapp_url: url,
            }),
            (None, Some(url)) => Some(PhoneContact {
                display: non_empty(&config.whatsapp_number).unwrap_or_default().to_string(),
                whatsapp_url: Some(url),
            }),
            (None, None) => None,
        };

        let instagram = non_empty(&config.instagram_handle).map(|handle| InstagramContact {
            handle: if handle.starts_with('@') {
                handle.to_string()
            } else {
                format!("@{}", handle)
            },
            url: non_empty(&config.instagram_url).map(str::to_string),
        });

        Self {
            business_name: config.business_name.clone(),
            phone,
            instagram,
            service_area: non_empty(&config.service_area)
                .unwrap_or(DEFAULT_SERVICE_AREA)
                .to_string(),
            map_embed_url: non_empty(&config.map_embed_url).map(str::to_string),
        }
    }
}

pub fn whatsapp_link(number: &str, greeting: &str) -> Option<String> {
    if digits_only(number).is_empty() {
        return None;
    }

    let digits = normalize_phone(number);
    let base = format!("https://wa.me/{}", digits);

    let url = if greeting.trim().is_empty() {
        Url::parse(&base)
    } else {
        Url::parse_with_params(&base, &[("text", greeting.trim())])
    };

    match url {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "invalid WhatsApp link");
            None
        }
    }
}
