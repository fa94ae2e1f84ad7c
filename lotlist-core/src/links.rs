//! Product link and thumbnail URL derivation

use serde::{Deserialize, Serialize};

pub const DEFAULT_PRODUCT_BASE_URL: &str = "https://www.bestbuy.ca/en-ca/product/";
pub const DEFAULT_IMAGE_BASE_URL: &str =
    "https://multimedia.bbycastatic.ca/multimedia/products/500x500/";

/// Base URLs used to build per-SKU links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuLinks {
    pub product_base_url: String,
    pub image_base_url: String,
}

impl Default for SkuLinks {
    fn default() -> Self {
        SkuLinks {
            product_base_url: DEFAULT_PRODUCT_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
        }
    }
}

impl SkuLinks {
    /// Product page: base + SKU
    pub fn product_link(&self, sku: i64) -> String {
        format!("{}{}", self.product_base_url, sku)
    }

    /// Thumbnail: base + `{sku[..3]}/{sku[..5]}/{sku}.jpg`
    ///
    /// Short SKUs use the whole string for any prefix longer than it.
    pub fn image_url(&self, sku: i64) -> String {
        let sku = sku.to_string();
        format!(
            "{}{}/{}/{}.jpg",
            self.image_base_url,
            prefix(&sku, 3),
            prefix(&sku, 5),
            sku
        )
    }
}

/// First `n` characters of `s`, or all of `s` when shorter
fn prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_link() {
        let links = SkuLinks::default();
        assert_eq!(
            links.product_link(100001),
            "https://www.bestbuy.ca/en-ca/product/100001"
        );
    }

    #[test]
    fn test_image_url_slices_sku() {
        let links = SkuLinks::default();
        assert_eq!(
            links.image_url(16053319),
            "https://multimedia.bbycastatic.ca/multimedia/products/500x500/160/16053/16053319.jpg"
        );
    }

    #[test]
    fn test_image_url_clamps_short_sku() {
        let links = SkuLinks::default();
        assert_eq!(
            links.image_url(42),
            "https://multimedia.bbycastatic.ca/multimedia/products/500x500/42/42/42.jpg"
        );
        assert!(links.image_url(1234).ends_with("/123/1234/1234.jpg"));
    }

    #[test]
    fn test_custom_bases() {
        let links = SkuLinks {
            product_base_url: "https://shop.example/p/".to_string(),
            image_base_url: "https://img.example/".to_string(),
        };
        assert_eq!(links.product_link(7), "https://shop.example/p/7");
        assert_eq!(links.image_url(123456), "https://img.example/123/12345/123456.jpg");
    }

    #[test]
    fn test_prefix() {
        assert_eq!(prefix("12345", 3), "123");
        assert_eq!(prefix("12", 3), "12");
        assert_eq!(prefix("", 5), "");
        assert_eq!(prefix("123", 3), "123");
    }
}
