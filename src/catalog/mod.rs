//! Read-only spare-part catalog and promo codes, seeded at startup

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub price: i64,
    pub stock: u32,
    pub image_url: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Promo {
    pub code: String,
    pub title: String,
    pub description: String,
    pub discount_percent: u8,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

pub struct Catalog {
    products: Vec<Product>,
    promos: Vec<Promo>,
}

impl Catalog {
    pub fn new(products: Vec<Product>, promos: Vec<Promo>) -> Self {
        Self { products, promos }
    }

    /// Default stock list; promo validity is relative to `now`
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let product = |id, name: &str, category: &str, price, stock, description: &str| Product {
            id,
            name: name.to_string(),
            category: category.to_string(),
            price,
            stock,
            image_url: None,
            description: description.to_string(),
        };

        let products = vec![
            product(1, "Oli Mesin 10W-40 1L", "oil", 65_000, 40, "Semi-synthetic engine oil for motorcycles"),
            product(2, "Oli Mesin 5W-30 4L", "oil", 420_000, 15, "Fully synthetic engine oil for cars"),
            product(3, "Kampas Rem Depan", "brakes", 85_000, 25, "Front brake pads, universal scooter fit"),
            product(4, "Aki Kering 12V 5Ah", "battery", 275_000, 10, "Maintenance-free motorcycle battery"),
            product(5, "Busi Iridium", "ignition", 95_000, 60, "Iridium spark plug"),
            product(6, "Ban Tubeless 80/90-14", "tires", 310_000, 12, "Tubeless rear tire for scooters"),
            product(7, "Filter Udara", "filters", 55_000, 30, "Replacement air filter element"),
            product(8, "V-Belt CVT", "transmission", 140_000, 18, "Drive belt for automatic scooters"),
        ];

        let promo = |code: &str, title: &str, description: &str, discount_percent, days| Promo {
            code: code.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            discount_percent,
            valid_until: now + Duration::days(days),
        };

        let promos = vec![
            promo("SERVISHEMAT", "Servis Hemat", "10% off routine service estimates", 10, 30),
            promo("DEREKMURAH", "Derek Murah", "15% off towing within the city", 15, 14),
            promo("GANTIOLI", "Ganti Oli", "5% off engine oil", 5, 7),
        ];

        Self::new(products, promos)
    }

    pub fn list_products(&self, query: &ProductQuery) -> Vec<Product> {
        let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let needle = query
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.products
            .iter()
            .filter(|p| category.map_or(true, |c| p.category.eq_ignore_ascii_case(c)))
            .filter(|p| {
                needle.as_deref().map_or(true, |n| {
                    p.name.to_lowercase().contains(n) || p.description.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect()
    }

    pub fn get_product(&self, id: u32) -> Option<Product> {
        self.products.iter().find(|p| p.id == id).cloned()
    }

    /// Promos that have not expired at `now`
    pub fn active_promos(&self, now: DateTime<Utc>) -> Vec<Promo> {
        self.promos
            .iter()
            .filter(|p| p.valid_until > now)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_by_category_and_text() {
        let catalog = Catalog::seeded(Utc::now());

        let oils = catalog.list_products(&ProductQuery {
            category: Some("OIL".to_string()),
            q: None,
        });
        assert_eq!(oils.len(), 2);

        let synthetic = catalog.list_products(&ProductQuery {
            category: Some("oil".to_string()),
            q: Some("fully".to_string()),
        });
        assert_eq!(synthetic.len(), 1);
        assert_eq!(synthetic[0].id, 2);

        let everything = catalog.list_products(&ProductQuery::default());
        assert_eq!(everything.len(), 8);
    }

    #[test]
    fn test_get_product() {
        let catalog = Catalog::seeded(Utc::now());
        assert_eq!(catalog.get_product(5).map(|p| p.category), Some("ignition".to_string()));
        assert!(catalog.get_product(999).is_none());
    }

    #[test]
    fn test_expired_promos_are_hidden() {
        let start = Utc::now();
        let catalog = Catalog::seeded(start);
        assert_eq!(catalog.active_promos(start).len(), 3);
        assert_eq!(catalog.active_promos(start + Duration::days(10)).len(), 2);
        assert!(catalog.active_promos(start + Duration::days(31)).is_empty());
    }
}
