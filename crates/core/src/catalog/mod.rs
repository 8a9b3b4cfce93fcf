pub mod loader;

use crate::domain::product::Product;

/// Immutable snapshot of the rentable catalog. The server swaps whole
/// snapshots on reload; a pricing invocation reads exactly one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Case-insensitive exact match, sku preferred over name. Blank
    /// identifiers are treated as absent.
    pub fn resolve(&self, sku: Option<&str>, name: Option<&str>) -> Option<&Product> {
        let sku = sku.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
        let name = name.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);

        if let Some(sku) = &sku {
            if let Some(product) =
                self.products.iter().find(|p| p.sku.to_lowercase() == *sku)
            {
                return Some(product);
            }
        }
        if let Some(name) = &name {
            return self.products.iter().find(|p| p.name.to_lowercase() == *name);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::product::Product;

    use super::Catalog;

    fn product(sku: &str, name: &str) -> Product {
        Product {
            sku: sku.to_owned(),
            name: name.to_owned(),
            category: "Audio".to_owned(),
            section: String::new(),
            description: String::new(),
            image_url: String::new(),
            daily_price: Decimal::new(100, 0),
            deposit_rate: Decimal::ZERO,
            active: true,
            discountable: true,
        }
    }

    #[test]
    fn resolves_sku_case_insensitively() {
        let catalog = Catalog::new(vec![product("LED-01", "Pantalla LED")]);
        assert!(catalog.resolve(Some("led-01"), None).is_some());
        assert!(catalog.resolve(Some(" LED-01 "), None).is_some());
    }

    #[test]
    fn falls_back_to_name_when_sku_misses() {
        let catalog = Catalog::new(vec![product("LED-01", "Pantalla LED")]);
        let hit = catalog.resolve(Some("WRONG"), Some("pantalla led")).expect("name fallback");
        assert_eq!(hit.sku, "LED-01");
    }

    #[test]
    fn sku_match_wins_over_name_match() {
        let catalog = Catalog::new(vec![
            product("A-1", "Bocina"),
            product("B-2", "a-1"), // a product whose *name* collides with another sku
        ]);
        let hit = catalog.resolve(Some("a-1"), Some("a-1")).expect("resolve");
        assert_eq!(hit.sku, "A-1");
    }

    #[test]
    fn blank_identifiers_do_not_resolve() {
        let catalog = Catalog::new(vec![product("LED-01", "Pantalla LED")]);
        assert!(catalog.resolve(Some("  "), Some("")).is_none());
        assert!(catalog.resolve(None, None).is_none());
    }
}
