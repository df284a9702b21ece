mod features;
mod table;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ProductRegistryError;

pub use self::features::Features;

/// Composite key for the product table: vendor in the high 32 bits.
///
/// ```
/// use lifxlan::product_map_key;
///
/// assert_eq!((1_u64 << 32) | 55, product_map_key(1, 55));
/// ```
#[must_use]
pub const fn product_map_key(vendor_id: u32, product_id: u32) -> u64 {
    ((vendor_id as u64) << 32) | product_id as u64
}

/// Host firmware version, ordered major-first.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
}

impl FirmwareVersion {
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Vendor, product and hardware revision reported by a device.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize)]
pub struct HardwareVersion {
    pub vendor_id: u32,
    pub product_id: u32,
    pub version: u32,
}

impl HardwareVersion {
    #[must_use]
    pub const fn product_map_key(&self) -> u64 {
        product_map_key(self.vendor_id, self.product_id)
    }
}

impl fmt::Display for HardwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.vendor_id, self.product_id, self.version)
    }
}

/// Features that change once a device runs at least the given firmware.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct FirmwareUpgrade {
    pub major: u16,
    pub minor: u16,
    #[serde(default)]
    pub features: Features,
}

impl FirmwareUpgrade {
    #[must_use]
    pub const fn version(&self) -> FirmwareVersion {
        FirmwareVersion::new(self.major, self.minor)
    }
}

/// One known product.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Product {
    pub vendor_id: u32,
    pub vendor_name: String,
    pub product_id: u32,
    pub name: String,
    pub features: Features,
    pub upgrades: Vec<FirmwareUpgrade>,
}

impl Product {
    /// Resolves the features of this product at `firmware`.
    ///
    /// Upgrades at or below `firmware` apply; for each field the highest
    /// applicable upgrade that sets it wins, and the base features fill
    /// whatever no upgrade sets.
    ///
    /// ```
    /// use lifxlan::{Features, FirmwareUpgrade, FirmwareVersion, Product};
    ///
    /// let product = Product {
    ///     vendor_id: 1,
    ///     vendor_name: "LIFX".into(),
    ///     product_id: 1,
    ///     name: "Example".into(),
    ///     features: Features { color: Some(false), ..Features::default() },
    ///     upgrades: vec![FirmwareUpgrade {
    ///         major: 1,
    ///         minor: 1,
    ///         features: Features { color: Some(true), ..Features::default() },
    ///     }],
    /// };
    ///
    /// assert_eq!(Some(true), product.features_at(FirmwareVersion::new(1, 2)).color);
    /// assert_eq!(Some(false), product.features_at(FirmwareVersion::new(1, 0)).color);
    /// ```
    #[must_use]
    pub fn features_at(&self, firmware: FirmwareVersion) -> Features {
        let mut applicable: Vec<&FirmwareUpgrade> = self
            .upgrades
            .iter()
            .filter(|upgrade| upgrade.version() <= firmware)
            .collect();
        applicable.sort_by_key(|upgrade| upgrade.version());

        applicable
            .iter()
            .rev()
            .fold(Features::default(), |merged, upgrade| {
                merged.or(upgrade.features)
            })
            .or(self.features)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct VendorRecord {
    vid: u32,
    name: String,
    #[serde(default)]
    defaults: Features,
    #[serde(default)]
    products: Vec<ProductRecord>,
}

#[derive(Debug, Deserialize)]
struct ProductRecord {
    pid: u32,
    name: String,
    #[serde(default)]
    features: Features,
    #[serde(default)]
    upgrades: Vec<FirmwareUpgrade>,
}

static BUILTIN: LazyLock<Arc<ProductRegistry>> =
    LazyLock::new(|| Arc::new(ProductRegistry::from_products(table::builtin_products())));

/// Lookup table from `(vendor, product)` to product metadata.
#[derive(Debug, Clone, Default)]
pub struct ProductRegistry {
    products: HashMap<u64, Product>,
}

impl ProductRegistry {
    /// Returns the shared table of products known at build time.
    ///
    /// ```
    /// use lifxlan::ProductRegistry;
    ///
    /// let registry = ProductRegistry::builtin();
    /// let tile = registry.lookup(1, 55).expect("tile is a known product");
    /// assert_eq!("LIFX Tile", tile.name);
    /// ```
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Builds a registry from products; later duplicates replace earlier ones.
    #[must_use]
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .map(|product| {
                    (
                        product_map_key(product.vendor_id, product.product_id),
                        product,
                    )
                })
                .collect(),
        }
    }

    /// Parses the vendor-published products JSON (an array of vendors, each
    /// with `vid`, `name`, `defaults` and `products`).
    ///
    /// Vendor defaults fill any feature a product leaves unset.
    ///
    /// # Errors
    ///
    /// Returns an error when the document does not match the schema.
    pub fn from_json(json: &str) -> Result<Self, ProductRegistryError> {
        let vendors: Vec<VendorRecord> = serde_json::from_str(json)?;
        let products = vendors.into_iter().flat_map(|vendor| {
            let VendorRecord {
                vid,
                name: vendor_name,
                defaults,
                products,
            } = vendor;
            products.into_iter().map(move |record| Product {
                vendor_id: vid,
                vendor_name: vendor_name.clone(),
                product_id: record.pid,
                name: record.name,
                features: record.features.or(defaults),
                upgrades: record.upgrades,
            })
        });
        Ok(Self::from_products(products))
    }

    /// Reads and parses a products JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    #[instrument(level = "debug")]
    pub fn from_path(path: &Path) -> Result<Self, ProductRegistryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Returns a registry with `overrides` layered over this one.
    #[must_use]
    pub fn merged_with(&self, overrides: &ProductRegistry) -> Self {
        let mut products = self.products.clone();
        products.extend(
            overrides
                .products
                .iter()
                .map(|(key, product)| (*key, product.clone())),
        );
        Self { products }
    }

    /// Looks up a product by vendor and product id.
    #[must_use]
    pub fn lookup(&self, vendor_id: u32, product_id: u32) -> Option<&Product> {
        self.products.get(&product_map_key(vendor_id, product_id))
    }

    /// Looks up the product described by a reported hardware version.
    #[must_use]
    pub fn lookup_hardware(&self, hardware: &HardwareVersion) -> Option<&Product> {
        self.products.get(&hardware.product_map_key())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::color::TemperatureRange;

    fn layered_product() -> Product {
        Product {
            vendor_id: 1,
            vendor_name: "LIFX".to_string(),
            product_id: 1,
            name: "Layered".to_string(),
            features: Features {
                hev: Some(false),
                color: Some(false),
                ..Features::default()
            },
            upgrades: vec![
                FirmwareUpgrade {
                    major: 1,
                    minor: 2,
                    features: Features {
                        color: Some(true),
                        ..Features::default()
                    },
                },
                FirmwareUpgrade {
                    major: 1,
                    minor: 1,
                    features: Features {
                        hev: Some(true),
                        color: Some(false),
                        ..Features::default()
                    },
                },
            ],
        }
    }

    #[rstest]
    #[case(FirmwareVersion::new(1, 0), Some(false), Some(false))]
    #[case(FirmwareVersion::new(1, 1), Some(true), Some(false))]
    #[case(FirmwareVersion::new(1, 2), Some(true), Some(true))]
    #[case(FirmwareVersion::new(2, 0), Some(true), Some(true))]
    fn features_at_layers_applicable_upgrades(
        #[case] firmware: FirmwareVersion,
        #[case] hev: Option<bool>,
        #[case] color: Option<bool>,
    ) {
        let features = layered_product().features_at(firmware);
        assert_eq!((hev, color), (features.hev, features.color));
    }

    #[test]
    fn features_are_monotonic_in_firmware() {
        let product = layered_product();
        let versions = [
            FirmwareVersion::new(0, 9),
            FirmwareVersion::new(1, 0),
            FirmwareVersion::new(1, 1),
            FirmwareVersion::new(1, 10),
            FirmwareVersion::new(2, 1),
        ];
        for pair in versions.windows(2) {
            let lower = product.features_at(pair[0]);
            let higher = product.features_at(pair[1]);
            assert!(!lower.color.unwrap_or(false) || higher.color.unwrap_or(false));
            assert!(!lower.hev.unwrap_or(false) || higher.hev.unwrap_or(false));
        }
    }

    #[rstest]
    #[case(FirmwareVersion::new(1, 1), FirmwareVersion::new(1, 2))]
    #[case(FirmwareVersion::new(1, 10), FirmwareVersion::new(2, 1))]
    #[case(FirmwareVersion::new(2, 10), FirmwareVersion::new(10, 1))]
    fn firmware_orders_major_first(#[case] lower: FirmwareVersion, #[case] higher: FirmwareVersion) {
        assert!(lower < higher);
        assert!(!(higher < lower));
    }

    #[test]
    fn builtin_registry_resolves_known_products() {
        let registry = ProductRegistry::builtin();
        let mini_white = registry.lookup(1, 51).expect("mini white is built in");
        assert_eq!(
            Some(TemperatureRange::new(2700, 2700)),
            mini_white.features.temperature_range
        );
        assert_eq!(None, registry.lookup(1, 9999));
    }

    #[test]
    fn from_json_applies_vendor_defaults() {
        let registry = ProductRegistry::from_json(
            r#"[{
                "vid": 1,
                "name": "LIFX",
                "defaults": {"hev": false, "color": false, "temperature_range": [2500, 9000]},
                "products": [
                    {"pid": 90, "name": "Clean", "features": {"hev": true}},
                    {"pid": 55, "name": "Tile", "features": {"color": true, "chain": true},
                     "upgrades": [{"major": 3, "minor": 50, "features": {"temperature_range": [1500, 9000]}}]}
                ]
            }]"#,
        )
        .expect("products JSON should parse");

        let clean = registry.lookup(1, 90).expect("clean should be present");
        assert_eq!(Some(true), clean.features.hev);
        assert_eq!(Some(false), clean.features.color);
        assert_eq!("LIFX", clean.vendor_name);

        let tile = registry.lookup(1, 55).expect("tile should be present");
        assert_eq!(
            Some(TemperatureRange::new(1500, 9000)),
            tile.features_at(FirmwareVersion::new(3, 70)).temperature_range
        );
        assert_eq!(
            Some(TemperatureRange::new(2500, 9000)),
            tile.features_at(FirmwareVersion::new(3, 0)).temperature_range
        );
    }

    #[test]
    fn from_json_rejects_other_documents() {
        assert_matches!(
            ProductRegistry::from_json(r#"{"vid": 1}"#),
            Err(ProductRegistryError::Json(_))
        );
    }

    #[test]
    fn merged_with_prefers_overrides() {
        let base = ProductRegistry::builtin();
        let overrides = ProductRegistry::from_products([Product {
            vendor_id: 1,
            vendor_name: "LIFX".to_string(),
            product_id: 55,
            name: "Renamed Tile".to_string(),
            features: Features::default(),
            upgrades: Vec::new(),
        }]);

        let merged = base.merged_with(&overrides);
        assert_eq!(base.len(), merged.len());
        assert_eq!(
            "Renamed Tile",
            merged.lookup(1, 55).expect("tile should be present").name
        );
    }
}
