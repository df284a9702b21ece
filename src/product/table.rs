use super::{Features, FirmwareUpgrade, Product};
use crate::color::TemperatureRange;

const VENDOR_ID: u32 = 1;
const VENDOR_NAME: &str = "LIFX";

#[derive(Clone, Copy)]
enum Capability {
    Color,
    Chain,
    Matrix,
    Relays,
    Buttons,
    Infrared,
    Multizone,
    Hev,
    ExtendedMultizone,
}

struct Row {
    pid: u32,
    name: &'static str,
    caps: &'static [Capability],
    kelvin: Option<(u16, u16)>,
    upgrades: &'static [UpgradeRow],
}

struct UpgradeRow {
    major: u16,
    minor: u16,
    caps: &'static [Capability],
    kelvin: Option<(u16, u16)>,
}

use Capability::{
    Buttons, Chain, Color, ExtendedMultizone, Hev, Infrared, Matrix, Multizone, Relays,
};

const WIDE: Option<(u16, u16)> = Some((2500, 9000));
const WHITE: Option<(u16, u16)> = Some((2700, 6500));
const DAY_AND_DUSK: Option<(u16, u16)> = Some((1500, 4000));
const EXTENDED: Option<(u16, u16)> = Some((1500, 9000));

const MULTIZONE_UPGRADES: &[UpgradeRow] = &[
    UpgradeRow {
        major: 2,
        minor: 77,
        caps: &[ExtendedMultizone],
        kelvin: None,
    },
    UpgradeRow {
        major: 2,
        minor: 80,
        caps: &[],
        kelvin: EXTENDED,
    },
];

const TILE_UPGRADES: &[UpgradeRow] = &[UpgradeRow {
    major: 3,
    minor: 50,
    caps: &[],
    kelvin: EXTENDED,
}];

#[rustfmt::skip]
const ROWS: &[Row] = &[
    Row { pid: 1, name: "Original 1000", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 3, name: "Color 650", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 10, name: "White 800 (Low Voltage)", caps: &[], kelvin: WHITE, upgrades: &[] },
    Row { pid: 11, name: "White 800 (High Voltage)", caps: &[], kelvin: WHITE, upgrades: &[] },
    Row { pid: 18, name: "White 900 BR30 (Low Voltage)", caps: &[], kelvin: WHITE, upgrades: &[] },
    Row { pid: 20, name: "Color 1000 BR30", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 22, name: "Color 1000", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 27, name: "LIFX A19", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 28, name: "LIFX BR30", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 29, name: "LIFX+ A19", caps: &[Color, Infrared], kelvin: WIDE, upgrades: &[] },
    Row { pid: 30, name: "LIFX+ BR30", caps: &[Color, Infrared], kelvin: WIDE, upgrades: &[] },
    Row { pid: 31, name: "LIFX Z", caps: &[Color, Multizone], kelvin: WIDE, upgrades: &[] },
    Row { pid: 32, name: "LIFX Z 2", caps: &[Color, Multizone], kelvin: WIDE, upgrades: MULTIZONE_UPGRADES },
    Row { pid: 36, name: "LIFX Downlight", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 37, name: "LIFX Downlight", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 38, name: "LIFX Beam", caps: &[Color, Multizone], kelvin: WIDE, upgrades: MULTIZONE_UPGRADES },
    Row { pid: 43, name: "LIFX A19", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 44, name: "LIFX BR30", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 45, name: "LIFX+ A19", caps: &[Color, Infrared], kelvin: WIDE, upgrades: &[] },
    Row { pid: 46, name: "LIFX+ BR30", caps: &[Color, Infrared], kelvin: WIDE, upgrades: &[] },
    Row { pid: 49, name: "LIFX Mini", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 50, name: "LIFX Mini Day and Dusk", caps: &[], kelvin: DAY_AND_DUSK, upgrades: &[] },
    Row { pid: 51, name: "LIFX Mini White", caps: &[], kelvin: Some((2700, 2700)), upgrades: &[] },
    Row { pid: 52, name: "LIFX GU10", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 55, name: "LIFX Tile", caps: &[Color, Chain, Matrix], kelvin: WIDE, upgrades: TILE_UPGRADES },
    Row { pid: 56, name: "LIFX Beam", caps: &[Color, Multizone], kelvin: WIDE, upgrades: MULTIZONE_UPGRADES },
    Row { pid: 57, name: "LIFX Candle", caps: &[Color, Matrix], kelvin: EXTENDED, upgrades: &[] },
    Row { pid: 59, name: "LIFX Mini Color", caps: &[Color], kelvin: WIDE, upgrades: &[] },
    Row { pid: 60, name: "LIFX Mini Day and Dusk", caps: &[], kelvin: DAY_AND_DUSK, upgrades: &[] },
    Row { pid: 61, name: "LIFX Mini White", caps: &[], kelvin: Some((2700, 2700)), upgrades: &[] },
    Row { pid: 70, name: "LIFX Switch", caps: &[Relays, Buttons], kelvin: None, upgrades: &[] },
    Row { pid: 71, name: "LIFX Switch", caps: &[Relays, Buttons], kelvin: None, upgrades: &[] },
    Row { pid: 89, name: "LIFX Switch", caps: &[Relays, Buttons], kelvin: None, upgrades: &[] },
    Row { pid: 90, name: "LIFX Clean", caps: &[Color, Hev], kelvin: EXTENDED, upgrades: &[] },
];

fn vendor_defaults() -> Features {
    Features {
        hev: Some(false),
        color: Some(false),
        chain: Some(false),
        matrix: Some(false),
        relays: Some(false),
        buttons: Some(false),
        infrared: Some(false),
        multizone: Some(false),
        extended_multizone: Some(false),
        temperature_range: None,
    }
}

fn features_with(caps: &[Capability], kelvin: Option<(u16, u16)>) -> Features {
    let mut features = Features {
        temperature_range: kelvin.map(|(min, max)| TemperatureRange::new(min, max)),
        ..Features::default()
    };
    for cap in caps {
        let slot = match cap {
            Color => &mut features.color,
            Chain => &mut features.chain,
            Matrix => &mut features.matrix,
            Relays => &mut features.relays,
            Buttons => &mut features.buttons,
            Infrared => &mut features.infrared,
            Multizone => &mut features.multizone,
            Hev => &mut features.hev,
            ExtendedMultizone => &mut features.extended_multizone,
        };
        *slot = Some(true);
    }
    features
}

pub(super) fn builtin_products() -> Vec<Product> {
    ROWS.iter()
        .map(|row| Product {
            vendor_id: VENDOR_ID,
            vendor_name: VENDOR_NAME.to_string(),
            product_id: row.pid,
            name: row.name.to_string(),
            features: features_with(row.caps, row.kelvin).or(vendor_defaults()),
            upgrades: row
                .upgrades
                .iter()
                .map(|upgrade| FirmwareUpgrade {
                    major: upgrade.major,
                    minor: upgrade.minor,
                    features: features_with(upgrade.caps, upgrade.kelvin),
                })
                .collect(),
        })
        .collect()
}
