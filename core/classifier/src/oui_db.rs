// Path and File Name : /home/sensor/home-sensor-core/core/classifier/src/oui_db.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Two-tier OUI lookup tables: hand-curated entries with device type and model, plus a bulk IEEE manufacturer fallback

use std::collections::HashMap;

use once_cell::sync::Lazy;

pub struct CuratedOuiEntry {
    pub manufacturer: &'static str,
    pub device_type: &'static str,
    pub model: Option<&'static str>,
    pub confidence: f64,
}

/// Hand-curated OUI prefixes ("AA:BB:CC") with device type and, where known,
/// model. Wins over the bulk table when both match.
pub static CURATED_OUI: Lazy<HashMap<&'static str, CuratedOuiEntry>> = Lazy::new(|| {
    HashMap::from([
        ("B8:27:EB", CuratedOuiEntry { manufacturer: "Raspberry Pi Foundation", device_type: "single_board_computer", model: Some("Raspberry Pi"), confidence: 0.85 }),
        ("DC:A6:32", CuratedOuiEntry { manufacturer: "Raspberry Pi Foundation", device_type: "single_board_computer", model: Some("Raspberry Pi 4"), confidence: 0.85 }),
        ("F0:B4:D2", CuratedOuiEntry { manufacturer: "Sonos", device_type: "smart_speaker", model: None, confidence: 0.80 }),
        ("18:B4:30", CuratedOuiEntry { manufacturer: "Nest Labs", device_type: "iot_sensor", model: Some("Nest Thermostat"), confidence: 0.82 }),
        ("A4:77:33", CuratedOuiEntry { manufacturer: "Amazon Technologies", device_type: "smart_speaker", model: Some("Echo"), confidence: 0.80 }),
        ("74:C2:46", CuratedOuiEntry { manufacturer: "Amazon Technologies", device_type: "smart_speaker", model: Some("Echo Dot"), confidence: 0.80 }),
        ("D8:3A:DD", CuratedOuiEntry { manufacturer: "Ubiquiti Networks", device_type: "router", model: None, confidence: 0.78 }),
        ("00:1A:11", CuratedOuiEntry { manufacturer: "Google", device_type: "smart_speaker", model: Some("Google Home"), confidence: 0.75 }),
        ("F4:F5:D8", CuratedOuiEntry { manufacturer: "Google", device_type: "smart_speaker", model: Some("Nest Mini"), confidence: 0.78 }),
        ("00:17:88", CuratedOuiEntry { manufacturer: "Philips", device_type: "iot_sensor", model: Some("Hue Bridge"), confidence: 0.80 }),
        ("B0:C5:54", CuratedOuiEntry { manufacturer: "Synology", device_type: "nas", model: None, confidence: 0.82 }),
        ("00:11:32", CuratedOuiEntry { manufacturer: "Synology", device_type: "nas", model: None, confidence: 0.82 }),
        ("00:08:9B", CuratedOuiEntry { manufacturer: "QNAP Systems", device_type: "nas", model: None, confidence: 0.80 }),
        ("00:1D:BA", CuratedOuiEntry { manufacturer: "Sony", device_type: "game_console", model: Some("PlayStation"), confidence: 0.75 }),
        ("7C:BB:8A", CuratedOuiEntry { manufacturer: "Microsoft", device_type: "game_console", model: Some("Xbox"), confidence: 0.75 }),
        ("00:17:AB", CuratedOuiEntry { manufacturer: "Hewlett Packard", device_type: "printer", model: None, confidence: 0.72 }),
        ("B0:4E:26", CuratedOuiEntry { manufacturer: "Roku", device_type: "smart_tv", model: None, confidence: 0.78 }),
        ("DC:CE:3A", CuratedOuiEntry { manufacturer: "Samsung Electronics", device_type: "smart_tv", model: None, confidence: 0.65 }),
        ("00:03:7F", CuratedOuiEntry { manufacturer: "Axis Communications", device_type: "camera", model: None, confidence: 0.80 }),
        ("00:40:8C", CuratedOuiEntry { manufacturer: "Axis Communications", device_type: "camera", model: None, confidence: 0.80 }),
    ])
});

/// Bulk IEEE OUI-prefix → manufacturer table, used only when the curated
/// table has no entry. Manufacturer-only; device type comes from
/// [`MANUFACTURER_TYPES`] when known.
pub static OUI_DB: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("F0:18:98", "Apple, Inc."),
        ("3C:15:C2", "Apple, Inc."),
        ("A4:83:E7", "Apple, Inc."),
        ("AC:DE:48", "Apple, Inc."),
        ("00:1C:B3", "Apple, Inc."),
        ("E4:CE:8F", "Samsung Electronics Co.,Ltd"),
        ("5C:0A:5B", "Samsung Electronics Co.,Ltd"),
        ("C0:BD:D1", "Samsung Electronics Co.,Ltd"),
        ("18:F0:E4", "TP-Link Corporation Limited"),
        ("50:C7:BF", "TP-Link Corporation Limited"),
        ("A0:F3:C1", "TP-Link Corporation Limited"),
        ("00:14:BF", "Netgear"),
        ("84:1B:5E", "Netgear"),
        ("A0:21:B7", "Netgear"),
        ("EC:08:6B", "Huawei Technologies Co.,Ltd"),
        ("00:E0:FC", "Huawei Technologies Co.,Ltd"),
        ("DC:4F:22", "Xiaomi Communications Co Ltd"),
        ("64:CC:2E", "Xiaomi Communications Co Ltd"),
        ("34:CE:00", "Xiaomi Communications Co Ltd"),
        ("00:50:F2", "Microsoft Corp."),
        ("00:0D:3A", "Microsoft Corp."),
        ("B8:69:F4", "Zyxel Communications Corp"),
        ("00:1E:E5", "Zyxel Communications Corp"),
        ("FC:EC:DA", "Belkin International Inc."),
        ("94:10:3E", "Belkin International Inc."),
        ("00:1F:33", "Netgear"),
        ("B4:75:0E", "Intel Corporate"),
        ("94:C6:91", "Intel Corporate"),
    ])
});

/// Known manufacturer → general device category, used to assign a device
/// type to a bulk-table hit. Manufacturers absent here resolve to
/// `"unknown"`, which caps bulk-tier confidence lower.
pub static MANUFACTURER_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Apple, Inc.", "smartphone"),
        ("Samsung Electronics Co.,Ltd", "smartphone"),
        ("Xiaomi Communications Co Ltd", "smartphone"),
        ("TP-Link Corporation Limited", "router"),
        ("Netgear", "router"),
        ("Zyxel Communications Corp", "router"),
        ("Huawei Technologies Co.,Ltd", "router"),
        ("Belkin International Inc.", "router"),
        ("Microsoft Corp.", "laptop"),
        ("Intel Corporate", "laptop"),
    ])
});

pub const BULK_KNOWN_TYPE_CONFIDENCE: f64 = 0.45;
pub const BULK_UNKNOWN_TYPE_CONFIDENCE: f64 = 0.40;
