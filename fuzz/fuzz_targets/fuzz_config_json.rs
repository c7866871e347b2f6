//! Fuzz target: `config.json` parsing and validation
//!
//! Any byte sequence either fails to parse, fails validation, or yields a
//! config that survives a save/load cycle unchanged.
//!
//! Invariants checked:
//! - No panics in deserialization, validation or site construction
//! - A valid config re-serializes to an equal, still-valid config
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use minder::config::{SystemConfig, validate};

fuzz_target!(|data: &[u8]| {
    let Ok(cfg) = serde_json::from_slice::<SystemConfig>(data) else {
        return;
    };
    if validate(&cfg).is_err() {
        return;
    }

    let site = cfg.site();
    for profile in &site.profiles {
        let _ = site.profile(&profile.name);
    }

    let bytes = serde_json::to_vec(&cfg).unwrap();
    let again: SystemConfig = serde_json::from_slice(&bytes).unwrap();
    assert!(validate(&again).is_ok());
    assert_eq!(again, cfg);
});
