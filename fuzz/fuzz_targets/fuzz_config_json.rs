//! Fuzz target: `NodeConfig::from_json`
//!
//! Any document the parser accepts must also pass validation on its own.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use lightlink::config::NodeConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = core::str::from_utf8(data) {
        if let Ok(config) = NodeConfig::from_json(json) {
            assert!(config.validate().is_ok());
        }
    }
});
