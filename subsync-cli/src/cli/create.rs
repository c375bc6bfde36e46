//! `subsync create ...` payload emitters.

use subsync_lib::{Result, SubtitleOptions};

use crate::scenario;

pub fn scenario_json() -> Result<String> {
    Ok(serde_json::to_string_pretty(&scenario::sample())?)
}

pub fn options_json() -> Result<String> {
    Ok(serde_json::to_string_pretty(&SubtitleOptions::default())?)
}
