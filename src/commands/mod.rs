pub mod calendar;
pub mod content;
pub mod recommend;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to encode result as JSON")
}
