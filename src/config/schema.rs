use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "llm": {
                "type": "object",
                "properties": {
                    "provider": { "type": "string" },
                    "model": { "type": "string" },
                    "api_key": { "type": "string" },
                    "base_url": { "type": "string" },
                    "context_length": { "type": "integer", "minimum": 2048 },
                    "ollama_host": { "type": "string" }
                },
                "additionalProperties": false
            },
            "recon": {
                "type": "object",
                "properties": {
                    "steps": { "type": "integer", "minimum": 1, "maximum": 5 },
                    "idle_timeout_secs": { "type": "integer", "minimum": 1 },
                    "total_timeout_secs": { "type": "integer", "minimum": 1 },
                    "baseline_multiplier": { "type": "integer", "minimum": 1 },
                    "grace_secs": { "type": "integer", "minimum": 0 },
                    "workers": { "type": "integer", "minimum": 1 },
                    "concurrent": { "type": "boolean" },
                    "dedup_threshold": { "type": "number", "exclusiveMinimum": 0, "maximum": 1 },
                    "dedup_cap": { "type": "integer", "minimum": 1 },
                    "output_dir": { "type": "string" },
                    "wordlists": {
                        "type": "object",
                        "properties": {
                            "web": { "type": "string" },
                            "dns": { "type": "string" }
                        }
                    }
                },
                "additionalProperties": false
            },
            "tools": {
                "type": "object",
                "properties": {
                    "apt": { "type": "array", "items": { "type": "string" } },
                    "pip": { "type": "array", "items": { "type": "string" } },
                    "custom": { "type": "object" }
                }
            },
            "filters": {
                "type": "object",
                "additionalProperties": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        }
    })
});
