use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "service": {
                "type": "object",
                "properties": {
                    "url": { "type": "string", "format": "uri" },
                    "api": { "type": "string", "enum": ["legacy", "current"] },
                    "token": { "type": "string" },
                    "company_id": { "type": "string" },
                    "architecture_id": { "type": "string" },
                    "architecture_type": { "type": "string", "enum": ["android", "ios"] }
                },
                "additionalProperties": false
            },
            "scan": {
                "type": "object",
                "properties": {
                    "profile": { "type": "integer", "minimum": 1 },
                    "testcases": {
                        "type": "array",
                        "items": { "type": "integer", "minimum": 1 },
                        "minItems": 1
                    },
                    "poll_interval_secs": { "type": "integer", "minimum": 0 },
                    "max_attempts": { "type": "integer", "minimum": 1 },
                    "no_wait": { "type": "boolean" }
                },
                "additionalProperties": false
            },
            "retry": {
                "type": "object",
                "properties": {
                    "attempts": { "type": "integer", "minimum": 1 },
                    "delay_secs": { "type": "integer", "minimum": 0 }
                },
                "additionalProperties": false
            },
            "report": {
                "type": "object",
                "properties": {
                    "types": {
                        "type": "array",
                        "items": { "type": "string", "enum": ["standard", "grouping", "separate"] }
                    },
                    "output_dir": { "type": "string" },
                    "json_file": { "type": "string", "minLength": 1 }
                },
                "additionalProperties": false
            },
            "distribution": {
                "type": "object",
                "properties": {
                    "system": { "type": "string", "enum": ["file", "hockeyapp", "appcenter"] },
                    "file": { "type": "string" },
                    "hockeyapp": {
                        "type": "object",
                        "properties": {
                            "token": { "type": "string" },
                            "bundle_id": { "type": "string" },
                            "public_id": { "type": "string" },
                            "version": { "type": "string" }
                        }
                    },
                    "appcenter": {
                        "type": "object",
                        "properties": {
                            "token": { "type": "string" },
                            "owner": { "type": "string" },
                            "app": { "type": "string" },
                            "release_id": { "type": "string" },
                            "version": { "type": "string" }
                        }
                    }
                }
            }
        },
        "additionalProperties": false
    })
});
