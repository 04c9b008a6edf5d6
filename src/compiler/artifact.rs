//! Publish payload artifact decoding.
//!
//! The compiler writes the publish transaction it would send:
//!
//! ```json
//! {
//!   "function_id": "0x1::code::publish_package_txn",
//!   "type_args": [],
//!   "args": [
//!     { "type": "hex", "value": "0x<metadata>" },
//!     { "type": "hex", "value": ["0x<module>", "..."] }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::blockchain::transaction::PUBLISH_PACKAGE_FUNCTION;
use crate::compiler::{CompiledModule, CompilerError};

#[derive(Debug, Deserialize)]
struct PublishPayload {
    function_id: String,
    #[serde(default)]
    type_args: Vec<Value>,
    args: Vec<PayloadArg>,
}

#[derive(Debug, Deserialize)]
struct PayloadArg {
    #[serde(rename = "type")]
    arg_type: String,
    value: Value,
}

/// Read and decode an artifact from disk.
pub async fn read_artifact(path: &Path) -> Result<CompiledModule, CompilerError> {
    let raw = tokio::fs::read(path).await.map_err(|e| {
        CompilerError::Compile(format!("artifact {} unreadable: {}", path.display(), e))
    })?;
    parse_artifact(&raw)
}

/// Decode artifact bytes into a [`CompiledModule`].
///
/// Either every field decodes or the whole artifact is rejected.
pub fn parse_artifact(raw: &[u8]) -> Result<CompiledModule, CompilerError> {
    let payload: PublishPayload = serde_json::from_slice(raw)
        .map_err(|e| CompilerError::ArtifactParse(format!("invalid JSON: {}", e)))?;

    if !is_publish_function(&payload.function_id) {
        return Err(CompilerError::ArtifactParse(format!(
            "expected {} payload, found {}",
            PUBLISH_PACKAGE_FUNCTION, payload.function_id
        )));
    }
    if !payload.type_args.is_empty() {
        return Err(CompilerError::ArtifactParse(
            "publish payload must not carry type arguments".to_string(),
        ));
    }

    let [metadata_arg, code_arg] = <[PayloadArg; 2]>::try_from(payload.args).map_err(|args| {
        CompilerError::ArtifactParse(format!("expected 2 arguments, found {}", args.len()))
    })?;

    let metadata = match expect_hex_arg(&metadata_arg, "metadata")? {
        Value::String(s) => decode_hex(s, "metadata")?,
        _ => {
            return Err(CompilerError::ArtifactParse(
                "metadata must be a hex string".to_string(),
            ))
        }
    };

    let bytecode = match expect_hex_arg(&code_arg, "code")? {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::String(s) => decode_hex(s, &format!("module #{}", idx)),
                _ => Err(CompilerError::ArtifactParse(format!(
                    "module #{} must be a hex string",
                    idx
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(CompilerError::ArtifactParse(
                "code must be an array of hex strings".to_string(),
            ))
        }
    };

    CompiledModule::new(metadata, bytecode)
}

fn is_publish_function(function_id: &str) -> bool {
    let Some((address, rest)) = function_id.split_once("::") else {
        return false;
    };
    let address = address.trim_start_matches("0x").trim_start_matches('0');
    address == "1" && rest == "code::publish_package_txn"
}

fn expect_hex_arg<'a>(arg: &'a PayloadArg, name: &str) -> Result<&'a Value, CompilerError> {
    if arg.arg_type != "hex" {
        return Err(CompilerError::ArtifactParse(format!(
            "{} argument has type '{}', expected 'hex'",
            name, arg.arg_type
        )));
    }
    Ok(&arg.value)
}

fn decode_hex(encoded: &str, what: &str) -> Result<Vec<u8>, CompilerError> {
    let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
    hex::decode(digits)
        .map_err(|e| CompilerError::ArtifactParse(format!("{} is not valid hex: {}", what, e)))
}
