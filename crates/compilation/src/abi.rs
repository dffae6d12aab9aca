use huff_ast::{SolArg, SolError, SolEvent, SolFunction};
use serde_json::{json, Map, Value};

/// Builds the ABI array of the artifacts JSON: one entry per function, event
/// and error, in that order, each in the shape solc-family tooling expects.
pub fn build_abi<'a>(
    functions: impl Iterator<Item = &'a SolFunction<'a>>,
    events: impl Iterator<Item = &'a SolEvent<'a>>,
    errors: impl Iterator<Item = &'a SolError<'a>>,
) -> Value {
    let mut abi = Vec::new();

    for f in functions {
        abi.push(json!({
            "type": "function",
            "name": f.name.0,
            "inputs": args_json(&f.inputs, false),
            "outputs": args_json(&f.outputs, false),
            "stateMutability": f.mutability.to_string(),
        }));
    }
    for e in events {
        abi.push(json!({
            "type": "event",
            "name": e.name.0,
            "inputs": args_json(&e.inputs, true),
            "anonymous": false,
        }));
    }
    for e in errors {
        abi.push(json!({
            "type": "error",
            "name": e.name.0,
            "inputs": args_json(&e.inputs, false),
        }));
    }

    Value::Array(abi)
}

fn args_json(args: &[SolArg], indexed_field: bool) -> Value {
    Value::Array(args.iter().map(|a| arg_json(a, indexed_field)).collect())
}

fn arg_json(arg: &SolArg, indexed_field: bool) -> Value {
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(arg.name.unwrap_or("")));
    obj.insert("type".to_string(), json!(arg.ty.abi_type_name()));
    if let Some(components) = arg.ty.components() {
        obj.insert("components".to_string(), args_json(components, indexed_field));
    }
    if indexed_field {
        obj.insert("indexed".to_string(), json!(arg.indexed));
    }
    Value::Object(obj)
}

/// The full artifacts JSON: ABI plus creation (`bytecode`) and runtime
/// (`deployedBytecode`) object hex, matching the solc-family artifact shape.
pub fn build_artifacts(abi: Value, deploy: &[u8], runtime: &[u8]) -> Value {
    json!({
        "abi": abi,
        "bytecode": { "object": format!("0x{}", hex::encode(deploy)) },
        "deployedBytecode": { "object": format!("0x{}", hex::encode(runtime)) },
    })
}
