use async_trait::async_trait;
use boa_engine::{js_string, property::Attribute, Context, Source};
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Evaluate a user JavaScript snippet in a sandboxed interpreter.
///
/// The interpreter exposes no filesystem, network, or process access;
/// only the `input` binding and a `console.log` capture are injected.
pub struct CodeJsExecutor;

#[derive(Deserialize)]
struct CodeJsData {
    #[serde(default)]
    code: String,
    #[serde(default)]
    input: Map<String, Value>,
}

// Collects console.log lines inside the interpreter so they can be
// read back after the user code ran.
const CONSOLE_SHIM: &str = r#"
var __logs = [];
var console = {
    log: function () {
        var parts = [];
        for (var i = 0; i < arguments.length; i++) {
            parts.push(String(arguments[i]));
        }
        __logs.push(parts.join(' '));
    }
};
"#;

#[async_trait]
impl NodeExecutor for CodeJsExecutor {
    fn type_key(&self) -> &str {
        "code_js"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: CodeJsData = serde_json::from_slice(input)?;

        // The interpreter context is not Send; evaluation runs on a
        // blocking thread and only plain data crosses back.
        let outcome = tokio::task::spawn_blocking(move || evaluate(&data.code, data.input))
            .await
            .map_err(|err| NodeError::Internal(err.to_string()))?;

        match outcome {
            Ok((value, logs)) => {
                let output = match value {
                    Value::Object(map) => map,
                    Value::Null => Map::new(),
                    other => {
                        let mut map = Map::new();
                        map.insert("result".to_string(), other);
                        map
                    }
                };
                Ok(NodeResult::completed("output_success")
                    .with_log(format!("js execution succeeded, logs: {logs:?}"))
                    .with_outputs(output))
            }
            Err((err, logs)) => Ok(NodeResult::soft_error(
                format!("js execution error: {err}\nlogs: {logs:?}"),
                err,
            )),
        }
    }
}

type JsOutcome = Result<(Value, Vec<String>), (String, Vec<String>)>;

fn evaluate(code: &str, input: Map<String, Value>) -> JsOutcome {
    let mut context = Context::default();

    let input_value = boa_engine::JsValue::from_json(&Value::Object(input), &mut context)
        .map_err(|err| (err.to_string(), Vec::new()))?;
    context
        .register_global_property(js_string!("input"), input_value, Attribute::all())
        .map_err(|err| (err.to_string(), Vec::new()))?;
    context
        .eval(Source::from_bytes(CONSOLE_SHIM))
        .map_err(|err| (err.to_string(), Vec::new()))?;

    let completion = context.eval(Source::from_bytes(code));
    let logs = captured_logs(&mut context);

    match completion {
        Ok(value) => {
            if value.is_undefined() {
                return Ok((Value::Null, logs));
            }
            match value.to_json(&mut context) {
                Ok(json) => Ok((json, logs)),
                // Values with no JSON form (functions, symbols) end the
                // snippet without a usable result
                Err(err) => Err((err.to_string(), logs)),
            }
        }
        Err(err) => Err((err.to_string(), logs)),
    }
}

fn captured_logs(context: &mut Context) -> Vec<String> {
    let Ok(logs_value) = context.eval(Source::from_bytes("__logs")) else {
        return Vec::new();
    };
    let Ok(json) = logs_value.to_json(context) else {
        return Vec::new();
    };
    match json {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| entry.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
