use serde_json::Value;

/// Opcode assumed when the fallback shape omits one. Inherited from the
/// channel's legacy event shape where frames without an opcode were binary;
/// text frames arriving through that path would be mis-tagged, but none
/// have been observed.
const DEFAULT_OPCODE: i64 = 2;

/// A WebSocket frame normalized out of either raw event shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePayload {
    pub data: String,
    pub opcode: i64,
}

/// Extract `(payload, opcode)` from a raw frame event. The channel nests
/// them under `response` in the current shape; older channels put
/// `payloadData` at the top level. Events matching neither shape yield
/// `None` and are dropped by the caller.
pub fn parse_ws_frame(params: &Value) -> Option<FramePayload> {
    if let Some(nested) = parse_nested(params) {
        return Some(nested);
    }
    parse_top_level(params)
}

fn parse_nested(params: &Value) -> Option<FramePayload> {
    let response = params.get("response")?;
    let data = response.get("payloadData")?.as_str()?;
    let opcode = opcode_number(response.get("opcode")?)?;
    Some(FramePayload {
        data: data.to_string(),
        opcode,
    })
}

fn parse_top_level(params: &Value) -> Option<FramePayload> {
    let data = params.get("payloadData")?.as_str()?;
    let opcode = params
        .get("opcode")
        .and_then(opcode_number)
        .unwrap_or(DEFAULT_OPCODE);
    Some(FramePayload {
        data: data.to_string(),
        opcode,
    })
}

// The channel reports opcodes as JSON floats (2.0); accept either integer
// or float encodings.
fn opcode_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}
