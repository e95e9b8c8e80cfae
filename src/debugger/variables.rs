use serde_json::Value;

/// The variable the user picked in the debugger's variables view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    /// Display name
    pub name: String,
    /// Expression the debugger uses to reach this variable
    pub evaluate_name: String,
}

impl VariableRef {
    /// Create a reference from an access expression
    pub fn new(evaluate_name: impl Into<String>) -> Self {
        let evaluate_name = evaluate_name.into();
        Self {
            name: evaluate_name.clone(),
            evaluate_name,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Extract the variable from a variables-view context menu payload
    ///
    /// Accepts `{"variable": {"name": .., "evaluateName": ..}}` as well as the
    /// inner object on its own. Falls back to `name` when there is no
    /// `evaluateName`.
    pub fn from_context(payload: &Value) -> Option<Self> {
        let variable = payload.get("variable").unwrap_or(payload);
        let name = variable.get("name").and_then(Value::as_str);
        let evaluate_name = variable
            .get("evaluateName")
            .and_then(Value::as_str)
            .or(name)?;
        Some(Self::new(evaluate_name).with_name(name.unwrap_or(evaluate_name)))
    }
}

/// Parse an unsigned integer literal: decimal, `0x` hex, `0o` octal or `0b`
/// binary
pub fn parse_unsigned(text: &str) -> Option<u64> {
    let text = text.strip_prefix('+').unwrap_or(text);
    let (digits, radix) = match text.get(..2) {
        Some("0x") | Some("0X") => (&text[2..], 16),
        Some("0o") | Some("0O") => (&text[2..], 8),
        Some("0b") | Some("0B") => (&text[2..], 2),
        _ => (text, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Parse the `result` string of an `evaluate` response as a number
///
/// Debuggers annotate some scalars, e.g. an `unsigned char` holding 8 shows
/// as `8 '\b'`, so only the first token is considered.
pub fn parse_numeric(result: &str) -> Option<u64> {
    let token = result.split_whitespace().next()?;
    parse_unsigned(token)
}
