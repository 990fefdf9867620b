// ── Response shape matchers ──
//
// The listing and identity endpoints have returned their collections in
// several envelope shapes over time. Each shape is a named matcher that
// either yields the item slice or falls through; callers try an ordered list
// and take the first hit. A miss is not an error: the section is empty.

use serde_json::Value;
use tracing::debug;

/// A named extractor for one known response shape.
#[derive(Clone, Copy)]
pub struct Shape {
    pub name: &'static str,
    pub matcher: fn(&Value) -> Option<&[Value]>,
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Shape").field(&self.name).finish()
    }
}

/// `[ {...}, {...} ]`
pub const FLAT_ARRAY: Shape = Shape {
    name: "flat-array",
    matcher: flat_array,
};

/// `{ "success": true, "data": { "items": [...] } }`
pub const SUCCESS_ENVELOPE: Shape = Shape {
    name: "success-envelope",
    matcher: success_envelope,
};

/// `{ "items": [...] }`
pub const ITEMS_OBJECT: Shape = Shape {
    name: "items-object",
    matcher: items_object,
};

fn flat_array(value: &Value) -> Option<&[Value]> {
    value.as_array().map(Vec::as_slice)
}

fn success_envelope(value: &Value) -> Option<&[Value]> {
    if value.get("success").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    value.get("data")?.get("items")?.as_array().map(Vec::as_slice)
}

fn items_object(value: &Value) -> Option<&[Value]> {
    value.get("items")?.as_array().map(Vec::as_slice)
}

/// Identity endpoint shapes, in priority order.
pub const IDENTITY_SHAPES: &[Shape] = &[FLAT_ARRAY, SUCCESS_ENVELOPE, ITEMS_OBJECT];

/// Primary listing shapes. Only a successful envelope counts.
pub const LISTING_SHAPES: &[Shape] = &[SUCCESS_ENVELOPE];

/// First matching shape and its items.
pub fn match_items<'a>(value: &'a Value, shapes: &[Shape]) -> Option<(&'static str, &'a [Value])> {
    shapes
        .iter()
        .find_map(|shape| (shape.matcher)(value).map(|items| (shape.name, items)))
}

/// Items from the first matching shape, or an empty slice.
///
/// `section` names the payload in the debug log when nothing matches.
pub fn normalize_items<'a>(value: &'a Value, shapes: &[Shape], section: &str) -> &'a [Value] {
    match match_items(value, shapes) {
        Some((shape, items)) => {
            debug!(section, shape, count = items.len(), "matched response shape");
            items
        }
        None => {
            debug!(section, "unrecognized response shape, treating as empty");
            &[]
        }
    }
}
