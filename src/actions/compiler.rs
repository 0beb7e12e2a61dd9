//! Per-device-type validation of raw actions.
//!
//! Each raw action is a JSON object; the compiler checks the fields its
//! subtype needs and builds an [`Action`]. Failures name the device, the action
//! index and the field. Wheel actions are recognized but produce no action.

use serde_json::{Map, Value};
use tracing::debug;

use super::keys::normalize_key;
use super::model::{Action, ActionKind, Device, DeviceType, PointerOrigin, PointerType};
use crate::engine::ElementRef;
use crate::error::{DriverError, Result};

/// Compile the `index`-th raw action of `device`.
///
/// Returns `Ok(None)` for actions that are valid but produce nothing (wheel).
pub fn compile_action(device: &Device, index: usize, raw: &Value) -> Result<Option<Action>> {
    let fields = Fields::new(device, index, raw)?;
    let kind = match device.device_type {
        DeviceType::None => compile_none(&fields)?,
        DeviceType::Key => compile_key(&fields)?,
        DeviceType::Pointer => {
            compile_pointer(&fields, device.pointer_type.unwrap_or_default())?
        }
        DeviceType::Wheel => {
            debug!(
                target: "pagepilot::actions",
                device = %device.id, index,
                "wheel actions are not supported; skipping"
            );
            return Ok(None);
        }
    };
    Ok(Some(Action {
        device_id: device.id.clone(),
        device_type: device.device_type,
        kind,
    }))
}

fn compile_none(fields: &Fields<'_>) -> Result<ActionKind> {
    match fields.subtype()? {
        "pause" => compile_pause(fields),
        other => Err(fields.invalid("type", format!("'{other}' is not valid for a none device"))),
    }
}

fn compile_key(fields: &Fields<'_>) -> Result<ActionKind> {
    match fields.subtype()? {
        "pause" => compile_pause(fields),
        "keyDown" => Ok(ActionKind::KeyDown {
            key: fields.key_value()?,
        }),
        "keyUp" => Ok(ActionKind::KeyUp {
            key: fields.key_value()?,
        }),
        other => Err(fields.invalid("type", format!("'{other}' is not valid for a key device"))),
    }
}

fn compile_pointer(fields: &Fields<'_>, pointer_type: PointerType) -> Result<ActionKind> {
    match fields.subtype()? {
        "pause" => compile_pause(fields),
        "pointerDown" => Ok(ActionKind::PointerDown {
            pointer_type,
            button: fields.button()?,
            target: fields.origin()?.and_then(element_of),
        }),
        "pointerUp" => Ok(ActionKind::PointerUp {
            pointer_type,
            button: fields.button()?,
            target: fields.origin()?.and_then(element_of),
        }),
        "pointerMove" => {
            let origin = fields.origin()?.unwrap_or(PointerOrigin::Viewport);
            let x = fields.offset("x")?;
            let y = fields.offset("y")?;
            if x != 0 || y != 0 {
                return Err(DriverError::UnsupportedOperation(format!(
                    "pointerMove by offset ({x}, {y}) on device '{}' (action {})",
                    fields.device.id, fields.index
                )));
            }
            Ok(ActionKind::PointerMove {
                pointer_type,
                origin,
                duration: fields.duration()?,
            })
        }
        "pointerCancel" => Ok(ActionKind::PointerCancel { pointer_type }),
        other => Err(fields.invalid(
            "type",
            format!("'{other}' is not valid for a pointer device"),
        )),
    }
}

/// Pause carries nothing but a required, non-negative duration.
fn compile_pause(fields: &Fields<'_>) -> Result<ActionKind> {
    let duration = fields
        .duration()?
        .ok_or_else(|| fields.invalid("duration", "missing"))?;
    Ok(ActionKind::Pause { duration })
}

fn element_of(origin: PointerOrigin) -> Option<ElementRef> {
    match origin {
        PointerOrigin::Element(element) => Some(element),
        PointerOrigin::Viewport | PointerOrigin::Pointer => None,
    }
}

/// Field accessor for one raw action, carrying enough context for errors.
struct Fields<'a> {
    device: &'a Device,
    index: usize,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn new(device: &'a Device, index: usize, raw: &'a Value) -> Result<Self> {
        let map = raw.as_object().ok_or_else(|| {
            DriverError::invalid_field(&device.id, index, "action", "expected an object")
        })?;
        Ok(Self { device, index, map })
    }

    fn invalid(&self, field: &str, reason: impl Into<String>) -> DriverError {
        DriverError::invalid_field(&self.device.id, self.index, field, reason)
    }

    fn subtype(&self) -> Result<&'a str> {
        match self.map.get("type") {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(self.invalid("type", "expected a string")),
            None => Err(self.invalid("type", "missing")),
        }
    }

    fn duration(&self) -> Result<Option<u64>> {
        match self.map.get("duration") {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid("duration", "expected a non-negative integer")),
        }
    }

    fn key_value(&self) -> Result<String> {
        let raw = match self.map.get("value") {
            Some(Value::String(s)) => s,
            Some(_) => return Err(self.invalid("value", "expected a string")),
            None => return Err(self.invalid("value", "missing")),
        };
        normalize_key(raw).ok_or_else(|| {
            self.invalid(
                "value",
                format!("'{raw}' is neither a single code point nor a named key"),
            )
        })
    }

    fn button(&self) -> Result<u32> {
        let value = self
            .map
            .get("button")
            .ok_or_else(|| self.invalid("button", "missing"))?;
        value
            .as_u64()
            .and_then(|b| u32::try_from(b).ok())
            .ok_or_else(|| self.invalid("button", "expected a non-negative integer"))
    }

    fn origin(&self) -> Result<Option<PointerOrigin>> {
        match self.map.get("origin") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s == "viewport" => Ok(Some(PointerOrigin::Viewport)),
            Some(Value::String(s)) if s == "pointer" => Ok(Some(PointerOrigin::Pointer)),
            Some(v) => ElementRef::from_json(v)
                .map(|e| Some(PointerOrigin::Element(e)))
                .ok_or_else(|| {
                    self.invalid("origin", "expected 'viewport', 'pointer' or an element")
                }),
        }
    }

    fn offset(&self, axis: &str) -> Result<i64> {
        match self.map.get(axis) {
            None | Some(Value::Null) => Ok(0),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| self.invalid(axis, "expected an integer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ELEMENT_KEY;
    use serde_json::json;

    fn device(device_type: DeviceType) -> Device {
        Device {
            id: "dev".into(),
            device_type,
            pointer_type: (device_type == DeviceType::Pointer).then_some(PointerType::Mouse),
        }
    }

    fn compile(device_type: DeviceType, raw: Value) -> Result<Option<Action>> {
        compile_action(&device(device_type), 0, &raw)
    }

    #[test]
    fn none_device_only_pauses() {
        let action = compile(DeviceType::None, json!({"type": "pause", "duration": 10}))
            .unwrap()
            .unwrap();
        assert_eq!(action.kind, ActionKind::Pause { duration: 10 });

        let err = compile(DeviceType::None, json!({"type": "keyDown", "value": "a"})).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument { ref field, .. } if field == "type"));
    }

    #[test]
    fn pause_requires_non_negative_duration() {
        let err = compile(DeviceType::Key, json!({"type": "pause"})).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument { ref field, .. } if field == "duration"));

        let err = compile(DeviceType::Key, json!({"type": "pause", "duration": -1})).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument { ref field, .. } if field == "duration"));
    }

    #[test]
    fn key_actions_normalize_values() {
        let action = compile(DeviceType::Key, json!({"type": "keyDown", "value": "Enter"}))
            .unwrap()
            .unwrap();
        assert_eq!(
            action.kind,
            ActionKind::KeyDown {
                key: "\u{E007}".into()
            }
        );

        let err = compile(DeviceType::Key, json!({"type": "keyUp"})).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument { ref field, .. } if field == "value"));

        let err = compile(DeviceType::Key, json!({"type": "keyUp", "value": "ab"})).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument { ref field, .. } if field == "value"));
    }

    #[test]
    fn pointer_down_reads_button_and_element_origin() {
        let action = compile(
            DeviceType::Pointer,
            json!({"type": "pointerDown", "button": 2, "origin": {ELEMENT_KEY: "x"}}),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            action.kind,
            ActionKind::PointerDown {
                pointer_type: PointerType::Mouse,
                button: 2,
                target: Some(ElementRef::new("x")),
            }
        );

        let action = compile(DeviceType::Pointer, json!({"type": "pointerUp", "button": 0}))
            .unwrap()
            .unwrap();
        assert!(matches!(action.kind, ActionKind::PointerUp { target: None, .. }));
    }

    #[test]
    fn pointer_button_is_required() {
        let err = compile(DeviceType::Pointer, json!({"type": "pointerDown"})).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument { ref field, .. } if field == "button"));

        let err =
            compile(DeviceType::Pointer, json!({"type": "pointerDown", "button": -3})).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument { ref field, .. } if field == "button"));
    }

    #[test]
    fn pointer_move_with_offset_is_unsupported() {
        let err = compile(
            DeviceType::Pointer,
            json!({"type": "pointerMove", "x": 10, "y": 0}),
        )
        .unwrap_err();
        assert!(matches!(err, DriverError::UnsupportedOperation(_)));

        let action = compile(
            DeviceType::Pointer,
            json!({"type": "pointerMove", "origin": {ELEMENT_KEY: "x"}, "duration": 5}),
        )
        .unwrap()
        .unwrap();
        assert!(matches!(
            action.kind,
            ActionKind::PointerMove { origin: PointerOrigin::Element(_), duration: Some(5), .. }
        ));
    }

    #[test]
    fn wheel_produces_nothing() {
        let out = compile(DeviceType::Wheel, json!({"type": "scroll", "deltaY": 5})).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn non_object_action_is_rejected() {
        let err = compile(DeviceType::Key, json!("keyDown")).unwrap_err();
        assert!(matches!(err, DriverError::InvalidArgument { ref field, .. } if field == "action"));
    }
}
