use std::collections::HashMap;

use crate::actions::keys::{Modifier, modifier_of};
use crate::actions::{Device, DeviceType, PointerType};
use crate::engine::{ElementRef, Modifiers};
use crate::error::{DriverError, Result};

/// What the session remembers about one virtual device between commands.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeviceEntry {
    device_type: DeviceType,
    pointer_type: Option<PointerType>,
    /// Last element this pointer was over, if it targeted one.
    last_target: Option<ElementRef>,
}

/// Input state table for a session.
///
/// Device entries persist across commands; held keys and buttons are updated
/// as events are replayed so a later `release_actions` can undo them.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    devices: HashMap<String, DeviceEntry>,
    held_keys: Vec<String>,
    held_buttons: Vec<(Option<ElementRef>, u32)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the command's devices, rejecting an id that changes type or
    /// pointer type from an earlier command.
    pub fn register_devices(&mut self, devices: &[Device]) -> Result<()> {
        for device in devices {
            if let Some(entry) = self.devices.get(&device.id) {
                if entry.device_type != device.device_type {
                    return Err(DriverError::InvalidInput(format!(
                        "device '{}' was a {} device and cannot become a {} device",
                        device.id, entry.device_type, device.device_type
                    )));
                }
                if entry.pointer_type != device.pointer_type {
                    return Err(DriverError::InvalidInput(format!(
                        "device '{}' cannot change its pointerType",
                        device.id
                    )));
                }
            }
        }
        for device in devices {
            self.devices
                .entry(device.id.clone())
                .or_insert_with(|| DeviceEntry {
                    device_type: device.device_type,
                    pointer_type: device.pointer_type,
                    last_target: None,
                });
        }
        Ok(())
    }

    pub fn last_target(&self, device_id: &str) -> Option<&ElementRef> {
        self.devices.get(device_id)?.last_target.as_ref()
    }

    pub fn set_last_target(&mut self, device_id: &str, target: Option<ElementRef>) {
        if let Some(entry) = self.devices.get_mut(device_id) {
            entry.last_target = target;
        }
    }

    /// Modifiers implied by the keys currently held.
    pub fn modifiers(&self) -> Modifiers {
        let mut mods = Modifiers::default();
        for key in &self.held_keys {
            match modifier_of(key) {
                Some(Modifier::Shift) => mods.shift = true,
                Some(Modifier::Control) => mods.ctrl = true,
                Some(Modifier::Alt) => mods.alt = true,
                Some(Modifier::Meta) => mods.meta = true,
                None => {}
            }
        }
        mods
    }

    pub fn key_pressed(&mut self, key: &str) {
        if !self.held_keys.iter().any(|k| k == key) {
            self.held_keys.push(key.to_string());
        }
    }

    pub fn key_released(&mut self, key: &str) {
        self.held_keys.retain(|k| k != key);
    }

    pub fn button_pressed(&mut self, target: Option<&ElementRef>, button: u32) {
        if !self.held_buttons.iter().any(|(_, b)| *b == button) {
            self.held_buttons.push((target.cloned(), button));
        }
    }

    pub fn button_released(&mut self, button: u32) {
        self.held_buttons.retain(|(_, b)| *b != button);
    }

    pub fn held_keys(&self) -> &[String] {
        &self.held_keys
    }

    pub fn held_buttons(&self) -> &[(Option<ElementRef>, u32)] {
        &self.held_buttons
    }

    /// Forget every device and held input.
    pub fn reset(&mut self) {
        self.devices.clear();
        self.held_keys.clear();
        self.held_buttons.clear();
    }
}
