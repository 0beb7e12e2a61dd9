use std::collections::HashSet;

use tracing::trace;

use super::compiler::compile_action;
use super::model::{Action, Device, DeviceType, PointerType};
use super::raw::ActionSequence;
use crate::error::{DriverError, Result};

/// All devices' actions at one synchronization point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub index: usize,
    pub actions: Vec<Action>,
}

impl Tick {
    /// Longest pause requested by any device in this tick.
    pub fn pause(&self) -> u64 {
        self.actions
            .iter()
            .filter_map(Action::pause_duration)
            .max()
            .unwrap_or(0)
    }
}

/// Actions-by-tick for one command, plus the devices that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickMatrix {
    pub devices: Vec<Device>,
    pub ticks: Vec<Tick>,
}

impl TickMatrix {
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

/// Resolve devices, then compile every action into tick order.
///
/// Tick `i` holds the `i`-th action of every device, in device order. The
/// whole command is compiled before anything is returned, so a single bad
/// action rejects the command without side effects.
pub fn extract_action_sequence(sequences: &[ActionSequence]) -> Result<TickMatrix> {
    let devices = resolve_devices(sequences)?;

    let tick_count = sequences.first().map_or(0, |s| s.actions.len());
    if let Some(seq) = sequences.iter().find(|s| s.actions.len() != tick_count) {
        return Err(DriverError::InvalidInput(format!(
            "device '{}' has {} actions but device '{}' has {}",
            seq.id,
            seq.actions.len(),
            sequences[0].id,
            tick_count
        )));
    }

    let mut ticks = Vec::with_capacity(tick_count);
    for index in 0..tick_count {
        let mut actions = Vec::with_capacity(devices.len());
        for (device, seq) in devices.iter().zip(sequences) {
            if let Some(action) = compile_action(device, index, &seq.actions[index])? {
                actions.push(action);
            }
        }
        ticks.push(Tick { index, actions });
    }

    trace!(
        target: "pagepilot::actions",
        devices = devices.len(), ticks = ticks.len(),
        "extracted action sequence"
    );
    Ok(TickMatrix { devices, ticks })
}

fn resolve_devices(sequences: &[ActionSequence]) -> Result<Vec<Device>> {
    let mut seen = HashSet::with_capacity(sequences.len());
    sequences
        .iter()
        .map(|seq| {
            if !seen.insert(seq.id.as_str()) {
                return Err(DriverError::InvalidInput(format!(
                    "device id '{}' appears more than once",
                    seq.id
                )));
            }
            let device_type = DeviceType::parse(&seq.device_type).ok_or_else(|| {
                DriverError::InvalidInput(format!(
                    "device '{}' has unknown type '{}'",
                    seq.id, seq.device_type
                ))
            })?;
            let pointer_type = match device_type {
                DeviceType::Pointer => Some(resolve_pointer_type(seq)?),
                _ => None,
            };
            Ok(Device {
                id: seq.id.clone(),
                device_type,
                pointer_type,
            })
        })
        .collect()
}

fn resolve_pointer_type(seq: &ActionSequence) -> Result<PointerType> {
    let raw = seq
        .parameters
        .as_ref()
        .and_then(|p| p.pointer_type.as_deref());
    match raw {
        None => Ok(PointerType::Mouse),
        Some(raw) => PointerType::parse(raw).ok_or_else(|| {
            DriverError::InvalidInput(format!(
                "device '{}' has unknown pointerType '{raw}'",
                seq.id
            ))
        }),
    }
}
