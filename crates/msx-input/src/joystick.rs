/// Joystick registry.
///
/// Maps platform instance ids (which grow on every reconnect) to stable
/// 1-based joystick numbers and holds the per-joystick dead zone.
use std::collections::BTreeMap;

use log::info;
use msx_config::{DEFAULT_DEAD_ZONE, InputConfig};
use msx_events::JoystickId;

/// Full-scale magnitude of a joystick axis.
pub const AXIS_RANGE: i32 = 32768;

#[derive(Debug, Clone)]
pub struct JoystickManager {
    /// Index `n` holds the instance id bound to joystick `n + 1`.
    slots: Vec<Option<u32>>,
    dead_zones: BTreeMap<u32, u8>,
    default_dead_zone: u8,
}

impl JoystickManager {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            dead_zones: BTreeMap::new(),
            default_dead_zone: DEFAULT_DEAD_ZONE,
        }
    }

    /// Bind `instance_id` to the lowest free joystick number.
    ///
    /// Adding an already known instance returns its current number.
    pub fn add(&mut self, instance_id: u32) -> JoystickId {
        if let Some(id) = self.translate(instance_id) {
            return id;
        }
        let index = match self.slots.iter().position(Option::is_none) {
            Some(free) => {
                self.slots[free] = Some(instance_id);
                free
            }
            None => {
                self.slots.push(Some(instance_id));
                self.slots.len() - 1
            }
        };
        let id = JoystickId(index as u32 + 1);
        info!("{id} connected (instance {instance_id})");
        id
    }

    pub fn remove(&mut self, instance_id: u32) -> Option<JoystickId> {
        let index = self.slots.iter().position(|s| *s == Some(instance_id))?;
        self.slots[index] = None;
        while self.slots.last().is_some_and(Option::is_none) {
            self.slots.pop();
        }
        let id = JoystickId(index as u32 + 1);
        info!("{id} disconnected (instance {instance_id})");
        Some(id)
    }

    /// Joystick number of a platform instance, if registered.
    pub fn translate(&self, instance_id: u32) -> Option<JoystickId> {
        self.slots
            .iter()
            .position(|s| *s == Some(instance_id))
            .map(|index| JoystickId(index as u32 + 1))
    }

    pub fn connected(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Dead zone of `id`, percent of the full axis range.
    pub fn dead_zone(&self, id: JoystickId) -> u8 {
        self.dead_zones
            .get(&id.0)
            .copied()
            .unwrap_or(self.default_dead_zone)
    }

    pub fn set_dead_zone(&mut self, id: JoystickId, percent: u8) {
        self.dead_zones.insert(id.0, percent.min(100));
    }

    pub fn set_default_dead_zone(&mut self, percent: u8) {
        self.default_dead_zone = percent.min(100);
    }

    /// Axis magnitude that has to be exceeded to count as deflected.
    pub fn axis_threshold(&self, id: JoystickId) -> i32 {
        i32::from(self.dead_zone(id)) * AXIS_RANGE / 100
    }

    /// `value` with the dead zone of `id` applied: 0 inside the zone,
    /// unchanged outside.
    pub fn filter_axis(&self, id: JoystickId, value: i16) -> i32 {
        let threshold = self.axis_threshold(id);
        let value = i32::from(value);
        if value < -threshold || value > threshold {
            value
        } else {
            0
        }
    }

    pub fn apply_config(&mut self, config: &InputConfig) {
        self.set_default_dead_zone(config.default_dead_zone);
        self.dead_zones = config
            .joystick_dead_zones
            .iter()
            .map(|(&id, &zone)| (id, zone.min(100)))
            .collect();
    }
}

impl Default for JoystickManager {
    fn default() -> Self {
        Self::new()
    }
}
