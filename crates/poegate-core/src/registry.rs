// ── Port registry ──
//
// Static mapping from logical port id to switch port. Built once at
// startup and shared read-only afterwards.

use std::collections::{BTreeMap, HashMap};

use crate::error::CoreError;
use crate::model::{Port, PortId};

#[derive(Debug, Clone, Default)]
pub struct PortRegistry {
    ports: BTreeMap<PortId, Port>,
}

impl PortRegistry {
    /// Build a registry, rejecting duplicate ids and switch ports mapped twice.
    pub fn new(ports: impl IntoIterator<Item = Port>) -> Result<Self, CoreError> {
        let mut by_id = BTreeMap::new();
        let mut by_switch_port: HashMap<u32, PortId> = HashMap::new();

        for port in ports {
            if let Some(other) = by_switch_port.get(&port.switch_port) {
                return Err(CoreError::Config {
                    message: format!(
                        "switch port {} is mapped by both '{other}' and '{}'",
                        port.switch_port, port.id
                    ),
                });
            }
            if by_id.contains_key(&port.id) {
                return Err(CoreError::Config {
                    message: format!("port '{}' is defined twice", port.id),
                });
            }
            by_switch_port.insert(port.switch_port, port.id.clone());
            by_id.insert(port.id.clone(), port);
        }

        Ok(Self { ports: by_id })
    }

    pub fn get(&self, id: &PortId) -> Option<&Port> {
        self.ports.get(id)
    }

    /// Look up a port or fail with [`CoreError::UnknownPort`].
    pub fn require(&self, id: &PortId) -> Result<&Port, CoreError> {
        self.get(id)
            .ok_or_else(|| CoreError::UnknownPort { port: id.clone() })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PortId> {
        self.ports.keys()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
