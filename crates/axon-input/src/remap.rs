//! Bind and port remapping.
//!
//! Remaps sit between physical bind evaluation and the core-visible bind
//! ids: each port carries a button table redirecting (or suppressing) bind
//! ids and a key table injecting keyboard keys, and `remap_ports` reassigns
//! whole physical ports to virtual ports. The derived port map answers the
//! reverse question the aggregator asks every query: which physical ports
//! feed this virtual port.

use axon_types::binds::BindId;
use axon_types::keys::Key;
use axon_types::MAX_PORTS;

/// Where a remapped bind slot points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapTarget {
    /// Redirect to this bind. `Bind(slot)` is the identity mapping.
    Bind(BindId),
    /// Swallow the input entirely.
    Unmapped,
}

/// Button and key remaps for one port.
#[derive(Debug, Clone)]
struct PortRemap {
    buttons: [RemapTarget; BindId::COUNT],
    keys: [Key; BindId::COUNT],
}

impl PortRemap {
    fn identity() -> PortRemap {
        PortRemap {
            buttons: std::array::from_fn(|i| match BindId::from_index(i) {
                Some(id) => RemapTarget::Bind(id),
                None => RemapTarget::Unmapped,
            }),
            keys: [Key::None; BindId::COUNT],
        }
    }
}

/// One virtual port's physical members, fixed-size with an explicit length.
#[derive(Debug, Clone, Copy)]
struct PortRow {
    phys: [usize; MAX_PORTS],
    len: usize,
}

impl PortRow {
    const EMPTY: PortRow = PortRow { phys: [MAX_PORTS; MAX_PORTS], len: 0 };

    fn push(&mut self, physical: usize) {
        if self.len < MAX_PORTS {
            self.phys[self.len] = physical;
            self.len += 1;
        }
    }

    fn as_slice(&self) -> &[usize] {
        &self.phys[..self.len]
    }
}

/// All remap state: per-port tables, the port assignment, and its
/// derived reverse map.
#[derive(Debug, Clone)]
pub struct RemapTables {
    ports: Vec<PortRemap>,
    remap_ports: [usize; MAX_PORTS],
    port_map: [PortRow; MAX_PORTS],
}

impl Default for RemapTables {
    fn default() -> RemapTables {
        RemapTables::new()
    }
}

impl RemapTables {
    /// Identity tables: every bind maps to itself, every physical port
    /// feeds the virtual port of the same index.
    pub fn new() -> RemapTables {
        let mut tables = RemapTables {
            ports: (0..MAX_PORTS).map(|_| PortRemap::identity()).collect(),
            remap_ports: std::array::from_fn(|i| i),
            port_map: [PortRow::EMPTY; MAX_PORTS],
        };
        tables.rebuild_port_map();
        tables
    }

    /// The bind a physical slot drives on this port, `None` when the slot
    /// is suppressed. Out-of-range ports behave as identity.
    pub fn resolve(&self, port: usize, id: BindId) -> Option<BindId> {
        match self.ports.get(port) {
            Some(remap) => match remap.buttons[id.index()] {
                RemapTarget::Bind(target) => Some(target),
                RemapTarget::Unmapped => None,
            },
            None => Some(id),
        }
    }

    /// The keyboard key a bind injects on this port, `Key::None` when it
    /// injects nothing.
    pub fn key_for(&self, port: usize, id: BindId) -> Key {
        self.ports
            .get(port)
            .map(|remap| remap.keys[id.index()])
            .unwrap_or(Key::None)
    }

    /// Redirect one bind slot. Out-of-range ports are ignored.
    pub fn set_button(&mut self, port: usize, slot: BindId, target: RemapTarget) {
        if let Some(remap) = self.ports.get_mut(port) {
            remap.buttons[slot.index()] = target;
        }
    }

    /// Attach a keyboard key to a bind slot.
    pub fn set_key(&mut self, port: usize, slot: BindId, key: Key) {
        if let Some(remap) = self.ports.get_mut(port) {
            remap.keys[slot.index()] = key;
        }
    }

    /// Restore one port's tables to identity.
    pub fn reset_port(&mut self, port: usize) {
        if let Some(remap) = self.ports.get_mut(port) {
            *remap = PortRemap::identity();
        }
    }

    /// Current physical-to-virtual assignment.
    pub fn remap_ports(&self) -> &[usize; MAX_PORTS] {
        &self.remap_ports
    }

    /// Assign a physical port to a virtual port. `MAX_PORTS` detaches the
    /// physical port from every virtual port.
    pub fn set_remap_port(&mut self, physical: usize, virtual_port: usize) {
        if physical >= MAX_PORTS {
            return;
        }
        self.remap_ports[physical] = virtual_port;
        self.rebuild_port_map();
    }

    /// Replace the whole assignment at once.
    pub fn set_remap_ports(&mut self, assignment: [usize; MAX_PORTS]) {
        self.remap_ports = assignment;
        self.rebuild_port_map();
    }

    /// Physical ports feeding a virtual port, in physical order.
    pub fn physical_ports(&self, virtual_port: usize) -> &[usize] {
        match self.port_map.get(virtual_port) {
            Some(row) => row.as_slice(),
            None => &[],
        }
    }

    /// Rebuild the reverse map from scratch. Idempotent.
    fn rebuild_port_map(&mut self) {
        self.port_map = [PortRow::EMPTY; MAX_PORTS];
        for physical in 0..MAX_PORTS {
            let virtual_port = self.remap_ports[physical];
            if virtual_port < MAX_PORTS {
                self.port_map[virtual_port].push(physical);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_types::binds::BIND_TABLE;
    use proptest::prelude::*;

    #[test]
    fn identity_by_default() {
        let tables = RemapTables::new();
        for port in 0..MAX_PORTS {
            for desc in BIND_TABLE {
                assert_eq!(tables.resolve(port, desc.id), Some(desc.id));
            }
            assert_eq!(tables.physical_ports(port), &[port]);
        }
    }

    #[test]
    fn out_of_range_port_behaves_as_identity() {
        let tables = RemapTables::new();
        assert_eq!(tables.resolve(MAX_PORTS + 3, BindId::A), Some(BindId::A));
        assert_eq!(tables.key_for(MAX_PORTS + 3, BindId::A), Key::None);
        assert!(tables.physical_ports(MAX_PORTS + 3).is_empty());
    }

    #[test]
    fn swapped_buttons_resolve_crosswise() {
        let mut tables = RemapTables::new();
        tables.set_button(0, BindId::A, RemapTarget::Bind(BindId::B));
        tables.set_button(0, BindId::B, RemapTarget::Bind(BindId::A));
        assert_eq!(tables.resolve(0, BindId::A), Some(BindId::B));
        assert_eq!(tables.resolve(0, BindId::B), Some(BindId::A));
        assert_eq!(tables.resolve(1, BindId::A), Some(BindId::A));
    }

    #[test]
    fn unmapped_slot_is_suppressed() {
        let mut tables = RemapTables::new();
        tables.set_button(0, BindId::L2, RemapTarget::Unmapped);
        assert_eq!(tables.resolve(0, BindId::L2), None);
        tables.reset_port(0);
        assert_eq!(tables.resolve(0, BindId::L2), Some(BindId::L2));
    }

    #[test]
    fn key_injection_round_trip() {
        let mut tables = RemapTables::new();
        assert_eq!(tables.key_for(0, BindId::Start), Key::None);
        tables.set_key(0, BindId::Start, Key::Return);
        assert_eq!(tables.key_for(0, BindId::Start), Key::Return);
        assert_eq!(tables.key_for(1, BindId::Start), Key::None);
    }

    #[test]
    fn port_map_reindex_example() {
        let mut tables = RemapTables::new();
        let mut assignment = [MAX_PORTS; MAX_PORTS];
        assignment[0] = 0;
        assignment[1] = 0;
        assignment[2] = 1;
        tables.set_remap_ports(assignment);

        assert_eq!(tables.physical_ports(0), &[0, 1]);
        assert_eq!(tables.physical_ports(1), &[2]);
        assert!(tables.physical_ports(2).is_empty());
    }

    #[test]
    fn detached_port_feeds_nothing() {
        let mut tables = RemapTables::new();
        tables.set_remap_port(0, MAX_PORTS);
        for virtual_port in 0..MAX_PORTS {
            assert!(!tables.physical_ports(virtual_port).contains(&0));
        }
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut tables = RemapTables::new();
        tables.set_remap_port(3, 1);
        let before: Vec<Vec<usize>> =
            (0..MAX_PORTS).map(|v| tables.physical_ports(v).to_vec()).collect();
        tables.rebuild_port_map();
        let after: Vec<Vec<usize>> =
            (0..MAX_PORTS).map(|v| tables.physical_ports(v).to_vec()).collect();
        assert_eq!(before, after);
    }

    proptest! {
        #[test]
        fn port_map_partitions_assigned_ports(
            assignment in proptest::array::uniform8(0..=MAX_PORTS)
        ) {
            let mut tables = RemapTables::new();
            tables.set_remap_ports(assignment);

            for physical in 0..MAX_PORTS {
                let virtual_port = assignment[physical];
                let appearances: usize = (0..MAX_PORTS)
                    .map(|v| {
                        tables
                            .physical_ports(v)
                            .iter()
                            .filter(|p| **p == physical)
                            .count()
                    })
                    .sum();
                if virtual_port < MAX_PORTS {
                    prop_assert_eq!(appearances, 1);
                    prop_assert!(tables.physical_ports(virtual_port).contains(&physical));
                } else {
                    prop_assert_eq!(appearances, 0);
                }
            }
        }
    }
}
