//! Build-time action catalog.
//!
//! The interlock only ever approves actions that appear here. Each entry
//! pins the action's precondition and its inclusive payload range; the
//! table is fixed at build time and shared by the approver and by the
//! start-up test's catalog probes.

use asi_core::PreCondition;

/// One row of the action list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionEntry {
    pub id: u16,
    pub precond: PreCondition,
    /// Inclusive lower payload bound.
    pub lo: u32,
    /// Inclusive upper payload bound.
    pub hi: u32,
}

impl ActionEntry {
    const fn new(id: u16, precond: PreCondition, lo: u32, hi: u32) -> Self {
        Self {
            id,
            precond,
            lo,
            hi,
        }
    }
}

/// The production action list. Rows with `PreCondition::Park` are only
/// approved while the fused park flag holds.
pub const ACTION_CATALOG: [ActionEntry; 12] = [
    ActionEntry::new(0x0000, PreCondition::None, 0x00, 0x04),
    ActionEntry::new(0x0001, PreCondition::None, 0x32, 0x64),
    ActionEntry::new(0x0002, PreCondition::None, 0x00, 0x04),
    ActionEntry::new(0x0003, PreCondition::Park, 0x00, 0x64),
    ActionEntry::new(0x0004, PreCondition::None, 0x00, 0x64),
    ActionEntry::new(0x0005, PreCondition::None, 0x00, 0x04),
    ActionEntry::new(0x0006, PreCondition::None, 0x00, 0x04),
    ActionEntry::new(0x0007, PreCondition::Park, 0x00, 0x01),
    ActionEntry::new(0x0008, PreCondition::None, 0x00, 0x03),
    ActionEntry::new(0x0009, PreCondition::None, 0x00, 0xF_FFFF),
    ActionEntry::new(0x000A, PreCondition::Park, 0x00, 0xFF),
    ActionEntry::new(0x07D0, PreCondition::None, 0x00, 0x04),
];

/// Look up an action id in the catalog.
pub fn find(id: u16) -> Option<&'static ActionEntry> {
    ACTION_CATALOG.iter().find(|e| e.id == id)
}
