//! Interlock kernel: the mediator plus the five periodic workers that make
//! up the safety core. Platform specifics stay behind the `asi-hal` traits;
//! this crate never opens a socket or a file itself.

pub mod approver;
pub mod catalog;
pub mod faults;
pub mod io;
pub mod itcom;
pub mod lifecycle;
pub mod monitor;
pub mod startup;

pub use approver::{precond_on_list, range_check, Admission, Approver};
pub use catalog::{find, ActionEntry, ACTION_CATALOG};
pub use faults::FaultManager;
pub use io::IoTask;
pub use itcom::{
    BoundedQueue, EventPush, Itcom, PendingEvent, QueuePush, Snapshot, StateMonitorRecord,
};
pub use lifecycle::Lifecycle;
pub use monitor::StatusTask;
