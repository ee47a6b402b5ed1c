pub mod dispatcher;
pub mod kind;
pub mod ledger;
pub mod names;
pub mod report;
pub mod resolver;
pub mod selector;
pub mod waiter;

pub use dispatcher::{
    RESTARTED_AT_ANNOTATION, RestartDispatcher, RestartOutcome,
};
pub use kind::ResourceKind;
pub use ledger::{LedgerKey, RestartLedger};
pub use report::{PodError, RunReport};
pub use resolver::OwnershipResolver;
pub use selector::select_targets;
pub use waiter::{ReadinessWaiter, WaitOutcome};
