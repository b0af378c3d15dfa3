//! Transaction submission: allowance management and shape execution

mod approval;
mod executor;

pub use approval::{ApprovalManager, ApprovalOutcome};
pub use executor::{build_call, ExecutionOrder, TransactionExecutor, TransactionRecord, TxStatus};
