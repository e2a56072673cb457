pub mod approval;

pub use approval::{
    ApprovalBroker, ApprovalDecision, ApprovalHub, ApprovalRecord, ApprovalStatus,
    AutoApproveBroker, CheckpointRequest, CliApprovalBroker, broker_for_mode,
};
