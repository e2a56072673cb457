mod dag_contract;
mod llm;
mod parser;
mod types;

pub use dag_contract::{DagContract, DagEdge, DanglingDependency};
pub use llm::{LlmPlanner, PlanRequest, Planner};
pub use parser::PlanParser;
pub use types::{InputModality, Plan, PlanStep};
