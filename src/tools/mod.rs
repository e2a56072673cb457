pub mod arxiv;
pub mod factory;
pub mod proposal;
pub mod registry;
pub mod traits;
pub mod wikipedia;

pub use arxiv::{ArxivClient, ArxivSearchTool, ArxivSummarizeTool};
pub use factory::{registry_for_agents, research_http_client, research_tools};
pub use proposal::{GenerateProposalTool, OutlineMethodologyTool};
pub use registry::{ToolRegistry, normalize_action};
pub use traits::{InputBinding, ReferenceKind, Tool, ToolSpec, optional_arg, required_arg, value_text};
pub use wikipedia::{WikiSearchTool, WikiSummarizeTool};
