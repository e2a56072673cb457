use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `AgentFlow`.
///
/// Library callers can match on these to pick an HTTP status or exit code;
/// internal code keeps using `anyhow::Result` for context chains.
#[derive(Debug, Error)]
pub enum FlowError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Plan ─────────────────────────────────────────────────────────────
    #[error("plan: {0}")]
    Plan(#[from] PlanError),

    // ── LLM / Provider ──────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Tools ───────────────────────────────────────────────────────────
    #[error("tool: {0}")]
    Tool(#[from] ToolError),

    // ── Execution ───────────────────────────────────────────────────────
    #[error("execution: {0}")]
    Execution(#[from] ExecutionError),

    // ── Approval ────────────────────────────────────────────────────────
    #[error("approval: {0}")]
    Approval(#[from] ApprovalError),

    // ── Agent store ─────────────────────────────────────────────────────
    #[error("agent store: {0}")]
    AgentStore(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Plan errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid plan JSON: {0}")]
    Parse(String),

    #[error("planner reply contained no JSON object")]
    MissingJson,

    #[error("duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("step id cannot be empty")]
    EmptyStepId,
}

// ─── LLM / Provider errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider {provider} authentication failed")]
    Auth { provider: String },

    #[error("provider {provider} returned an empty completion")]
    EmptyCompletion { provider: String },
}

// ─── Tool errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool {name} is missing required parameter '{parameter}'")]
    MissingParameter { name: String, parameter: String },

    #[error("tool {name} request failed: {message}")]
    Request { name: String, message: String },

    #[error("tool {name} received a malformed response: {message}")]
    MalformedResponse { name: String, message: String },
}

// ─── Execution errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("event consumer disconnected")]
    Disconnected,

    #[error("step {step_id} worker failed: {message}")]
    Worker { step_id: String, message: String },
}

// ─── Approval errors ────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("no checkpoint is awaiting approval for step {0}")]
    NotFound(String),

    #[error("step {step_id} is awaiting approval in several tasks ({}); pass taskId", task_ids.join(", "))]
    Ambiguous {
        step_id: String,
        task_ids: Vec<String>,
    },
}

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, FlowError>;
