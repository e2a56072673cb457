use super::{AgentProfile, builtin_agents};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// CRUD access to the agent registry.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn list(&self) -> Vec<AgentProfile>;

    async fn get(&self, id: &str) -> Option<AgentProfile>;

    /// Insert or replace the profile with the same id.
    async fn create(&self, profile: AgentProfile) -> Result<AgentProfile>;

    /// Replace an existing profile. Returns `None` when `id` is unknown.
    async fn update(&self, id: &str, profile: AgentProfile) -> Result<Option<AgentProfile>>;

    /// Returns `false` when `id` is unknown.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Agent registry persisted as a JSON array.
pub struct JsonAgentStore {
    path: PathBuf,
    agents: RwLock<Vec<AgentProfile>>,
}

impl JsonAgentStore {
    /// Read the registry at `path`.
    ///
    /// A missing or unreadable file is replaced by the built-in agents, which
    /// are written back immediately.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let agents = match read_agents(&path) {
            Ok(Some(agents)) => agents,
            Ok(None) => {
                tracing::info!(path = %path.display(), "agent registry missing, seeding built-in agents");
                let agents = builtin_agents();
                write_agents(&path, &agents)?;
                agents
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "agent registry unreadable, reseeding built-in agents");
                let agents = builtin_agents();
                write_agents(&path, &agents)?;
                agents
            }
        };

        Ok(Self {
            path,
            agents: RwLock::new(agents),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self) -> Result<()> {
        let agents = self.agents.read().await;
        write_agents(&self.path, &agents)
    }
}

fn read_agents(path: &Path) -> Result<Option<Vec<AgentProfile>>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).context("Failed to read agent registry")?;
    let agents = serde_json::from_str(&contents).context("Failed to parse agent registry")?;
    Ok(Some(agents))
}

fn write_agents(path: &Path, agents: &[AgentProfile]) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).context("Failed to create agent registry directory")?;
    }
    let json = serde_json::to_string_pretty(agents).context("Failed to serialize agents")?;
    fs::write(path, json).context("Failed to write agent registry")?;
    Ok(())
}

#[async_trait]
impl AgentStore for JsonAgentStore {
    async fn list(&self) -> Vec<AgentProfile> {
        self.agents.read().await.clone()
    }

    async fn get(&self, id: &str) -> Option<AgentProfile> {
        self.agents.read().await.iter().find(|a| a.id == id).cloned()
    }

    async fn create(&self, profile: AgentProfile) -> Result<AgentProfile> {
        let mut agents = self.agents.write().await;
        match agents.iter_mut().find(|a| a.id == profile.id) {
            Some(existing) => *existing = profile.clone(),
            None => agents.push(profile.clone()),
        }
        write_agents(&self.path, &agents)?;
        Ok(profile)
    }

    async fn update(&self, id: &str, mut profile: AgentProfile) -> Result<Option<AgentProfile>> {
        let mut agents = self.agents.write().await;
        let Some(existing) = agents.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        profile.id = id.to_string();
        *existing = profile.clone();
        write_agents(&self.path, &agents)?;
        Ok(Some(profile))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut agents = self.agents.write().await;
        let before = agents.len();
        agents.retain(|a| a.id != id);
        if agents.len() == before {
            return Ok(false);
        }
        write_agents(&self.path, &agents)?;
        Ok(true)
    }
}
