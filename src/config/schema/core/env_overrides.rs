use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) =
            std::env::var("AGENTFLOW_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
            && !key.is_empty()
        {
            self.api_key = Some(key);
        }

        if let Ok(base) = std::env::var("AGENTFLOW_API_BASE")
            && !base.is_empty()
        {
            self.api_base_url = base;
        }

        if let Ok(model) = std::env::var("AGENTFLOW_MODEL")
            && !model.is_empty()
        {
            self.default_model = model;
        }

        if let Ok(port_str) =
            std::env::var("AGENTFLOW_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(host) =
            std::env::var("AGENTFLOW_GATEWAY_HOST").or_else(|_| std::env::var("HOST"))
            && !host.is_empty()
        {
            self.gateway.host = host;
        }
    }
}
