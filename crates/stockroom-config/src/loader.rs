use std::path::Path;

use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`], minus the file read
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        tracing::debug!(
            base_url = %config.proxy.base_url,
            model = %config.llm.model,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_proxy()?;
        self.validate_llm()?;
        self.validate_images()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_proxy(&self) -> anyhow::Result<()> {
        if self.proxy.api_key.expose_secret().trim().is_empty() {
            anyhow::bail!("proxy.api_key must not be empty");
        }

        if self.proxy.api_key_header.trim().is_empty() {
            anyhow::bail!("proxy.api_key_header must not be empty");
        }

        self.proxy.connect_timeout()?;

        Ok(())
    }

    fn validate_llm(&self) -> anyhow::Result<()> {
        if self.llm.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }

        if !self.llm.chat_path.starts_with('/') {
            anyhow::bail!("llm.chat_path must start with '/': {}", self.llm.chat_path);
        }

        if let Some(temperature) = self.llm.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            anyhow::bail!("llm.temperature must be between 0.0 and 2.0, got {temperature}");
        }

        Ok(())
    }

    fn validate_images(&self) -> anyhow::Result<()> {
        if !(1..=100).contains(&self.images.page_size) {
            anyhow::bail!("images.page_size must be between 1 and 100, got {}", self.images.page_size);
        }

        if self.images.destination_address.trim().is_empty() {
            anyhow::bail!("images.destination_address must not be empty");
        }

        Ok(())
    }

    fn validate_telemetry(&self) -> anyhow::Result<()> {
        let Some(ref telemetry) = self.telemetry else {
            return Ok(());
        };

        if !(0.0..=1.0).contains(&telemetry.sampling_rate) {
            anyhow::bail!(
                "telemetry.sampling_rate must be between 0.0 and 1.0, got {}",
                telemetry.sampling_rate
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::{Config, ToolCallMode};

    const MINIMAL: &str = r#"
        [proxy]
        api_key = "sk-test"
    "#;

    #[test]
    fn minimal_config_loads() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.llm.model, "openai/chatgpt-4o-latest");
        assert_eq!(config.images.page_size, 10);
        assert!(!config.images.tos_confirmation);
        assert_eq!(config.agent.max_purchase_without_confirmation, 5);
        assert!(config.telemetry.is_none());
    }

    #[test]
    fn full_config_loads() {
        let raw = r#"
            [proxy]
            base_url = "http://localhost:8080"
            api_key = "sk-test"
            connect_timeout = "2s"

            [llm]
            model = "gpt-4o"
            chat_path = "/proxy/openai/v1/chat/completions"
            tool_calls = "per_fragment"
            temperature = 0.3

            [images]
            page_size = 24
            tos_confirmation = true
            user_email = "buyer@example.com"

            [agent]
            max_purchase_without_confirmation = 2

            [telemetry]
            log_filter = "debug"
            sampling_rate = 0.5

            [telemetry.exporter]
            endpoint = "http://localhost:4317"
        "#;

        let config = Config::parse(raw).unwrap();
        assert_eq!(config.llm.tool_calls, ToolCallMode::PerFragment);
        assert_eq!(config.images.page_size, 24);
        assert_eq!(config.agent.max_purchase_without_confirmation, 2);
        let telemetry = config.telemetry.unwrap();
        assert_eq!(telemetry.log_filter, "debug");
        assert!(telemetry.exporter.is_some());
    }

    #[test]
    fn missing_proxy_section_fails() {
        assert!(Config::parse("[llm]\nmodel = \"gpt-4o\"").is_err());
    }

    #[test]
    fn blank_api_key_fails() {
        let err = Config::parse("[proxy]\napi_key = \"  \"").unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn relative_chat_path_fails() {
        let raw = "[proxy]\napi_key = \"k\"\n[llm]\nchat_path = \"v1/chat\"";
        let err = Config::parse(raw).unwrap_err();
        assert!(err.to_string().contains("chat_path"));
    }

    #[test]
    fn page_size_bounds_enforced() {
        let raw = "[proxy]\napi_key = \"k\"\n[images]\npage_size = 0";
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn sampling_rate_bounds_enforced() {
        let raw = "[proxy]\napi_key = \"k\"\n[telemetry]\nsampling_rate = 1.5";
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn api_key_from_environment() {
        temp_env::with_var("STOCKROOM_LOADER_KEY", Some("sk-env"), || {
            let raw = "[proxy]\napi_key = \"{{ env.STOCKROOM_LOADER_KEY }}\"";
            let config = Config::parse(raw).unwrap();
            assert_eq!(secrecy::ExposeSecret::expose_secret(&config.proxy.api_key), "sk-env");
        });
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.proxy.api_key_header, "skyfire-api-key");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(std::path::Path::new("/nonexistent/stockroom.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
