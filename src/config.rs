//! Configuração do despachante carregada a partir de `odm.toml`.
//!
//! A struct [`OdmConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `NODEODM_ENDPOINT`, `NODEODM_TOKEN` e `IMAGE_DIR`
//! têm precedência sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::nodeodm::OptionsEncoding;
use crate::task::TaskOptions;
use crate::upload::DEFAULT_BATCH_SIZE;

pub const DEFAULT_CONFIG_PATH: &str = "odm.toml";

/// Configuração de nível superior carregada de `odm.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct OdmConfig {
    /// URL base do NodeODM, ex.: `http://localhost:3000`.
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// Token de acesso do NodeODM, enviado como `?token=`.
    #[serde(default)]
    pub token: Option<String>,

    /// Diretório raiz; cada transação tem um subdiretório com suas imagens.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Quantidade de imagens por requisição de upload.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Intervalo entre consultas de status, em segundos.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Formato das opções enviadas na criação da tarefa.
    #[serde(default)]
    pub options_encoding: OptionsEncoding,

    /// Opções repassadas ao NodeODM, na ordem do arquivo.
    #[serde(default = "TaskOptions::orthophoto_defaults")]
    pub task_options: TaskOptions,
}

// Valor padrão da URL do motor: NodeODM local na porta 3000.
fn default_engine_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

// Valor padrão do intervalo de polling: 60s.
fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for OdmConfig {
    fn default() -> Self {
        Self {
            engine_url: default_engine_url(),
            token: None,
            image_dir: default_image_dir(),
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval_secs(),
            options_encoding: OptionsEncoding::default(),
            task_options: TaskOptions::orthophoto_defaults(),
        }
    }
}

impl OdmConfig {
    /// Carrega a configuração de `odm.toml` no diretório atual.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Carrega a configuração de `path`, aplica as variáveis de ambiente e valida.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<OdmConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Aplica sobreposições vindas de `lookup` (normalmente o ambiente).
    /// Valores vazios são ignorados.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("NODEODM_ENDPOINT")
            && !url.is_empty()
        {
            self.engine_url = url;
        }
        if let Some(token) = lookup("NODEODM_TOKEN")
            && !token.is_empty()
        {
            self.token = Some(token);
        }
        if let Some(dir) = lookup("IMAGE_DIR")
            && !dir.is_empty()
        {
            self.image_dir = PathBuf::from(dir);
        }
        self.token = self.token.take().filter(|t| !t.is_empty());
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine_url.trim().is_empty() {
            return Err(ConfigError::MissingEngineUrl);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = OdmConfig::default();
        assert_eq!(config.engine_url, "http://localhost:3000");
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.options_encoding, OptionsEncoding::Json);
        assert_eq!(config.task_options, TaskOptions::orthophoto_defaults());
        assert!(config.token.is_none());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            engine_url = "http://odm.internal:4000"
            batch_size = 50
            options_encoding = "form"

            [[task_options]]
            name = "dsm"
            value = true

            [[task_options]]
            name = "orthophoto-resolution"
            value = 2.5
        "#;
        let config: OdmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine_url, "http://odm.internal:4000");
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.options_encoding, OptionsEncoding::Form);
        assert_eq!(
            config.task_options,
            TaskOptions::new()
                .with("dsm", true)
                .with("orthophoto-resolution", 2.5)
        );
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = OdmConfig::default();
        config.apply_overrides(|key| match key {
            "NODEODM_ENDPOINT" => Some("http://10.0.0.5:3000".into()),
            "NODEODM_TOKEN" => Some("s3cret".into()),
            "IMAGE_DIR" => Some("/srv/images".into()),
            _ => None,
        });
        assert_eq!(config.engine_url, "http://10.0.0.5:3000");
        assert_eq!(config.token.as_deref(), Some("s3cret"));
        assert_eq!(config.image_dir, PathBuf::from("/srv/images"));
    }

    #[test]
    fn empty_overrides_are_ignored() {
        let mut config = OdmConfig {
            token: Some(String::new()),
            ..OdmConfig::default()
        };
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.engine_url, "http://localhost:3000");
        assert!(config.token.is_none());
    }

    #[test]
    fn validate_rejects_zero_values() {
        let config = OdmConfig {
            batch_size: 0,
            ..OdmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));

        let config = OdmConfig {
            poll_interval_secs: 0,
            ..OdmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));

        let config = OdmConfig {
            engine_url: " ".into(),
            ..OdmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingEngineUrl));
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = OdmConfig::load_from(&dir.path().join("odm.toml")).unwrap();
        assert_eq!(config.batch_size, 20);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odm.toml");
        std::fs::write(&path, "batch_size = 7\npoll_interval_secs = 5\n").unwrap();
        let config = OdmConfig::load_from(&path).unwrap();
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }
}
