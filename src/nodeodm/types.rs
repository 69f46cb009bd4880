//! Tipos de dados das requisições e respostas da API NodeODM.
//!
//! Os nomes de campo seguem o JSON do NodeODM (`imagesCount`,
//! `processingTime`, `errorMessage`) via `serde(rename)`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::task::TaskStatus;

/// Como as opções da tarefa são codificadas em `/task/new/init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionsEncoding {
    /// Campo multipart `options` com `application/json` contendo `[{"name", "value"}]`.
    #[default]
    Json,
    /// Campos `application/x-www-form-urlencoded`, um por opção.
    Form,
}

/// Resposta de `/task/new/init`: `uuid` em caso de sucesso, `error` caso contrário.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InitResponse {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Resposta genérica de commit e remove (`{"success": true}` ou `{"error": "..."}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AckResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Bloco `status` dentro de [`TaskInfo`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusField {
    pub code: u16,
    /// Mensagem do motor quando a tarefa falhou.
    #[serde(rename = "errorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Corpo de `/task/{uuid}/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub uuid: String,
    #[serde(default)]
    pub name: Option<String>,
    pub status: StatusField,
    #[serde(rename = "imagesCount", default)]
    pub images_count: Option<u32>,
    /// Progresso de 0 a 100.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Tempo de processamento em milissegundos.
    #[serde(rename = "processingTime", default)]
    pub processing_time: Option<i64>,
}

impl TaskInfo {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_code(self.status.code)
    }
}

/// Um arquivo já aberto para envio em um lote.
///
/// O handle é liberado quando o valor é descartado, tenha o envio dado
/// certo ou não.
#[derive(Debug)]
pub struct BatchFile {
    pub name: String,
    pub file: tokio::fs::File,
    pub len: u64,
}

impl BatchFile {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self { name, file, len })
    }
}
