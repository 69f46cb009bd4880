//! Tipos de erro para o cliente da API NodeODM.
//!
//! Toda falha carrega a [`Operation`] em que ocorreu, para que os logs do
//! orquestrador digam qual chamada remota quebrou sem precisar de contexto
//! extra. Nenhuma variante é retentada automaticamente.

use std::fmt;

use thiserror::Error;

/// Operação remota do NodeODM que originou uma falha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Upload,
    Commit,
    Info,
    Download,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Upload => write!(f, "upload"),
            Operation::Commit => write!(f, "commit"),
            Operation::Info => write!(f, "info"),
            Operation::Download => write!(f, "download"),
            Operation::Remove => write!(f, "remove"),
        }
    }
}

/// Erros que podem ocorrer ao interagir com o NodeODM.
///
/// - [`Remote`](NodeOdmError::Remote): resposta não-2xx, ou 2xx com campo `error`
/// - [`Transport`](NodeOdmError::Transport): falha de rede (DNS, conexão, timeout)
/// - [`Decode`](NodeOdmError::Decode): corpo da resposta ilegível
/// - [`Io`](NodeOdmError::Io): falha ao gravar um download no disco local
#[derive(Debug, Error)]
pub enum NodeOdmError {
    /// O motor recusou a chamada. `body` contém o corpo bruto ou a mensagem de erro.
    #[error("{operation} returned status {status}: {body}")]
    Remote {
        operation: Operation,
        status: u16,
        body: String,
    },

    #[error("{operation} request failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} response could not be parsed: {message}")]
    Decode { operation: Operation, message: String },

    #[error("{operation} local I/O failed: {source}")]
    Io {
        operation: Operation,
        #[source]
        source: std::io::Error,
    },
}

impl NodeOdmError {
    pub fn operation(&self) -> Operation {
        match self {
            NodeOdmError::Remote { operation, .. }
            | NodeOdmError::Transport { operation, .. }
            | NodeOdmError::Decode { operation, .. }
            | NodeOdmError::Io { operation, .. } => *operation,
        }
    }

    /// Código HTTP quando o motor chegou a responder.
    pub fn status(&self) -> Option<u16> {
        match self {
            NodeOdmError::Remote { status, .. } => Some(*status),
            NodeOdmError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            NodeOdmError::Decode { .. } | NodeOdmError::Io { .. } => None,
        }
    }
}
