//! Interface de linha de comando do odm-dispatch baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (submit, status,
//! download, remove) e flags globais (--config, --engine-url, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// odm-dispatch: envia fotos ao NodeODM e acompanha a tarefa até o ortomosaico.
#[derive(Debug, Parser)]
#[command(name = "odm-dispatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração TOML.
    #[arg(long, global = true, default_value = "odm.toml")]
    pub config: PathBuf,

    /// URL do NodeODM; sobrepõe o arquivo e o ambiente.
    #[arg(long, global = true)]
    pub engine_url: Option<String>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cria a tarefa, envia as imagens da transação e aguarda o resultado.
    Submit {
        /// Identificador da transação (subdiretório de `image_dir`).
        transaction_id: String,

        /// Imagens por requisição de upload.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Intervalo entre consultas de status, em segundos.
        #[arg(long)]
        poll_interval: Option<u64>,
    },

    /// Mostra o status atual de uma tarefa no NodeODM.
    Status {
        /// UUID da tarefa.
        job_id: String,
    },

    /// Baixa e extrai o `all.zip` de uma tarefa concluída.
    Download {
        /// UUID da tarefa.
        job_id: String,

        /// Diretório de destino (padrão: diretório atual).
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },

    /// Remove uma tarefa do NodeODM.
    Remove {
        /// UUID da tarefa.
        job_id: String,
    },
}
