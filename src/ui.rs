//! Interface de terminal do odm-dispatch: spinner e saída colorida.
//!
//! Usa `indicatif` para o spinner enquanto as tarefas rodam no NodeODM e
//! `console` para estilizar os resultados. Os eventos detalhados de cada
//! tarefa saem pelo `tracing`; aqui fica só o que o usuário precisa ler.

use std::path::Path;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use odm_dispatch::collector::CollectSummary;
use odm_dispatch::nodeodm::TaskInfo;
use odm_dispatch::{JobId, SubmitError, TaskStatus};

/// Estilos usados nas mensagens finais.
pub struct Ui {
    green: Style,
    red: Style,
    yellow: Style,
}

impl Ui {
    pub fn new() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    pub fn submitted(&self, job_id: &JobId, transaction_id: &str) {
        println!(
            "  {} Task {job_id} committed for transaction {transaction_id}",
            self.green.apply_to("✓")
        );
    }

    pub fn rejected(&self, err: &SubmitError) {
        eprintln!("  {} {}: {err}", self.red.apply_to("✗"), err.kind());
    }

    /// Exibe o status da tarefa com a cor do estado.
    pub fn task_info(&self, info: &TaskInfo) {
        let status = info.status();
        let style = match status {
            TaskStatus::Completed => &self.green,
            TaskStatus::Failed | TaskStatus::Canceled | TaskStatus::Unknown(_) => &self.red,
            TaskStatus::Queued | TaskStatus::Running => &self.yellow,
        };
        println!("{}  {}", info.uuid, style.apply_to(status));
        if let Some(name) = &info.name {
            println!("  name:      {name}");
        }
        if let Some(progress) = info.progress {
            println!("  progress:  {progress:.1}%");
        }
        if let Some(images) = info.images_count {
            println!("  images:    {images}");
        }
        if let Some(ms) = info.processing_time {
            println!("  elapsed:   {}s", ms / 1000);
        }
        if let Some(message) = &info.status.error_message {
            println!("  error:     {}", self.red.apply_to(message));
        }
    }

    pub fn collected(&self, summary: &CollectSummary, dest: &Path) {
        println!(
            "  {} {} entries ({} bytes) extracted into {}",
            self.green.apply_to("✓"),
            summary.entries,
            summary.archive_bytes,
            dest.display()
        );
    }

    pub fn removed(&self, job_id: &JobId) {
        println!("  {} Task {job_id} removed", self.green.apply_to("✓"));
    }

    pub fn interrupted(&self) {
        eprintln!(
            "  {} Interrupted, cancelling pending polls",
            self.yellow.apply_to("↻")
        );
    }
}

/// Spinner exibido enquanto o processo aguarda as tarefas em segundo plano.
pub struct WaitSpinner {
    pb: ProgressBar,
}

impl WaitSpinner {
    pub fn start(message: String) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} [{elapsed}]")
                .expect("invalid template"),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}
