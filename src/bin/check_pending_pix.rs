// src/bin/check_pending_pix.rs
//
// Verifica os PIX pendentes no provedor e confirma os que já foram pagos.
// Pensado para rodar via cron, ex.: */5 * * * * check_pending_pix

use clap::Parser;
use tracing_subscriber::EnvFilter;

use race_registration_backend::config::{settings::AppConfig, AppState};

#[derive(Parser, Debug)]
#[command(name = "check_pending_pix", about = "Reconcilia pagamentos PIX pendentes")]
struct Cli {
    /// Apenas mostra o que seria feito, sem alterar nada.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let (app_state, _db_pool) = AppState::new(config).await?;

    let report = app_state.pix_sweeper.sweep(cli.dry_run).await?;

    println!(
        "Concluído{}: {} confirmado(s), {} já pago(s), {} pendente(s), {} erro(s), {} verificado(s).",
        if report.dry_run { " [DRY-RUN]" } else { "" },
        report.settled,
        report.already_paid,
        report.still_pending,
        report.errors,
        report.checked
    );
    if report.dry_run {
        println!("{} seriam confirmado(s).", report.would_settle);
    }

    Ok(())
}
