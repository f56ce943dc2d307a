// src/services/pix_sweeper.rs
//
// Reconciliação periódica dos PIX pendentes: consulta o provedor para cada
// inscrição PENDING com QR Code gerado e confirma as que já foram pagas.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{
    common::error::AppError,
    db::RegistrationStore,
    services::{
        pix_gateway::{PixGateway, PixStatus},
        settlement_service::SettlementService,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub settled: usize,
    pub already_paid: usize,
    pub still_pending: usize,
    pub errors: usize,
    /// Pagos no provedor que seriam confirmados (apenas em `dry_run`).
    pub would_settle: usize,
    pub dry_run: bool,
}

#[derive(Clone)]
pub struct PixSweeper {
    store: Arc<dyn RegistrationStore>,
    gateway: PixGateway,
    settlement: SettlementService,
}

impl PixSweeper {
    pub fn new(store: Arc<dyn RegistrationStore>, gateway: PixGateway, settlement: SettlementService) -> Self {
        Self { store, gateway, settlement }
    }

    pub async fn sweep(&self, dry_run: bool) -> Result<SweepReport, AppError> {
        let pending = self.store.list_pending_pix().await?;
        let mut report = SweepReport {
            dry_run,
            ..SweepReport::default()
        };

        if pending.is_empty() {
            tracing::info!("Nenhum pagamento PIX pendente para verificar");
            return Ok(report);
        }
        tracing::info!("🔎 Verificando {} pagamento(s) PIX pendente(s)", pending.len());

        for registration in pending {
            let Some(pix_id) = registration.pix_id.as_deref() else {
                continue;
            };
            report.checked += 1;

            let status = match self.gateway.check_status(pix_id).await {
                Ok(remote) => remote.status,
                Err(e) => {
                    tracing::warn!(registration_id = registration.id, pix_id, "Erro ao consultar PIX: {}", e);
                    report.errors += 1;
                    continue;
                }
            };

            if status != PixStatus::Paid {
                tracing::debug!(registration_id = registration.id, pix_id, "Ainda {}", status.as_str());
                report.still_pending += 1;
                continue;
            }

            if dry_run {
                tracing::info!(registration_id = registration.id, pix_id, "[DRY-RUN] Seria marcado como pago");
                report.would_settle += 1;
                continue;
            }

            match self.settlement.mark_paid(registration.id, None, None).await {
                Ok(true) => report.settled += 1,
                Ok(false) => report.already_paid += 1,
                Err(e) => {
                    tracing::error!(registration_id = registration.id, "Falha ao confirmar PIX: {}", e);
                    report.errors += 1;
                }
            }
        }

        tracing::info!(
            "Varredura concluída: {} confirmado(s), {} erro(s), {} verificado(s)",
            report.settled,
            report.errors,
            report.checked
        );
        Ok(report)
    }
}

/// Inicia a varredura em segundo plano. Não aguarde o `JoinHandle`: ele roda indefinidamente.
pub fn start_pix_sweep_worker(sweeper: PixSweeper, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        tracing::info!("🕰️ Varredura de PIX iniciada (a cada {}s)", every.as_secs());
        loop {
            timer.tick().await;
            if let Err(e) = sweeper.sweep(false).await {
                tracing::error!("🕰️ Erro na varredura de PIX: {}", e);
            }
        }
    })
}
