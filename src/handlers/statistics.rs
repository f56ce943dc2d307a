// src/handlers/statistics.rs

use axum::{extract::State, Json};

use crate::{common::error::AppError, config::AppState, models::statistics::RaceStatistics};

#[utoipa::path(
    get,
    path = "/api/race-statistics/",
    tag = "Estatísticas",
    responses(
        (status = 200, description = "Totais por sexo, categoria, percurso, status e camiseta", body = RaceStatistics),
        (status = 401, description = "Chave de API ausente ou inválida")
    ),
    security(("api_key" = []))
)]
pub async fn race_statistics(State(app_state): State<AppState>) -> Result<Json<RaceStatistics>, AppError> {
    let stats = app_state.registration_service.statistics().await?;
    Ok(Json(stats))
}
