use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    /// Event-log rows consumed, header included.
    pub last_row: u64,
    pub initialized: bool,
    pub start_at: String,
    pub profit_total: String,
    pub open_positions: usize,
    pub active_investors: usize,
    pub total_active_deposit: String,
    pub reference_bank: String,
    pub share_fraction: String,
    pub updated_at: String,
}

pub async fn get_state(State(state): State<AppState>) -> Result<Json<StateResponse>, AppError> {
    let poll = state.repo.load_poll_state().await?;
    let book = state.repo.load_cohort_book().await?;
    let active = state.repo.list_investors(true).await?;
    let total_active_deposit = state.repo.total_active_deposit().await?;

    Ok(Json(StateResponse {
        last_row: poll.last_row,
        initialized: poll.is_initialized(),
        start_at: poll.start_at.to_rfc3339(),
        profit_total: poll.profit_total.to_canonical_string(),
        open_positions: book.len(),
        active_investors: active.len(),
        total_active_deposit: total_active_deposit.to_canonical_string(),
        reference_bank: state.config.reference_bank.to_canonical_string(),
        share_fraction: state.config.share_fraction.to_canonical_string(),
        updated_at: poll.updated_at.to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub positions: Vec<PositionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub signal_id: String,
    pub cum_margin: String,
    pub opened_row: u64,
    pub recovered: bool,
    pub total_entry_deposit: String,
    pub members: Vec<MemberDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub chat_id: i64,
    pub entry_deposit: String,
}

pub async fn get_positions(
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    let book = state.repo.load_cohort_book().await?;
    let positions = book
        .iter()
        .map(|position| PositionDto {
            signal_id: position.signal_id.to_string(),
            cum_margin: position.cum_margin.to_canonical_string(),
            opened_row: position.opened_row,
            recovered: position.recovered,
            total_entry_deposit: position.total_entry_deposit().to_canonical_string(),
            members: position
                .members
                .iter()
                .map(|m| MemberDto {
                    chat_id: m.chat_id.as_i64(),
                    entry_deposit: m.entry_deposit.to_canonical_string(),
                })
                .collect(),
        })
        .collect();
    Ok(Json(PositionsResponse { positions }))
}
