use crate::api::AppState;
use crate::domain::{ChatId, Investor, RequestStatus};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

const LEDGER_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorsQuery {
    pub active_only: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorDto {
    pub chat_id: i64,
    pub name: String,
    pub deposit: String,
    pub pending_deposit: String,
    pub bonus_accrued: String,
    pub bonus_paid: String,
    pub bonus_to_deposit: String,
    pub available_bonus: String,
    pub wallet: String,
    pub network: String,
    pub active: bool,
    pub updated_at: String,
}

impl From<&Investor> for InvestorDto {
    fn from(inv: &Investor) -> Self {
        Self {
            chat_id: inv.chat_id.as_i64(),
            name: inv.name.clone(),
            deposit: inv.deposit.to_canonical_string(),
            pending_deposit: inv.pending_deposit.to_canonical_string(),
            bonus_accrued: inv.bonus_accrued.to_canonical_string(),
            bonus_paid: inv.bonus_paid.to_canonical_string(),
            bonus_to_deposit: inv.bonus_to_deposit.to_canonical_string(),
            available_bonus: inv.available_bonus().to_canonical_string(),
            wallet: inv.wallet.clone(),
            network: inv.network.clone(),
            active: inv.active,
            updated_at: inv.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorsResponse {
    pub investors: Vec<InvestorDto>,
}

pub async fn list_investors(
    Query(params): Query<InvestorsQuery>,
    State(state): State<AppState>,
) -> Result<Json<InvestorsResponse>, AppError> {
    let investors = state
        .repo
        .list_investors(params.active_only.unwrap_or(false))
        .await?;
    Ok(Json(InvestorsResponse {
        investors: investors.iter().map(InvestorDto::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDto {
    pub id: i64,
    pub at: String,
    pub kind: String,
    pub amount: String,
    pub note: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDto {
    pub id: i64,
    pub kind: String,
    pub amount: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorDetailResponse {
    pub investor: InvestorDto,
    pub open_requests: Vec<RequestDto>,
    /// Most recent first.
    pub ledger: Vec<LedgerDto>,
}

pub async fn get_investor(
    Path(chat_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<InvestorDetailResponse>, AppError> {
    let chat_id: ChatId = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat id".into()))?;

    let investor = state
        .repo
        .get_investor(chat_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("investor {}", chat_id)))?;

    let open_requests = state
        .repo
        .list_requests(RequestStatus::New)
        .await?
        .into_iter()
        .filter(|r| r.chat_id == chat_id)
        .map(|r| RequestDto {
            id: r.id,
            kind: r.kind.as_str().to_string(),
            amount: r.amount.to_canonical_string(),
            created_at: r.created_at.to_rfc3339(),
        })
        .collect();

    let ledger = state
        .repo
        .list_ledger(chat_id, LEDGER_LIMIT)
        .await?
        .into_iter()
        .map(|entry| LedgerDto {
            id: entry.id,
            at: entry.at.to_rfc3339(),
            kind: entry.kind,
            amount: entry.amount.to_canonical_string(),
            note: entry.note,
        })
        .collect();

    Ok(Json(InvestorDetailResponse {
        investor: InvestorDto::from(&investor),
        open_requests,
        ledger,
    }))
}
