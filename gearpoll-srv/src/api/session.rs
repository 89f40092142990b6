//! Survey session API: creation, current pair, answers, progress

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gearpoll_common::db;
use gearpoll_common::pairing::{filter_answered, generate_pair_order, Progress, SurveySession};
use gearpoll_common::{AnswerResult, RespondentIdentity};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/session request body
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(flatten)]
    pub identity: RespondentIdentity,
    /// Optional campaign/source tag from the page URL
    pub source: Option<String>,
}

/// Session creation response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub progress: Progress,
    pub completed: bool,
}

/// POST /api/session
///
/// Validates the respondent identity, builds the randomized pair order,
/// removes pairs this email has already answered, and stores the session
/// under a fresh token. A validation failure creates no session and returns
/// a message localized to the submitted language.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.identity.validate().map_err(ApiError::Validation)?;

    let catalog = state
        .catalogs
        .get(&req.identity.language)
        .ok_or_else(|| {
            ApiError::Internal(format!(
                "No catalog loaded for language {}",
                req.identity.language.as_str()
            ))
        })?;

    let order = generate_pair_order(&catalog.keys(), &mut rand::thread_rng());

    // A failed resume lookup must not block the respondent: proceed
    // unfiltered, at worst they re-answer a pair.
    let order = match db::answered_pairs(&state.db, &req.identity.email).await {
        Ok(answered) => filter_answered(order, &answered),
        Err(err) => {
            tracing::warn!(
                email = %req.identity.email,
                error = %err,
                "Failed to fetch prior answers; proceeding without resume filter"
            );
            order
        }
    };

    let session = SurveySession::new(req.identity, req.source, order);
    let progress = session.progress();
    let completed = session.is_completed();
    let session_id = state.sessions.insert(session).await;

    tracing::info!(%session_id, total = progress.total, "Survey session created");

    Ok(Json(SessionResponse {
        session_id,
        progress,
        completed,
    }))
}

/// One side of a presented pair, ready for display
#[derive(Debug, Serialize)]
pub struct PairSide {
    pub key: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
}

/// GET /api/session/:id/current response
#[derive(Debug, Serialize)]
pub struct CurrentPairResponse {
    pub progress: Progress,
    pub completed: bool,
    /// None once the session is completed
    pub left: Option<PairSide>,
    pub right: Option<PairSide>,
}

/// GET /api/session/:id/current
///
/// The pair currently awaiting judgment, as presented (orientation already
/// fixed). Completed sessions report progress with no pair.
pub async fn current_pair(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CurrentPairResponse>> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Unknown session: {}", session_id)))?;
    let (progress, completed, pair, language) = {
        let session = session.lock().await;
        (
            session.progress(),
            session.is_completed(),
            session.current_pair().cloned(),
            session.identity().language,
        )
    };

    let (left, right) = match pair {
        Some(pair) => {
            let catalog = state.catalogs.get(&language).ok_or_else(|| {
                ApiError::Internal(format!("No catalog loaded for language {}", language.as_str()))
            })?;
            (
                Some(pair_side(catalog, &pair.left)?),
                Some(pair_side(catalog, &pair.right)?),
            )
        }
        None => (None, None),
    };

    Ok(Json(CurrentPairResponse {
        progress,
        completed,
        left,
        right,
    }))
}

fn pair_side(
    catalog: &gearpoll_common::catalog::Catalog,
    key: &str,
) -> ApiResult<PairSide> {
    let item = catalog
        .get(key)
        .ok_or_else(|| ApiError::Internal(format!("Catalog key missing: {}", key)))?;
    Ok(PairSide {
        key: item.key.clone(),
        title: item.title.clone(),
        description: item.description.clone(),
        image_url: format!("/api/images/{}", item.image_path),
    })
}

/// POST /api/session/:id/answer request body
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub result: AnswerResult,
}

/// Answer submission response
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub progress: Progress,
    pub completed: bool,
}

/// POST /api/session/:id/answer
///
/// Records the judgment on the current pair and advances progress. The
/// record is built from the pre-increment state, persisted first, and only
/// on write success does the index advance - a failed write leaves the
/// session exactly where it was so the client can retry.
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Unknown session: {}", session_id)))?;
    // Hold this session's lock across the storage write: record-then-advance
    // is atomic for this session while other sessions proceed freely.
    let mut session = session.lock().await;

    let record = session.build_record(req.result).ok_or_else(|| {
        ApiError::Completed("All pairs have been answered for this survey".to_string())
    })?;

    db::retry_on_lock("insert answer record", state.config.db_max_lock_wait_ms, || {
        db::insert_record(&state.db, &record)
    })
    .await
    .map_err(|err| {
        tracing::error!(%session_id, error = %err, "Answer write failed; progress not advanced");
        ApiError::StorageWrite(format!("Could not record answer, please retry: {}", err))
    })?;

    session.advance();
    let progress = session.progress();
    let completed = session.is_completed();

    tracing::debug!(
        %session_id,
        trial = record.n_trials,
        result = record.result.as_str(),
        "Answer recorded"
    );

    Ok(Json(AnswerResponse { progress, completed }))
}

/// GET /api/session/:id/progress response
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: Progress,
    pub completed: bool,
}

/// GET /api/session/:id/progress
pub async fn session_progress(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<ProgressResponse>> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Unknown session: {}", session_id)))?;
    let session = session.lock().await;
    Ok(Json(ProgressResponse {
        progress: session.progress(),
        completed: session.is_completed(),
    }))
}
