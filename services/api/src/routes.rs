//! API service routes
//!
//! Everything except `/health` sits behind the access guard from the auth
//! crate and is scoped to the authenticated user.

use auth::middleware::{AuthenticatedUser, require_access};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        CreateCollectionRequest, Rating, RatingRequest, RemoveTranslationsRequest,
        TranslationRequest, language::language_pair,
        translation::{export_term_definitions, normalize_lexical_item},
    },
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/translations", post(translate))
        .route("/collections", get(list_collections).post(create_collection))
        .route(
            "/collections/:id/translations",
            get(collection_translations).delete(remove_translations),
        )
        .route("/collections/:id/export", get(export_collection))
        .route("/collections/:id/due", get(due_translations))
        .route(
            "/collections/:id/translations/:translation_id/rating",
            post(rate_translation),
        )
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            require_access,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Translate a lexical item, optionally saving it to one of the caller's collections
pub async fn translate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<TranslationRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;

    let lexical_item = normalize_lexical_item(&request.lexical_item);
    if lexical_item.is_empty() {
        return Err(ApiError::BadRequest("Lexical item is required".to_string()));
    }

    let (from, to) =
        language_pair(&request.translate_from, &request.translate_to).map_err(ApiError::BadRequest)?;

    let collection = if request.saving_enabled {
        let collection_id = request.collection_id.ok_or_else(|| {
            ApiError::BadRequest("collectionID is required when saving is enabled".to_string())
        })?;
        let collection = state
            .collection_repository
            .find_owned(collection_id, user.id)
            .await?
            .ok_or(ApiError::NotFound("Collection"))?;
        Some(collection)
    } else {
        None
    };

    let translation = match state
        .translation_repository
        .find(&lexical_item, from, to)
        .await?
    {
        Some(stored) => stored,
        None => {
            let completed = state.completions.translate(&lexical_item, from, to).await?;
            state
                .translation_repository
                .upsert(&lexical_item, from, to, &completed)
                .await?
        }
    };

    if let Some(collection) = collection {
        state
            .collection_repository
            .attach(collection.id, translation.id)
            .await?;
        info!(
            "User {} saved translation {} to collection {}",
            user.id, translation.id, collection.id
        );
    }

    Ok(Json(translation))
}

/// Collections owned by the caller
pub async fn list_collections(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let collections = state.collection_repository.list_for_user(user.id).await?;
    Ok(Json(collections))
}

/// Create a collection for the caller
pub async fn create_collection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<CreateCollectionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let name = body(payload)?
        .validated_name()
        .map_err(ApiError::BadRequest)?;

    let collection = state.collection_repository.create(user.id, &name).await?;
    info!("User {} created collection {}", user.id, collection.id);

    Ok((StatusCode::CREATED, Json(collection)))
}

/// Translations saved in one of the caller's collections
pub async fn collection_translations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(collection_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    ensure_owned(&state, collection_id, user.id).await?;

    let entries = state
        .collection_repository
        .translations(collection_id, user.id, false, Utc::now())
        .await?;

    Ok(Json(entries))
}

/// Remove translations from one of the caller's collections
pub async fn remove_translations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(collection_id): Path<i64>,
    payload: Result<Json<RemoveTranslationsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    if request.translation_ids.is_empty() {
        return Err(ApiError::BadRequest("translationIds must not be empty".to_string()));
    }

    ensure_owned(&state, collection_id, user.id).await?;

    let removed = state
        .collection_repository
        .remove_translations(collection_id, user.id, &request.translation_ids)
        .await?;

    Ok(Json(json!({"removed": removed})))
}

/// Plain-text export of a collection in `term;definition` form
pub async fn export_collection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(collection_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    ensure_owned(&state, collection_id, user.id).await?;

    let translations: Vec<_> = state
        .collection_repository
        .translations(collection_id, user.id, false, Utc::now())
        .await?
        .into_iter()
        .map(|entry| entry.translation)
        .collect();

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        export_term_definitions(&translations),
    ))
}

/// Translations due for review
pub async fn due_translations(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(collection_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    ensure_owned(&state, collection_id, user.id).await?;

    let entries = state
        .collection_repository
        .translations(collection_id, user.id, true, Utc::now())
        .await?;

    Ok(Json(entries))
}

/// Record a review rating and schedule the next review
pub async fn rate_translation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((collection_id, translation_id)): Path<(i64, i64)>,
    payload: Result<Json<RatingRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let rating = Rating::try_from(body(payload)?.rating).map_err(ApiError::BadRequest)?;
    let due = rating.next_due(Utc::now());

    let updated = state
        .collection_repository
        .set_due(collection_id, user.id, translation_id, due)
        .await?;

    if !updated {
        return Err(ApiError::NotFound("Collection translation"));
    }

    Ok(Json(json!({
        "collectionId": collection_id,
        "translationId": translation_id,
        "due": due,
    })))
}

async fn ensure_owned(state: &AppState, collection_id: i64, user_id: i64) -> ApiResult<()> {
    state
        .collection_repository
        .find_owned(collection_id, user_id)
        .await?
        .map(|_| ())
        .ok_or(ApiError::NotFound("Collection"))
}
