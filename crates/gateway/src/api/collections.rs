//! Collection CRUD, search, and document endpoints.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value as Json_;
use uuid::Uuid;

use cp_collections::context::{expand_context, ContextOptions};
use cp_collections::format::{format_for_llm, group_by_document};
use cp_collections::search::SearchRequest;
use cp_collections::store::UpsertDocument;
use cp_domain::types::ResourceKind;
use cp_domain::Error;

use crate::auth::ActorHeaders;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCollectionBody {
    pub name: String,
    #[serde(default)]
    pub metadata: Json_,
    pub table_id: String,
}

pub async fn create(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Json(body): Json<CreateCollectionBody>,
) -> ApiResult<impl IntoResponse> {
    let owner_id = actor.user_id().ok_or(Error::Unauthorized)?;
    let collection = state.stores.collections.create(&body.name, &body.metadata, owner_id, &body.table_id).await?;
    Ok(Json(serde_json::json!({ "collection": collection })))
}

pub async fn get_collection(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.permissions.can_access(&actor, ResourceKind::Collection, &id.to_string(), "viewer").await? {
        return Err(Error::Forbidden(format!("no access to collection {id}")).into());
    }
    let collection = state.stores.collections.get(id).await?;
    Ok(Json(serde_json::json!({ "collection": collection })))
}

pub async fn list(State(state): State<AppState>, ActorHeaders(actor): ActorHeaders) -> ApiResult<impl IntoResponse> {
    let owner_id = actor.user_id().ok_or(Error::Unauthorized)?;
    let collections = state.stores.collections.list_by_owner(owner_id).await?;
    Ok(Json(serde_json::json!({ "collections": collections })))
}

pub async fn delete_collection(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.permissions.can_access(&actor, ResourceKind::Collection, &id.to_string(), "owner").await? {
        return Err(Error::Forbidden(format!("no owner access to collection {id}")).into());
    }
    state.stores.collections.delete(id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(flatten)]
    pub request: SearchRequest,
    #[serde(default)]
    pub return_surrounding_context: bool,
    #[serde(default)]
    pub format_chunks_for_llm: bool,
    #[serde(default)]
    pub prefer_full_document: bool,
    #[serde(default)]
    pub max_context_characters: Option<usize>,
}

pub async fn search(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    Json(body): Json<SearchBody>,
) -> ApiResult<impl IntoResponse> {
    let results = state.search.search(&actor, id, &body.request).await?;

    if !body.return_surrounding_context {
        return Ok(Json(serde_json::json!({ "results": results })));
    }

    let mut options = ContextOptions {
        prefer_full_document: body.prefer_full_document,
        ..ContextOptions::default()
    };
    if let Some(max_characters) = body.max_context_characters {
        options.max_characters = max_characters;
    }

    let mut expanded = Vec::with_capacity(results.len());
    for result in results {
        let context = expand_context(&state.stores.documents, &state.stores.chunks, &result.chunk, options).await?;
        expanded.push((result, context));
    }

    if body.format_chunks_for_llm {
        let blocks = group_by_document(expanded);
        let rendered = format_for_llm(&blocks);
        return Ok(Json(serde_json::json!({ "formatted": rendered })));
    }

    let blocks = group_by_document(expanded);
    let json_blocks: Vec<Json_> = blocks
        .into_iter()
        .map(|b| {
            serde_json::json!({
                "document_id": b.document_id,
                "title": b.title,
                "segments": b.segments.into_iter().map(|s| serde_json::json!({
                    "content": s.content,
                    "matched": s.matched,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(Json(serde_json::json!({ "results": json_blocks })))
}

#[derive(Debug, Deserialize)]
pub struct UpsertDocumentBody {
    #[serde(default)]
    pub document_id: Option<Uuid>,
    pub content: String,
    #[serde(default)]
    pub metadata: Json_,
    #[serde(default)]
    pub chunks: Vec<UpsertChunkBody>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertChunkBody {
    pub content: String,
    pub embedding_vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Json_,
}

pub async fn upsert_document(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    Json(body): Json<UpsertDocumentBody>,
) -> ApiResult<impl IntoResponse> {
    let input = UpsertDocument {
        document_id: body.document_id,
        content: body.content,
        metadata: body.metadata,
        chunks: body
            .chunks
            .into_iter()
            .map(|c| cp_collections::store::ChunkInput {
                content: c.content,
                embedding_vector: c.embedding_vector,
                metadata: c.metadata,
            })
            .collect(),
    };
    let (document, chunks) = state.writer.upsert(&actor, id, input).await?;
    Ok(Json(serde_json::json!({ "document": document, "chunks": chunks })))
}

pub async fn list_documents(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.permissions.can_access(&actor, ResourceKind::Collection, &id.to_string(), "viewer").await? {
        return Err(Error::Forbidden(format!("no access to collection {id}")).into());
    }
    let documents = state.stores.documents.list_by_collection(id).await?;
    Ok(Json(serde_json::json!({ "documents": documents })))
}

pub async fn get_document(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((collection_id, document_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    if !state
        .permissions
        .can_access(&actor, ResourceKind::Collection, &collection_id.to_string(), "viewer")
        .await?
    {
        return Err(Error::Forbidden(format!("no access to collection {collection_id}")).into());
    }
    let document = state.stores.documents.get(document_id).await?;
    Ok(Json(serde_json::json!({ "document": document })))
}

pub async fn delete_document(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path((collection_id, document_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    if !state
        .permissions
        .can_access(&actor, ResourceKind::Collection, &collection_id.to_string(), "editor")
        .await?
    {
        return Err(Error::Forbidden(format!("no editor access to collection {collection_id}")).into());
    }
    state.stores.documents.delete(document_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/collections", post(create).get(list))
        .route("/collections/:id", get(get_collection).delete(delete_collection))
        .route("/collections/:id/search", post(search))
        .route("/collections/:id/documents", post(upsert_document).get(list_documents))
        .route("/collections/:id/documents/:document_id", get(get_document).delete(delete_document))
}
