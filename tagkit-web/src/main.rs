//! Servidor HTTP (Axum) que expõe o pipeline de anotação como API JSON para a
//! interface de curadoria.
//!
//! | Rota              | Entrada                                         | Saída                          |
//! |-------------------|-------------------------------------------------|--------------------------------|
//! | `GET /health`     |                                                 | `{"status": "ok"}`             |
//! | `POST /vocabulary`| `documents`, `ngram_max?`, `existing?`          | linhas do vocabulário          |
//! | `POST /tag`       | `documents`, `vocabulary`, `group_untagged?`, `readable?` | matriz de tags + completude |
//! | `POST /iob`       | `documents`, `vocabulary`, `ngram_vocabulary?`  | linhas IOB                     |
//! | `POST /ngram`     | `documents`, `vocabulary`, `init?`              | vocabulário de n-gramas        |
//!
//! A configuração vem do arquivo JSON apontado por `TAGKIT_CONFIG` (opcional).

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tagkit_core::{
    build_ngram_vocabulary, completeness, iob_labels,
    tagger::{tag_documents, TagOptions},
    EntityType, ExtractorOptions, IobRow, TagError, TaggingConfig, VocabularyEntry,
    VocabularyExtractor, VocabularyTable,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Estado compartilhado da aplicação
struct AppState {
    config: TaggingConfig,
}

/// Linha do vocabulário no formato da API (mesmas colunas do CSV).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VocabRow {
    token: String,
    #[serde(rename = "NE", default)]
    ne: EntityType,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    score: f64,
}

fn to_table(rows: Vec<VocabRow>) -> VocabularyTable {
    rows.into_iter()
        .map(|r| {
            (
                r.token,
                VocabularyEntry {
                    entity_type: r.ne,
                    alias: r.alias,
                    notes: r.notes,
                    score: r.score,
                },
            )
        })
        .collect()
}

fn to_rows(table: &VocabularyTable) -> Vec<VocabRow> {
    table
        .iter()
        .map(|(token, e)| VocabRow {
            token: token.to_string(),
            ne: e.entity_type.clone(),
            alias: e.alias.clone(),
            notes: e.notes.clone(),
            score: e.score,
        })
        .collect()
}

#[derive(Deserialize)]
struct VocabularyRequest {
    documents: Vec<String>,
    #[serde(default)]
    ngram_max: Option<usize>,
    #[serde(default)]
    existing: Option<Vec<VocabRow>>,
}

#[derive(Deserialize)]
struct TagRequest {
    documents: Vec<String>,
    vocabulary: Vec<VocabRow>,
    #[serde(default)]
    group_untagged: Option<bool>,
    #[serde(default)]
    readable: bool,
}

#[derive(Deserialize)]
struct IobRequest {
    documents: Vec<String>,
    vocabulary: Vec<VocabRow>,
    #[serde(default)]
    ngram_vocabulary: Option<Vec<VocabRow>>,
}

#[derive(Deserialize)]
struct NgramRequest {
    documents: Vec<String>,
    vocabulary: Vec<VocabRow>,
    #[serde(default)]
    init: Option<Vec<VocabRow>>,
}

/// Erro de API: falhas do pipeline viram 400, falhas internas 500.
enum ApiError {
    Pipeline(TagError),
    Internal(String),
}

impl From<TagError> for ApiError {
    fn from(err: TagError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Pipeline(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        warn!(%status, %message, "requisição falhou");
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Roda o trabalho síncrono do pipeline fora do runtime async.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, TagError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn load_config() -> Result<TaggingConfig, TagError> {
    match std::env::var("TAGKIT_CONFIG") {
        Ok(path) => {
            info!(%path, "carregando configuração");
            TaggingConfig::from_json_file(path)
        }
        Err(_) => Ok(TaggingConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let config = load_config()?;
    let state = Arc::new(AppState { config });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/vocabulary", post(vocabulary_handler))
        .route("/tag", post(tag_handler))
        .route("/iob", post(iob_handler))
        .route("/ngram", post(ngram_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("servidor tagkit iniciado em http://localhost:3000");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Extrai (e opcionalmente mescla) o vocabulário ranqueado.
async fn vocabulary_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VocabularyRequest>,
) -> Result<Json<Vec<VocabRow>>, ApiError> {
    let token_pattern = state.config.token_pattern.clone();
    let table = blocking(move || {
        let mut options = ExtractorOptions::with_ngram_max(req.ngram_max.unwrap_or(1));
        options.token_pattern = token_pattern;
        let mut extractor = VocabularyExtractor::new(options);
        extractor.fit(&req.documents)?;
        let existing = req.existing.map(to_table);
        VocabularyTable::build(&extractor, existing.as_ref())
    })
    .await?;

    info!(rows = table.len(), "vocabulário extraído");
    Ok(Json(to_rows(&table)))
}

/// Matriz de tags (ou versão legível) e estatísticas de completude.
async fn tag_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TagRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = blocking(move || {
        let mut extractor = VocabularyExtractor::new(ExtractorOptions {
            token_pattern: state.config.token_pattern.clone(),
            ..Default::default()
        });
        let options = TagOptions {
            group_untagged: req.group_untagged.unwrap_or(true),
        };
        let vocabulary = to_table(req.vocabulary);
        let tags = tag_documents(&mut extractor, &req.documents, Some(&vocabulary), &options)?;
        let stats = completeness(&tags, &state.config);
        let tags_json = if req.readable {
            serde_json::to_value(tags.readable())?
        } else {
            serde_json::to_value(&tags)?
        };
        Ok(json!({ "tags": tags_json, "completeness": stats }))
    })
    .await?;

    Ok(Json(body))
}

async fn iob_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IobRequest>,
) -> Result<Json<Vec<IobRow>>, ApiError> {
    let rows = blocking(move || {
        let vocab_1gram = to_table(req.vocabulary);
        let vocab_ngram = req.ngram_vocabulary.map(to_table);
        iob_labels(&req.documents, &vocab_1gram, vocab_ngram.as_ref(), &state.config)
    })
    .await?;

    info!(rows = rows.len(), "rótulos IOB gerados");
    Ok(Json(rows))
}

/// Vocabulário de n-gramas com tipos compostos propostos.
async fn ngram_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NgramRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = blocking(move || {
        let vocab_1gram = to_table(req.vocabulary);
        let init = req.init.map(to_table);
        let ngram =
            build_ngram_vocabulary(&req.documents, &vocab_1gram, init.as_ref(), &state.config)?;
        Ok(json!({
            "vocabulary": to_rows(&ngram.vocabulary),
            "replaced_text": ngram.replaced_text,
            "replaced_again": ngram.replaced_again,
        }))
    })
    .await?;

    Ok(Json(body))
}
