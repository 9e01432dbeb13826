use crate::authentication::hash_password;
use crate::database::{Database, DbError, Document};
use crate::error::ServerError;
use crate::router::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use eventdesk_common::collection::Collection;
use eventdesk_common::domain::RecordId;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

fn collection(name: &str) -> Result<Collection, ServerError> {
    name.parse().map_err(|_| ServerError::NotFound("Collection"))
}

fn document(body: Value) -> Result<Document, ServerError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ServerError::BadRequest("Expected a JSON object")),
    }
}

fn db_error(action: &'static str) -> impl FnOnce(DbError) -> ServerError {
    move |err| match err {
        DbError::NotFound => ServerError::NotFound("Record"),
        DbError::Conflict => ServerError::Conflict("A record with this id already exists"),
        err => {
            error!("Failed to {action}: {err}");
            ServerError::DatabaseError(action)
        }
    }
}

/// What a client gets to see of a document. Password hashes never leave the server.
fn present(collection: Collection, mut document: Document) -> Value {
    if collection == Collection::Users {
        document.remove("password");
    }
    Value::Object(document)
}

/// Checks email uniqueness and replaces a plain `password` with its hash. Without a new password
/// the hash of `previous` is kept.
async fn prepare_user(
    db: &Database,
    id: &str,
    document: &mut Document,
    previous: Option<&Document>,
) -> Result<(), ServerError> {
    let Some(email) = document.get("email").and_then(|v| v.as_str()) else {
        return Err(ServerError::BadRequest("Users need an email"));
    };

    let users = db.list(Collection::Users).await.map_err(db_error("list users"))?;
    let taken = users.iter().any(|x| {
        x.get("id").and_then(|v| v.as_str()) != Some(id)
            && x.get("email")
                .and_then(|v| v.as_str())
                .is_some_and(|v| v.eq_ignore_ascii_case(email))
    });
    if taken {
        return Err(ServerError::Conflict("A user with this email already exists"));
    }

    let hash = match document.remove("password") {
        Some(Value::String(password)) => {
            let hash = hash_password(&password).map_err(|err| {
                error!("Failed to hash password {err}");
                ServerError::UnexpectedError("Failed to store user")
            })?;
            Some(Value::String(hash))
        }
        Some(Value::Null) | None => previous.and_then(|x| x.get("password")).cloned(),
        Some(_) => return Err(ServerError::BadRequest("Password must be a string")),
    };
    if let Some(hash) = hash {
        document.insert("password".into(), hash);
    }

    Ok(())
}

pub async fn list(
    state: State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Value>>, ServerError> {
    let collection = collection(&name)?;
    let documents = state
        .database
        .list(collection)
        .await
        .map_err(db_error("list documents"))?;

    Ok(Json(
        documents
            .into_iter()
            .map(|x| present(collection, x))
            .collect(),
    ))
}

/// Stores a new document. A client supplied id is kept, otherwise a UUID v7 is assigned.
pub async fn create(
    state: State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let collection = collection(&name)?;
    let mut document = document(body)?;

    let id = match document.get("id").cloned() {
        None | Some(Value::Null) => Uuid::now_v7().to_string(),
        Some(value) => serde_json::from_value::<RecordId>(value)
            .map_err(|_| ServerError::BadRequest("Ids must be strings or numbers"))?
            .as_str()
            .to_string(),
    };
    document.insert("id".into(), json!(id));

    if collection == Collection::Users {
        prepare_user(&state.database, &id, &mut document, None).await?;
    }

    state
        .database
        .insert(collection, &id, &document)
        .await
        .map_err(db_error("insert document"))?;
    debug!("created {collection}/{id}");

    Ok((StatusCode::CREATED, Json(present(collection, document))))
}

pub async fn get(
    state: State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<Value>, ServerError> {
    let collection = collection(&name)?;
    let document = state
        .database
        .get(collection, &id)
        .await
        .map_err(db_error("get document"))?;

    Ok(Json(present(collection, document)))
}

/// Lays the top level fields of `fields` over the stored document and writes the result back.
/// Fields the body leaves out keep their stored value.
async fn overwrite(
    db: &Database,
    collection: Collection,
    id: &str,
    fields: Document,
) -> Result<Document, ServerError> {
    let previous = db
        .get(collection, id)
        .await
        .map_err(db_error("get document"))?;

    let mut document = previous.clone();
    document.remove("password");
    document.extend(fields);
    document.insert("id".into(), json!(id));
    if collection == Collection::Users {
        prepare_user(db, id, &mut document, Some(&previous)).await?;
    }

    db.replace(collection, id, &document)
        .await
        .map_err(db_error("update document"))?;
    Ok(document)
}

/// PUT. Takes a full or partial record. The id in the path wins over one in the body.
pub async fn replace(
    state: State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ServerError> {
    let collection = collection(&name)?;
    let document = overwrite(&state.database, collection, &id, document(body)?).await?;
    debug!("replaced {collection}/{id}");

    Ok(Json(present(collection, document)))
}

pub async fn patch(
    state: State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ServerError> {
    let collection = collection(&name)?;
    let document = overwrite(&state.database, collection, &id, document(body)?).await?;
    debug!("patched {collection}/{id}");

    Ok(Json(present(collection, document)))
}

pub async fn delete(
    state: State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<Value>, ServerError> {
    let collection = collection(&name)?;
    state
        .database
        .delete(collection, &id)
        .await
        .map_err(db_error("delete document"))?;
    debug!("deleted {collection}/{id}");

    Ok(Json(json!({})))
}
