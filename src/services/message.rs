//! Message services - Lettura, read-ack e cancellazione dei messaggi

use crate::core::{AppError, AppState, AuthenticatedUser};
use crate::dtos::{
    DeleteResultDTO, MessageDTO, MessageDeletedDTO, MessagesPageDTO, MessagesQuery,
    ReadAckRequestDTO, ReadStatusEvent, WsEventDTO,
};
use crate::entities::DeleteType;
use crate::repositories::{Delete, Read};
use crate::services::deletion::classify;
use crate::ws::{broadcast_to_room, notify_user};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

const DEFAULT_PAGE_SIZE: i64 = 30;
const MAX_PAGE_SIZE: i64 = 100;

#[instrument(skip(state, current_user), fields(room_id = %room_id, user_id = %current_user.user_id))]
pub async fn get_room_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(params): Query<MessagesQuery>,
    Extension(current_user): Extension<AuthenticatedUser>, // membership verificata dal middleware
) -> Result<Json<MessagesPageDTO>, AppError> {
    debug!("Fetching room messages");
    // 1. Estrarre room_id dal path e query parameters (before_date, limit)
    // 2. Recuperare limit+1 messaggi più recenti visibili al richiedente
    //    (i messaggi nascosti localmente sono esclusi dalla query stessa)
    // 3. Calcolare has_more dal messaggio in eccesso e scartarlo
    // 4. Allegare i reader entries con una singola query bulk
    // 5. Riordinare dal più vecchio al più recente e ritornare la pagina

    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let mut messages = state
        .msg
        .find_many_paginated(
            &room_id,
            &current_user.user_id,
            params.before_date.as_ref(),
            limit + 1,
        )
        .await?;

    let has_more = messages.len() as i64 > limit;
    messages.truncate(limit as usize);

    let ids: Vec<String> = messages.iter().map(|m| m.message_id.clone()).collect();
    let mut readers_by_message: HashMap<String, Vec<crate::dtos::ReaderEntryDTO>> = HashMap::new();
    for reader in state.msg.find_readers(&ids).await? {
        readers_by_message
            .entry(reader.message_id.clone())
            .or_default()
            .push(reader.into());
    }

    // la query ritorna newest-first, il client vuole l'ordine cronologico
    messages.reverse();

    let messages_dto: Vec<MessageDTO> = messages
        .into_iter()
        .map(|m| {
            let mut dto = MessageDTO::from(m);
            if let Some(readers) = readers_by_message.remove(&dto.message_id) {
                dto.readers = readers;
            }
            dto
        })
        .collect();

    let oldest_timestamp = messages_dto.first().map(|m| m.created_at);

    info!("Retrieved {} messages for room", messages_dto.len());

    Ok(Json(MessagesPageDTO {
        messages: messages_dto,
        has_more,
        oldest_timestamp,
    }))
}

#[instrument(skip(state, current_user, body), fields(room_id = %room_id, user_id = %current_user.user_id))]
pub async fn mark_messages_read(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Extension(current_user): Extension<AuthenticatedUser>, // membership verificata dal middleware
    Json(body): Json<ReadAckRequestDTO>,
) -> Result<Json<serde_json::Value>, AppError> {
    debug!("Publishing read-status event");
    // 1. Validare il body (message_ids non vuoto)
    // 2. Costruire il ReadStatusEvent con l'identità autenticata, mai col
    //    body (il client non può marcare letture per conto di altri)
    // 3. Consegnarlo al publisher: la propagazione vera è asincrona
    body.validate()?;

    let event = ReadStatusEvent {
        room_id,
        user_id: current_user.user_id.clone(),
        message_ids: body.message_ids,
        read_at: body.read_at.unwrap_or_else(Utc::now),
    };

    state.read_status.publish(&event).await?;

    info!(count = event.message_ids.len(), "Read-status event accepted for delivery");

    Ok(Json(json!({ "success": true })))
}

#[instrument(skip(state, current_user), fields(message_id = %message_id, user_id = %current_user.user_id))]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
    Extension(current_user): Extension<AuthenticatedUser>,
) -> Result<Json<DeleteResultDTO>, AppError> {
    debug!("Processing delete request");
    // 1. Il messaggio deve esistere (una cancellazione globale precedente
    //    lo fa sparire, quindi ri-cancellarlo è un 404)
    // 2. Solo il mittente può cancellare, e deve essere ancora membro
    //    della stanza del messaggio
    // 3. Classificare una sola volta in base all'età e applicare:
    //    Global → hard delete + broadcast alla stanza
    //    Local  → hide per il richiedente + notifica solo a lui
    let message = state
        .msg
        .read(&message_id)
        .await?
        .ok_or_else(|| {
            warn!("Delete requested for missing message");
            AppError::not_found("Message not found")
        })?;

    if message.sender_id != current_user.user_id {
        warn!("Delete requested by non-sender");
        return Err(AppError::forbidden("Only the sender can delete a message"));
    }

    if !state
        .room
        .is_participant(&message.room_id, &current_user.user_id)
        .await?
    {
        warn!("Delete requested by non-participant");
        return Err(AppError::forbidden("You are not a member of this room"));
    }

    let delete_type = classify(Utc::now(), message.created_at, state.delete_age_threshold);

    let event = WsEventDTO::MessageDeleted(MessageDeletedDTO {
        message_id: message.message_id.clone(),
        deleted_by: current_user.user_id.clone(),
        delete_type,
    });

    match delete_type {
        DeleteType::Global => {
            state.msg.delete(&message_id).await?;
            // fire-and-forget: un fallimento realtime non fa fallire la DELETE
            broadcast_to_room(&state, &message.room_id, event);
            info!("Message deleted globally");
        }
        DeleteType::Local => {
            // idempotente: ripetere la hide per lo stesso utente è un no-op
            state.msg.hide_for_user(&message_id, &current_user.user_id).await?;
            notify_user(&state, &current_user.user_id, event);
            info!("Message hidden locally for requester");
        }
    }

    Ok(Json(DeleteResultDTO {
        message_id,
        delete_type,
    }))
}
