use crate::core::{AppError, AppState};
use axum::extract::State;
use axum::{Error, body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// struct che codifica il contenuto del token jwt
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: String,
    pub username: String,
}

/// Identità del chiamante ricavata dal token validato.
///
/// L'emissione dei token e l'anagrafica utenti vivono nel servizio di
/// autenticazione esterno: qui i claim validati sono la fonte di verità.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
}

#[instrument(skip(secret), fields(username = %username, id = %id))]
pub fn encode_jwt(username: String, id: String, secret: &String) -> Result<String, Error> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let expire: chrono::TimeDelta = Duration::hours(24);
    let exp: usize = (now + expire).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        username,
        id,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map(|token| {
        info!("JWT token encoded successfully");
        token
    })
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        Error::new("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: String, secret: &String) -> Result<TokenData<Claims>, Error> {
    debug!("Decoding JWT token");
    decode(
        &jwt_token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data: TokenData<Claims>| {
        info!("JWT token decoded successfully for user: {}", data.claims.username);
        data
    })
    .map_err(|e| {
        error!("Failed to decode JWT token: {:?}", e);
        Error::new("Error in decoding jwt token")
    })
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = req.headers_mut().get(http::header::AUTHORIZATION);
    let auth_header = match auth_header {
        Some(header) => header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::forbidden("Empty header is not allowed")
        })?,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::forbidden(
                "Please add the JWT token to the header",
            ));
        }
    };
    let mut header = auth_header.split_whitespace();
    let (_bearer, token) = (header.next(), header.next());
    let token = token.ok_or_else(|| {
        warn!("Malformed authorization header");
        AppError::forbidden("Please add the JWT token to the header")
    })?;
    let token_data = match decode_jwt(token.to_string(), &state.jwt_secret) {
        Ok(data) => data,
        Err(_) => {
            warn!("Failed to decode JWT token");
            return Err(AppError::unauthorized("Unable to decode token"));
        }
    };

    // La sessione è garantita dal servizio di autenticazione che ha firmato
    // il token: i claim validati bastano a identificare il chiamante.
    let current_user = AuthenticatedUser {
        user_id: token_data.claims.id,
        username: token_data.claims.username,
    };
    info!("User authenticated: {}", current_user.username);

    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Middleware che verifica che l'utente corrente sia partecipante della stanza specificata
/// Estrae room_id dal path e verifica la membership sulla tabella dei partecipanti
#[instrument(skip(state, req, next))]
pub async fn room_membership_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running room membership middleware");
    // 1. Ottenere l'utente corrente dall'Extension (deve essere stato inserito dall'authentication_middleware)
    let current_user = req
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?
        .clone();

    // 2. Estrarre room_id dal path: il middleware vive dentro il nest
    //    /rooms, quindi il path visto qui è già senza prefisso e il primo
    //    segmento non vuoto è la stanza
    let room_id = req
        .uri()
        .path()
        .split('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .ok_or_else(|| {
            warn!("Room ID not found in path: {}", req.uri().path());
            AppError::bad_request("Room ID not found in path")
        })?;

    debug!(
        "Checking membership for user {} in room {}",
        current_user.user_id, room_id
    );

    // 3. Verificare che l'utente sia partecipante della stanza
    if !state.room.is_participant(&room_id, &current_user.user_id).await? {
        warn!(
            "User {} is not a member of room {}",
            current_user.user_id, room_id
        );
        return Err(AppError::forbidden("You are not a member of this room"));
    }

    info!(
        "User {} verified as member of room {}",
        current_user.user_id, room_id
    );

    Ok(next.run(req).await)
}
