//! Chat-command webhook — POST /chat/commands
//!
//! The chat platform forwards each message here; the reply text (if any) is
//! returned in the response body for the platform to post back. Non-command
//! messages yield `{"reply": null}`.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{app::AppState, commands};

#[derive(Deserialize)]
pub struct CommandRequest {
    /// Chat username of the sender; recorded as the entry's creator.
    pub author: String,
    /// Raw message text.
    pub text: String,
}

#[derive(Serialize)]
pub struct CommandResponse {
    pub reply: Option<String>,
}

pub async fn command_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let reply = commands::handle(&state.store, state.tz, &req.author, &req.text);
    Json(CommandResponse { reply })
}
