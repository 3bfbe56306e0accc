//! Mailbox and template endpoints

use crate::extractors::QueryParams;
use crate::handlers::{ApiResult, not_found};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use opsdesk_core::types::{Email, EmailFolder};
use opsdesk_protocol::{EmailDraft, TemplateExt, filter_emails, unread_counts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Query string of the mailbox endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct MailboxQuery {
    /// Folder to show
    #[serde(default = "default_folder")]
    pub folder: EmailFolder,
    /// Free-text search over sender, subject and body
    #[serde(default)]
    pub search: String,
}

const fn default_folder() -> EmailFolder {
    EmailFolder::Inbox
}

/// Mailbox view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxResponse {
    /// Folder shown
    pub folder: EmailFolder,
    /// Matching messages, newest first
    pub emails: Vec<Email>,
    /// Unread messages per folder
    pub unread: BTreeMap<EmailFolder, usize>,
}

/// Messages of one folder matching the search
pub async fn list_emails(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<MailboxQuery>,
) -> Json<MailboxResponse> {
    let mailbox = state.stores.mailbox();
    let emails = filter_emails(&mailbox, query.folder, &query.search)
        .into_iter()
        .cloned()
        .collect();

    Json(MailboxResponse {
        folder: query.folder,
        emails,
        unread: unread_counts(&mailbox),
    })
}

/// Draft built from a template, placeholders left as written
pub async fn template_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<EmailDraft>> {
    state
        .stores
        .templates
        .get(&id)
        .map(|template| Json(template.value().to_draft()))
        .ok_or_else(|| not_found("email template", &id))
}
