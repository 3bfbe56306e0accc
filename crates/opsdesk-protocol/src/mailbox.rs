//! Mailbox views and message templates

use opsdesk_core::types::{Email, EmailFolder, EmailTemplate};
use opsdesk_core::utils::{contains_folded, normalize_search};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether `email` is listed under `folder`. Starred is a view over every
/// folder except trash.
#[must_use]
pub fn in_folder(email: &Email, folder: EmailFolder) -> bool {
    match folder {
        EmailFolder::Starred => email.starred && email.folder != EmailFolder::Trash,
        other => email.folder == other,
    }
}

/// Messages listed under `folder` that match `search` in sender, subject or
/// body
#[must_use]
pub fn filter_emails<'a>(emails: &'a [Email], folder: EmailFolder, search: &str) -> Vec<&'a Email> {
    let term = normalize_search(search);
    emails
        .iter()
        .filter(|email| in_folder(email, folder))
        .filter(|email| {
            term.as_deref().is_none_or(|term| {
                contains_folded(&email.from, term)
                    || contains_folded(&email.subject, term)
                    || contains_folded(&email.body, term)
            })
        })
        .collect()
}

/// Unread messages per folder, every folder present
#[must_use]
pub fn unread_counts(emails: &[Email]) -> BTreeMap<EmailFolder, usize> {
    EmailFolder::ALL
        .iter()
        .map(|folder| {
            let unread = emails
                .iter()
                .filter(|e| !e.read && in_folder(e, *folder))
                .count();
            (*folder, unread)
        })
        .collect()
}

/// A message prepared from a template, ready for editing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDraft {
    /// Template the draft came from
    pub template_id: String,
    /// Subject line
    pub subject: String,
    /// Body text
    pub body: String,
    /// Placeholders still present in subject or body
    pub placeholders: Vec<String>,
}

/// Draft and placeholder helpers for [`EmailTemplate`]
pub trait TemplateExt {
    /// Copy subject and body verbatim; placeholders stay as written
    fn to_draft(&self) -> EmailDraft;

    /// Distinct `{{name}}` tokens in subject then body, in order of first
    /// appearance
    fn placeholders(&self) -> Vec<String>;
}

impl TemplateExt for EmailTemplate {
    fn to_draft(&self) -> EmailDraft {
        EmailDraft {
            template_id: self.id.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
            placeholders: self.placeholders(),
        }
    }

    fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for text in [&self.subject, &self.body] {
            for name in scan_placeholders(text) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

fn scan_placeholders(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some((_, after)) = rest.split_once("{{") {
        let Some((name, tail)) = after.split_once("}}") else {
            break;
        };
        let name = name.trim();
        if !name.is_empty() && !name.contains('{') {
            found.push(name);
        }
        rest = tail;
    }
    found
}
