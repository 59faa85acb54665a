//! Falsy-result calling convention for existing callers.
//!
//! # Design
//! Older callers expect every operation to return `false` (actions) or an
//! empty value (getters) on failure, without distinguishing transport errors,
//! malformed responses, and remote error codes. `LegacyClient` adapts any
//! [`PadApi`] to that convention; the structured error is logged and dropped
//! here and nowhere else. A `false` from `is_password_protected` or
//! `get_public_status` is therefore ambiguous, exactly as before. New code
//! should call [`PadApi`] directly.

use std::collections::BTreeMap;

use tracing::debug;

use crate::api::PadApi;
use crate::error::ApiError;
use crate::types::{CookieSink, PadUser, SessionInfo};

pub struct LegacyClient<'a, C: PadApi + ?Sized> {
    inner: &'a C,
}

impl<C: PadApi + ?Sized> Clone for LegacyClient<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: PadApi + ?Sized> Copy for LegacyClient<'_, C> {}

fn collapse<T>(function: &str, result: Result<T, ApiError>) -> Option<T> {
    result
        .inspect_err(|err| debug!(function, error = %err, "collapsing pad API failure"))
        .ok()
}

fn succeeded(function: &str, result: Result<(), ApiError>) -> bool {
    collapse(function, result).is_some()
}

impl<'a, C: PadApi + ?Sized> LegacyClient<'a, C> {
    pub fn new(inner: &'a C) -> Self {
        Self { inner }
    }

    pub fn check_token(&self) -> bool {
        succeeded("checkToken", self.inner.check_token())
    }

    pub fn create_group(&self) -> Option<String> {
        collapse("createGroup", self.inner.create_group())
    }

    pub fn create_group_if_not_exists_for(&self, group_mapper: &str) -> Option<String> {
        collapse(
            "createGroupIfNotExistsFor",
            self.inner.create_group_if_not_exists_for(group_mapper),
        )
    }

    pub fn delete_group(&self, group_id: &str) -> bool {
        succeeded("deleteGroup", self.inner.delete_group(group_id))
    }

    pub fn list_pads(&self, group_id: &str) -> Option<Vec<String>> {
        collapse("listPads", self.inner.list_pads(group_id))
    }

    pub fn create_group_pad(&self, group_id: &str, pad_name: &str, text: Option<&str>) -> Option<String> {
        collapse(
            "createGroupPad",
            self.inner.create_group_pad(group_id, pad_name, text),
        )
    }

    pub fn list_all_groups(&self) -> Option<Vec<String>> {
        collapse("listAllGroups", self.inner.list_all_groups())
    }

    pub fn create_author(&self, name: Option<&str>) -> Option<String> {
        collapse("createAuthor", self.inner.create_author(name))
    }

    pub fn create_author_if_not_exists_for(&self, author_mapper: &str, name: Option<&str>) -> Option<String> {
        collapse(
            "createAuthorIfNotExistsFor",
            self.inner.create_author_if_not_exists_for(author_mapper, name),
        )
    }

    pub fn list_pads_of_author(&self, author_id: &str) -> Option<Vec<String>> {
        collapse("listPadsOfAuthor", self.inner.list_pads_of_author(author_id))
    }

    pub fn get_author_name(&self, author_id: &str) -> Option<String> {
        collapse("getAuthorName", self.inner.get_author_name(author_id)).flatten()
    }

    /// `true` once the session exists and its cookie was handed to `cookies`.
    pub fn create_session(&self, group_id: &str, author_id: &str, cookies: &dyn CookieSink) -> bool {
        collapse(
            "createSession",
            self.inner.create_session(group_id, author_id, cookies),
        )
        .is_some()
    }

    pub fn delete_session(&self, session_id: &str) -> bool {
        succeeded("deleteSession", self.inner.delete_session(session_id))
    }

    pub fn get_session_info(&self, session_id: &str) -> Option<SessionInfo> {
        collapse("getSessionInfo", self.inner.get_session_info(session_id))
    }

    pub fn list_sessions_of_group(&self, group_id: &str) -> Option<BTreeMap<String, SessionInfo>> {
        collapse("listSessionsOfGroup", self.inner.list_sessions_of_group(group_id))
    }

    pub fn list_sessions_of_author(&self, author_id: &str) -> Option<BTreeMap<String, SessionInfo>> {
        collapse("listSessionsOfAuthor", self.inner.list_sessions_of_author(author_id))
    }

    pub fn get_text(&self, pad_id: &str, rev: Option<u64>) -> Option<String> {
        collapse("getText", self.inner.get_text(pad_id, rev))
    }

    pub fn set_text(&self, pad_id: &str, text: &str) -> bool {
        succeeded("setText", self.inner.set_text(pad_id, text))
    }

    pub fn get_html(&self, pad_id: &str, rev: Option<u64>) -> Option<String> {
        collapse("getHTML", self.inner.get_html(pad_id, rev))
    }

    pub fn set_html(&self, pad_id: &str, html: &str) -> bool {
        succeeded("setHTML", self.inner.set_html(pad_id, html))
    }

    pub fn create_pad(&self, pad_id: &str, text: Option<&str>) -> bool {
        succeeded("createPad", self.inner.create_pad(pad_id, text))
    }

    pub fn delete_pad(&self, pad_id: &str) -> bool {
        succeeded("deletePad", self.inner.delete_pad(pad_id))
    }

    pub fn get_revisions_count(&self, pad_id: &str) -> Option<u64> {
        collapse("getRevisionsCount", self.inner.get_revisions_count(pad_id))
    }

    pub fn pad_users_count(&self, pad_id: &str) -> Option<u64> {
        collapse("padUsersCount", self.inner.pad_users_count(pad_id))
    }

    pub fn get_last_edited(&self, pad_id: &str) -> Option<i64> {
        collapse("getLastEdited", self.inner.get_last_edited(pad_id))
    }

    pub fn get_read_only_id(&self, pad_id: &str) -> Option<String> {
        collapse("getReadOnlyID", self.inner.get_read_only_id(pad_id))
    }

    pub fn list_authors_of_pad(&self, pad_id: &str) -> Option<Vec<String>> {
        collapse("listAuthorsOfPad", self.inner.list_authors_of_pad(pad_id))
    }

    pub fn set_public_status(&self, pad_id: &str, public: bool) -> bool {
        succeeded("setPublicStatus", self.inner.set_public_status(pad_id, public))
    }

    pub fn get_public_status(&self, pad_id: &str) -> bool {
        collapse("getPublicStatus", self.inner.get_public_status(pad_id)).unwrap_or(false)
    }

    pub fn set_password(&self, pad_id: &str, password: &str) -> bool {
        succeeded("setPassword", self.inner.set_password(pad_id, password))
    }

    pub fn is_password_protected(&self, pad_id: &str) -> bool {
        collapse("isPasswordProtected", self.inner.is_password_protected(pad_id)).unwrap_or(false)
    }

    pub fn pad_users(&self, pad_id: &str) -> Option<Vec<PadUser>> {
        collapse("padUsers", self.inner.pad_users(pad_id))
    }

    pub fn send_clients_message(&self, pad_id: &str, msg: &str) -> bool {
        succeeded("sendClientsMessage", self.inner.send_clients_message(pad_id, msg))
    }
}
