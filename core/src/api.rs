//! Typed operations on the remote pad API.
//!
//! # Design
//! `PadApi` has a single required dispatch method, `call`, and one provided
//! method per remote function. The provided methods fix the function name,
//! marshal the parameters, and pull the interesting field out of `data`, so
//! every implementation (live or stub) exposes the same typed surface. Reads
//! go out as GET, anything that changes server state as POST.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::envelope::Params;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::types::{CookieSink, PadUser, SessionCookie, SessionInfo, SessionSettings};

pub trait PadApi {
    /// Invoke `function` with `params`; the API key is added by the implementation.
    fn call(&self, function: &str, params: Params, method: HttpMethod) -> Result<Value, ApiError>;

    /// Cookie parameters for sessions created through this client.
    fn session_settings(&self) -> &SessionSettings;

    /// Verify that the API key is accepted.
    fn check_token(&self) -> Result<(), ApiError> {
        self.call("checkToken", Params::new(), HttpMethod::Get).map(drop)
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    fn create_group(&self) -> Result<String, ApiError> {
        let data = self.call("createGroup", Params::new(), HttpMethod::Post)?;
        field("createGroup", data, "groupID")
    }

    /// Return the group mapped to `group_mapper`, creating it if needed.
    fn create_group_if_not_exists_for(&self, group_mapper: &str) -> Result<String, ApiError> {
        let params = Params::new().with("groupMapper", group_mapper);
        let data = self.call("createGroupIfNotExistsFor", params, HttpMethod::Post)?;
        field("createGroupIfNotExistsFor", data, "groupID")
    }

    /// Delete a group together with its pads and sessions.
    fn delete_group(&self, group_id: &str) -> Result<(), ApiError> {
        let params = Params::new().with("groupID", group_id);
        self.call("deleteGroup", params, HttpMethod::Post).map(drop)
    }

    fn list_pads(&self, group_id: &str) -> Result<Vec<String>, ApiError> {
        let params = Params::new().with("groupID", group_id);
        let data = self.call("listPads", params, HttpMethod::Get)?;
        field("listPads", data, "padIDs")
    }

    /// Create `{group_id}${pad_name}` and return its pad id.
    fn create_group_pad(
        &self,
        group_id: &str,
        pad_name: &str,
        text: Option<&str>,
    ) -> Result<String, ApiError> {
        let params = Params::new()
            .with("groupID", group_id)
            .with("padName", pad_name)
            .with_opt("text", text);
        let data = self.call("createGroupPad", params, HttpMethod::Post)?;
        field("createGroupPad", data, "padID")
    }

    fn list_all_groups(&self) -> Result<Vec<String>, ApiError> {
        let data = self.call("listAllGroups", Params::new(), HttpMethod::Get)?;
        field("listAllGroups", data, "groupIDs")
    }

    // -----------------------------------------------------------------------
    // Authors
    // -----------------------------------------------------------------------

    fn create_author(&self, name: Option<&str>) -> Result<String, ApiError> {
        let params = Params::new().with_opt("name", name);
        let data = self.call("createAuthor", params, HttpMethod::Post)?;
        field("createAuthor", data, "authorID")
    }

    /// Return the author mapped to a host user id, creating it if needed.
    fn create_author_if_not_exists_for(
        &self,
        author_mapper: &str,
        name: Option<&str>,
    ) -> Result<String, ApiError> {
        let params = Params::new()
            .with("authorMapper", author_mapper)
            .with_opt("name", name);
        let data = self.call("createAuthorIfNotExistsFor", params, HttpMethod::Post)?;
        field("createAuthorIfNotExistsFor", data, "authorID")
    }

    fn list_pads_of_author(&self, author_id: &str) -> Result<Vec<String>, ApiError> {
        let params = Params::new().with("authorID", author_id);
        let data = self.call("listPadsOfAuthor", params, HttpMethod::Get)?;
        field("listPadsOfAuthor", data, "padIDs")
    }

    /// The author's display name; `None` when the author has none.
    ///
    /// Servers return either the bare name or `{"authorName": ...}`.
    fn get_author_name(&self, author_id: &str) -> Result<Option<String>, ApiError> {
        let params = Params::new().with("authorID", author_id);
        match self.call("getAuthorName", params, HttpMethod::Get)? {
            Value::Null => Ok(None),
            Value::String(name) => Ok(Some(name)),
            data @ Value::Object(_) => field("getAuthorName", data, "authorName"),
            other => Err(unexpected("getAuthorName", format!("unexpected data {other}"))),
        }
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Create a session valid for the configured cookie lifetime and hand the
    /// matching `sessionID` cookie to `cookies`.
    fn create_session(
        &self,
        group_id: &str,
        author_id: &str,
        cookies: &dyn CookieSink,
    ) -> Result<SessionCookie, ApiError> {
        let settings = self.session_settings();
        let valid_until = Utc::now().timestamp() + settings.lifetime_secs;
        let params = Params::new()
            .with("groupID", group_id)
            .with("authorID", author_id)
            .with("validUntil", valid_until.to_string());
        let data = self.call("createSession", params, HttpMethod::Post)?;
        let session_id: String = field("createSession", data, "sessionID")?;

        let cookie = SessionCookie::new(session_id, valid_until, settings);
        cookies.set(&cookie);
        Ok(cookie)
    }

    fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let params = Params::new().with("sessionID", session_id);
        self.call("deleteSession", params, HttpMethod::Post).map(drop)
    }

    fn get_session_info(&self, session_id: &str) -> Result<SessionInfo, ApiError> {
        let params = Params::new().with("sessionID", session_id);
        let data = self.call("getSessionInfo", params, HttpMethod::Get)?;
        from_data("getSessionInfo", data)
    }

    /// Sessions of a group keyed by session id.
    fn list_sessions_of_group(&self, group_id: &str) -> Result<BTreeMap<String, SessionInfo>, ApiError> {
        let params = Params::new().with("groupID", group_id);
        let data = self.call("listSessionsOfGroup", params, HttpMethod::Get)?;
        sessions("listSessionsOfGroup", data)
    }

    /// Sessions of an author keyed by session id.
    fn list_sessions_of_author(&self, author_id: &str) -> Result<BTreeMap<String, SessionInfo>, ApiError> {
        let params = Params::new().with("authorID", author_id);
        let data = self.call("listSessionsOfAuthor", params, HttpMethod::Get)?;
        sessions("listSessionsOfAuthor", data)
    }

    // -----------------------------------------------------------------------
    // Pad content
    // -----------------------------------------------------------------------

    /// Pad text at `rev`, or at the latest revision.
    fn get_text(&self, pad_id: &str, rev: Option<u64>) -> Result<String, ApiError> {
        let params = Params::new()
            .with("padID", pad_id)
            .with_opt("rev", rev.map(|r| r.to_string()));
        let data = self.call("getText", params, HttpMethod::Get)?;
        field("getText", data, "text")
    }

    fn set_text(&self, pad_id: &str, text: &str) -> Result<(), ApiError> {
        let params = Params::new().with("padID", pad_id).with("text", text);
        self.call("setText", params, HttpMethod::Post).map(drop)
    }

    /// Pad content as HTML at `rev`, or at the latest revision.
    fn get_html(&self, pad_id: &str, rev: Option<u64>) -> Result<String, ApiError> {
        let params = Params::new()
            .with("padID", pad_id)
            .with_opt("rev", rev.map(|r| r.to_string()));
        let data = self.call("getHTML", params, HttpMethod::Get)?;
        field("getHTML", data, "html")
    }

    fn set_html(&self, pad_id: &str, html: &str) -> Result<(), ApiError> {
        let params = Params::new().with("padID", pad_id).with("html", html);
        self.call("setHTML", params, HttpMethod::Post).map(drop)
    }

    // -----------------------------------------------------------------------
    // Pad lifecycle
    // -----------------------------------------------------------------------

    /// Create a pad outside any group.
    fn create_pad(&self, pad_id: &str, text: Option<&str>) -> Result<(), ApiError> {
        let params = Params::new().with("padID", pad_id).with_opt("text", text);
        self.call("createPad", params, HttpMethod::Post).map(drop)
    }

    fn delete_pad(&self, pad_id: &str) -> Result<(), ApiError> {
        let params = Params::new().with("padID", pad_id);
        self.call("deletePad", params, HttpMethod::Post).map(drop)
    }

    fn get_revisions_count(&self, pad_id: &str) -> Result<u64, ApiError> {
        let params = Params::new().with("padID", pad_id);
        let data = self.call("getRevisionsCount", params, HttpMethod::Get)?;
        field("getRevisionsCount", data, "revisions")
    }

    fn pad_users_count(&self, pad_id: &str) -> Result<u64, ApiError> {
        let params = Params::new().with("padID", pad_id);
        let data = self.call("padUsersCount", params, HttpMethod::Get)?;
        field("padUsersCount", data, "padUsersCount")
    }

    /// Time of the last edit in epoch milliseconds.
    fn get_last_edited(&self, pad_id: &str) -> Result<i64, ApiError> {
        let params = Params::new().with("padID", pad_id);
        let data = self.call("getLastEdited", params, HttpMethod::Get)?;
        field("getLastEdited", data, "lastEdited")
    }

    fn get_read_only_id(&self, pad_id: &str) -> Result<String, ApiError> {
        let params = Params::new().with("padID", pad_id);
        let data = self.call("getReadOnlyID", params, HttpMethod::Get)?;
        field("getReadOnlyID", data, "readOnlyID")
    }

    fn list_authors_of_pad(&self, pad_id: &str) -> Result<Vec<String>, ApiError> {
        let params = Params::new().with("padID", pad_id);
        let data = self.call("listAuthorsOfPad", params, HttpMethod::Get)?;
        field("listAuthorsOfPad", data, "authorIDs")
    }

    /// Only pads that belong to a group have a public status.
    fn set_public_status(&self, pad_id: &str, public: bool) -> Result<(), ApiError> {
        let params = Params::new()
            .with("padID", pad_id)
            .with("publicStatus", if public { "true" } else { "false" });
        self.call("setPublicStatus", params, HttpMethod::Post).map(drop)
    }

    fn get_public_status(&self, pad_id: &str) -> Result<bool, ApiError> {
        let params = Params::new().with("padID", pad_id);
        let data = self.call("getPublicStatus", params, HttpMethod::Get)?;
        field("getPublicStatus", data, "publicStatus")
    }

    fn set_password(&self, pad_id: &str, password: &str) -> Result<(), ApiError> {
        let params = Params::new().with("padID", pad_id).with("password", password);
        self.call("setPassword", params, HttpMethod::Post).map(drop)
    }

    fn is_password_protected(&self, pad_id: &str) -> Result<bool, ApiError> {
        let params = Params::new().with("padID", pad_id);
        let data = self.call("isPasswordProtected", params, HttpMethod::Get)?;
        field("isPasswordProtected", data, "isPasswordProtected")
    }

    fn pad_users(&self, pad_id: &str) -> Result<Vec<PadUser>, ApiError> {
        let params = Params::new().with("padID", pad_id);
        let data = self.call("padUsers", params, HttpMethod::Get)?;
        field("padUsers", data, "padUsers")
    }

    /// Broadcast `msg` to every client connected to the pad.
    fn send_clients_message(&self, pad_id: &str, msg: &str) -> Result<(), ApiError> {
        let params = Params::new().with("padID", pad_id).with("msg", msg);
        self.call("sendClientsMessage", params, HttpMethod::Post).map(drop)
    }
}

fn unexpected(function: &str, reason: String) -> ApiError {
    ApiError::UnexpectedData {
        function: function.to_string(),
        reason,
    }
}

fn from_data<T: DeserializeOwned>(function: &str, data: Value) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|e| unexpected(function, e.to_string()))
}

/// Deserialize `data[name]`.
fn field<T: DeserializeOwned>(function: &str, mut data: Value, name: &str) -> Result<T, ApiError> {
    let value = data
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| unexpected(function, format!("missing field '{name}'")))?;
    from_data(function, value)
}

/// `null` means no sessions; null entries are skipped.
fn sessions(function: &str, data: Value) -> Result<BTreeMap<String, SessionInfo>, ApiError> {
    if data.is_null() {
        return Ok(BTreeMap::new());
    }
    let entries: BTreeMap<String, Option<SessionInfo>> = from_data(function, data)?;
    Ok(entries
        .into_iter()
        .filter_map(|(id, info)| info.map(|info| (id, info)))
        .collect())
}
