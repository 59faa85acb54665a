//! In-memory stand-in for the Etherpad HTTP API.
//!
//! Serves `GET /api` (version probe) and `GET|POST /api/{version}/{function}`
//! with the same `{code, message, data}` envelope and error codes as the real
//! server. Pad history is kept per revision so `rev` lookups work; realtime
//! features (connected users, client messages) are accepted but inert.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_API_KEY: &str = "mock-api-key";
pub const DEFAULT_VERSION: &str = "1.2.13";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub api_key: String,
    /// Reported as `currentVersion` and the highest accepted endpoint version.
    pub current_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_key: DEFAULT_API_KEY.to_string(),
            current_version: DEFAULT_VERSION.to_string(),
        }
    }
}

type Params = HashMap<String, String>;

/// A non-zero envelope code with its message.
#[derive(Debug)]
struct Failure {
    code: i64,
    message: String,
}

impl Failure {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: 1,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct Session {
    #[serde(rename = "groupID")]
    group_id: String,
    #[serde(rename = "authorID")]
    author_id: String,
    #[serde(rename = "validUntil")]
    valid_until: i64,
}

#[derive(Debug)]
struct Pad {
    /// Text at each revision; revision 0 is the initial text.
    history: Vec<String>,
    read_only_id: String,
    public: bool,
    password: Option<String>,
    last_edited: i64,
    authors: BTreeSet<String>,
}

impl Pad {
    fn new(text: &str) -> Self {
        Self {
            history: vec![normalize_text(text)],
            read_only_id: new_id("r"),
            public: false,
            password: None,
            last_edited: chrono::Utc::now().timestamp_millis(),
            authors: BTreeSet::new(),
        }
    }

    fn head(&self) -> u64 {
        self.history.len() as u64 - 1
    }

    fn push(&mut self, text: &str, author: Option<&str>) {
        self.history.push(normalize_text(text));
        self.last_edited = chrono::Utc::now().timestamp_millis();
        if let Some(author) = author {
            self.authors.insert(author.to_string());
        }
    }

    fn text_at(&self, rev: Option<&str>) -> Result<&str, Failure> {
        let rev = match rev {
            None => self.head(),
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| Failure::invalid("rev is not a number"))?,
        };
        if rev > self.head() {
            return Err(Failure::invalid("rev is higher than the head revision of the pad"));
        }
        Ok(&self.history[rev as usize])
    }
}

#[derive(Debug, Default)]
struct Store {
    groups: BTreeMap<String, BTreeSet<String>>,
    group_mappers: HashMap<String, String>,
    authors: BTreeMap<String, Option<String>>,
    author_mappers: HashMap<String, String>,
    sessions: BTreeMap<String, Session>,
    pads: BTreeMap<String, Pad>,
}

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
    store: Arc<RwLock<Store>>,
}

pub fn app() -> Router {
    app_with(ServerConfig::default())
}

pub fn app_with(config: ServerConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route("/api", get(current_version))
        .route("/api/{version}/{function}", get(call_query).post(call_form))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, ServerConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: ServerConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

async fn current_version(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "currentVersion": state.config.current_version }))
}

async fn call_query(
    State(state): State<AppState>,
    Path((version, function)): Path<(String, String)>,
    Query(params): Query<Params>,
) -> Json<Value> {
    dispatch(state, &version, &function, params).await
}

async fn call_form(
    State(state): State<AppState>,
    Path((version, function)): Path<(String, String)>,
    Form(params): Form<Params>,
) -> Json<Value> {
    dispatch(state, &version, &function, params).await
}

async fn dispatch(state: AppState, version: &str, function: &str, params: Params) -> Json<Value> {
    let result = if params.get("apikey") != Some(&state.config.api_key) {
        Err(Failure {
            code: 4,
            message: "no or wrong API Key".to_string(),
        })
    } else if !version_supported(version, &state.config.current_version) {
        Err(Failure {
            code: 3,
            message: "no such api version".to_string(),
        })
    } else {
        state.store.write().await.handle(function, &params)
    };

    match result {
        Ok(data) => {
            tracing::debug!(function, "api call succeeded");
            Json(json!({ "code": 0, "message": "ok", "data": data }))
        }
        Err(failure) => {
            tracing::debug!(function, code = failure.code, message = %failure.message, "api call failed");
            Json(json!({ "code": failure.code, "message": failure.message, "data": null }))
        }
    }
}

fn version_segments(version: &str) -> Option<Vec<u64>> {
    version.split('.').map(|s| s.parse().ok()).collect()
}

fn version_supported(requested: &str, current: &str) -> bool {
    let (Some(requested), Some(current)) = (version_segments(requested), version_segments(current))
    else {
        return false;
    };
    let len = requested.len().max(current.len());
    let at = |v: &[u64], i: usize| v.get(i).copied().unwrap_or(0);
    (0..len)
        .map(|i| at(&requested, i).cmp(&at(&current, i)))
        .find(|o| o.is_ne())
        .map_or(true, |o| o.is_lt())
}

fn new_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}.{}", &hex[..16])
}

fn required<'a>(params: &'a Params, name: &str) -> Result<&'a str, Failure> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Failure::invalid(format!("{name} is required")))
}

fn optional<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

/// Pads always end with a newline.
fn normalize_text(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

fn text_to_html(text: &str) -> String {
    let escaped = text
        .trim_end_matches('\n')
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\n', "<br>");
    format!("<!DOCTYPE HTML><html><body>{escaped}<br></body></html>")
}

fn html_to_text(html: &str) -> String {
    let html = html
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>", "\n");
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

impl Store {
    fn handle(&mut self, function: &str, p: &Params) -> Result<Value, Failure> {
        match function {
            "checkToken" => Ok(Value::Null),

            "createGroup" => {
                let id = new_id("g");
                self.groups.insert(id.clone(), BTreeSet::new());
                Ok(json!({ "groupID": id }))
            }
            "createGroupIfNotExistsFor" => {
                let mapper = required(p, "groupMapper")?;
                let id = match self.group_mappers.get(mapper) {
                    Some(id) if self.groups.contains_key(id) => id.clone(),
                    _ => {
                        let id = new_id("g");
                        self.groups.insert(id.clone(), BTreeSet::new());
                        self.group_mappers.insert(mapper.to_string(), id.clone());
                        id
                    }
                };
                Ok(json!({ "groupID": id }))
            }
            "deleteGroup" => {
                let group = required(p, "groupID")?;
                let pads = self
                    .groups
                    .remove(group)
                    .ok_or_else(|| Failure::invalid("groupID does not exist"))?;
                for pad in pads {
                    self.pads.remove(&pad);
                }
                self.sessions.retain(|_, s| s.group_id != group);
                self.group_mappers.retain(|_, id| id != group);
                Ok(Value::Null)
            }
            "listPads" => {
                let pads = self.group(required(p, "groupID")?)?;
                Ok(json!({ "padIDs": pads }))
            }
            "createGroupPad" => {
                let group = required(p, "groupID")?.to_string();
                let name = required(p, "padName")?;
                if name.contains('$') {
                    return Err(Failure::invalid("padName must not contain '$'"));
                }
                self.group(&group)?;
                let pad_id = format!("{group}${name}");
                if self.pads.contains_key(&pad_id) {
                    return Err(Failure::invalid("padName does already exist"));
                }
                self.pads
                    .insert(pad_id.clone(), Pad::new(optional(p, "text").unwrap_or_default()));
                if let Some(pads) = self.groups.get_mut(&group) {
                    pads.insert(pad_id.clone());
                }
                Ok(json!({ "padID": pad_id }))
            }
            "listAllGroups" => Ok(json!({ "groupIDs": self.groups.keys().collect::<Vec<_>>() })),

            "createAuthor" => {
                let id = new_id("a");
                self.authors.insert(id.clone(), optional(p, "name").map(str::to_string));
                Ok(json!({ "authorID": id }))
            }
            "createAuthorIfNotExistsFor" => {
                let mapper = required(p, "authorMapper")?;
                let name = optional(p, "name").map(str::to_string);
                let id = match self.author_mappers.get(mapper) {
                    Some(id) => id.clone(),
                    None => {
                        let id = new_id("a");
                        self.author_mappers.insert(mapper.to_string(), id.clone());
                        id
                    }
                };
                let entry = self.authors.entry(id.clone()).or_default();
                if name.is_some() {
                    *entry = name;
                }
                Ok(json!({ "authorID": id }))
            }
            "listPadsOfAuthor" => {
                let author = self.author(required(p, "authorID")?)?;
                let pads: Vec<&String> = self
                    .pads
                    .iter()
                    .filter(|(_, pad)| pad.authors.contains(&author))
                    .map(|(id, _)| id)
                    .collect();
                Ok(json!({ "padIDs": pads }))
            }
            "getAuthorName" => {
                let author = self.author(required(p, "authorID")?)?;
                Ok(json!(self.authors.get(&author).cloned().flatten()))
            }

            "createSession" => {
                let group = required(p, "groupID")?.to_string();
                self.group(&group)?;
                let author = self.author(required(p, "authorID")?)?;
                let valid_until: i64 = required(p, "validUntil")?
                    .parse()
                    .map_err(|_| Failure::invalid("validUntil is not a number"))?;
                if valid_until < chrono::Utc::now().timestamp() {
                    return Err(Failure::invalid("validUntil is in the past"));
                }
                let id = new_id("s");
                self.sessions.insert(
                    id.clone(),
                    Session {
                        group_id: group,
                        author_id: author,
                        valid_until,
                    },
                );
                Ok(json!({ "sessionID": id }))
            }
            "deleteSession" => {
                let id = required(p, "sessionID")?;
                self.sessions
                    .remove(id)
                    .ok_or_else(|| Failure::invalid("sessionID does not exist"))?;
                Ok(Value::Null)
            }
            "getSessionInfo" => {
                let id = required(p, "sessionID")?;
                let session = self
                    .sessions
                    .get(id)
                    .ok_or_else(|| Failure::invalid("sessionID does not exist"))?;
                Ok(json!(session))
            }
            "listSessionsOfGroup" => {
                let group = required(p, "groupID")?.to_string();
                self.group(&group)?;
                Ok(self.sessions_where(|s| s.group_id == group))
            }
            "listSessionsOfAuthor" => {
                let author = self.author(required(p, "authorID")?)?;
                Ok(self.sessions_where(|s| s.author_id == author))
            }

            "getText" => {
                let pad = self.pad(required(p, "padID")?)?;
                let text = pad.text_at(optional(p, "rev"))?;
                Ok(json!({ "text": text }))
            }
            "setText" => {
                let text = p
                    .get("text")
                    .ok_or_else(|| Failure::invalid("text is not a string"))?;
                let author = optional(p, "authorId");
                self.pad_mut(required(p, "padID")?)?.push(text, author);
                Ok(Value::Null)
            }
            "getHTML" => {
                let pad = self.pad(required(p, "padID")?)?;
                let html = text_to_html(pad.text_at(optional(p, "rev"))?);
                Ok(json!({ "html": html }))
            }
            "setHTML" => {
                let html = required(p, "html")?;
                let text = html_to_text(html);
                let author = optional(p, "authorId");
                self.pad_mut(required(p, "padID")?)?.push(&text, author);
                Ok(Value::Null)
            }

            "createPad" => {
                let id = required(p, "padID")?;
                if id.contains('$') {
                    return Err(Failure::invalid("createPad can't create group pads"));
                }
                if self.pads.contains_key(id) {
                    return Err(Failure::invalid("padID does already exist"));
                }
                self.pads
                    .insert(id.to_string(), Pad::new(optional(p, "text").unwrap_or_default()));
                Ok(Value::Null)
            }
            "deletePad" => {
                let id = required(p, "padID")?;
                self.pads
                    .remove(id)
                    .ok_or_else(|| Failure::invalid("padID does not exist"))?;
                for pads in self.groups.values_mut() {
                    pads.remove(id);
                }
                Ok(Value::Null)
            }
            "getRevisionsCount" => {
                let pad = self.pad(required(p, "padID")?)?;
                Ok(json!({ "revisions": pad.head() }))
            }
            "padUsersCount" => {
                self.pad(required(p, "padID")?)?;
                Ok(json!({ "padUsersCount": 0 }))
            }
            "padUsers" => {
                self.pad(required(p, "padID")?)?;
                Ok(json!({ "padUsers": [] }))
            }
            "getLastEdited" => {
                let pad = self.pad(required(p, "padID")?)?;
                Ok(json!({ "lastEdited": pad.last_edited }))
            }
            "getReadOnlyID" => {
                let pad = self.pad(required(p, "padID")?)?;
                Ok(json!({ "readOnlyID": pad.read_only_id }))
            }
            "listAuthorsOfPad" => {
                let pad = self.pad(required(p, "padID")?)?;
                Ok(json!({ "authorIDs": pad.authors }))
            }
            "setPublicStatus" => {
                let public = match required(p, "publicStatus")? {
                    "true" => true,
                    "false" => false,
                    _ => return Err(Failure::invalid("publicStatus must be true or false")),
                };
                self.group_pad_mut(required(p, "padID")?, "publicStatus")?.public = public;
                Ok(Value::Null)
            }
            "getPublicStatus" => {
                let public = self.group_pad_mut(required(p, "padID")?, "publicStatus")?.public;
                Ok(json!({ "publicStatus": public }))
            }
            "setPassword" => {
                let password = optional(p, "password").map(str::to_string);
                self.group_pad_mut(required(p, "padID")?, "password")?.password = password;
                Ok(Value::Null)
            }
            "isPasswordProtected" => {
                let protected = self
                    .group_pad_mut(required(p, "padID")?, "password")?
                    .password
                    .is_some();
                Ok(json!({ "isPasswordProtected": protected }))
            }
            "sendClientsMessage" => {
                required(p, "msg")?;
                self.pad(required(p, "padID")?)?;
                Ok(json!({}))
            }

            _ => Err(Failure {
                code: 3,
                message: "no such function".to_string(),
            }),
        }
    }

    fn group(&self, id: &str) -> Result<&BTreeSet<String>, Failure> {
        self.groups
            .get(id)
            .ok_or_else(|| Failure::invalid("groupID does not exist"))
    }

    fn author(&self, id: &str) -> Result<String, Failure> {
        if self.authors.contains_key(id) {
            Ok(id.to_string())
        } else {
            Err(Failure::invalid("authorID does not exist"))
        }
    }

    fn pad(&self, id: &str) -> Result<&Pad, Failure> {
        self.pads
            .get(id)
            .ok_or_else(|| Failure::invalid("padID does not exist"))
    }

    fn pad_mut(&mut self, id: &str) -> Result<&mut Pad, Failure> {
        self.pads
            .get_mut(id)
            .ok_or_else(|| Failure::invalid("padID does not exist"))
    }

    /// Public status and passwords exist only for group pads.
    fn group_pad_mut(&mut self, id: &str, what: &str) -> Result<&mut Pad, Failure> {
        if !id.contains('$') {
            return Err(Failure::invalid(format!(
                "You can only get/set the {what} of pads that belong to a group"
            )));
        }
        self.pad_mut(id)
    }

    fn sessions_where(&self, keep: impl Fn(&Session) -> bool) -> Value {
        let sessions: BTreeMap<&String, &Session> =
            self.sessions.iter().filter(|(_, s)| keep(s)).collect();
        json!(sessions)
    }
}
