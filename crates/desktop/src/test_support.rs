//! In-process fake of the ERP user service for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use erpdesk_auth::{Credentials, NewUser, Role, User, UserUpdate};
use erpdesk_core::UserId;

use crate::http::{ApiRequest, ApiResponse, Method, Transport, TransportError};

#[derive(Default)]
struct State {
    accounts: Vec<(User, String)>,
    next_id: i64,
    token_seq: u64,
    access: HashMap<String, UserId>,
    refresh: HashMap<String, UserId>,
    reject_all_access: bool,
    failures: HashMap<(Method, String), u16>,
    unreachable: HashSet<(Method, String)>,
    calls: Vec<String>,
}

pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub const UNAUTHORIZED_BODY: &'static str =
        r#"{"detail":"Given token not valid for any token type"}"#;

    /// Demo accounts plus two extra employees.
    pub fn seeded() -> Arc<Self> {
        let backend = Self {
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
        };
        backend.add_account("admin", "admin@123", Role::Admin);
        backend.add_account("manager", "manager@123", Role::Manager);
        backend.add_account("user", "user@123", Role::Employee);
        backend.add_account("erin", "erin@123", Role::Employee);
        backend.add_account("evan", "evan@123", Role::Employee);
        Arc::new(backend)
    }

    fn add_account(&self, username: &str, password: &str, role: Role) -> User {
        let mut state = self.state.lock().unwrap();
        let user = User {
            id: UserId::new(state.next_id),
            username: username.to_string(),
            email: format!("{username}@erp.local"),
            first_name: capitalize(username),
            last_name: "Test".to_string(),
            role,
        };
        state.next_id += 1;
        state.accounts.push((user.clone(), password.to_string()));
        user
    }

    /// Mint a token pair for `username` without recording a call.
    pub fn issue_tokens(&self, username: &str) -> Credentials {
        let mut state = self.state.lock().unwrap();
        let id = state
            .accounts
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, _)| u.id)
            .expect("unknown account");
        mint_pair(&mut state, id)
    }

    pub fn expire_access_tokens(&self) {
        self.state.lock().unwrap().access.clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.state.lock().unwrap().refresh.clear();
    }

    pub fn reject_every_access_token(&self) {
        self.state.lock().unwrap().reject_all_access = true;
    }

    /// Answer every `method path` request with `status` from now on.
    pub fn fail(&self, method: Method, path: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((method, path.to_string()), status);
    }

    /// Fail every `method path` request at the transport level from now on.
    pub fn disconnect(&self, method: Method, path: &str) {
        self.state
            .lock()
            .unwrap()
            .unreachable
            .insert((method, path.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn users(&self) -> Vec<User> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .iter()
            .map(|(u, _)| u.clone())
            .collect()
    }

    pub fn user_named(&self, username: &str) -> User {
        self.users()
            .into_iter()
            .find(|u| u.username == username)
            .expect("unknown account")
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("{} {}", request.method, request.path));

        if state.unreachable.contains(&(request.method, request.path.clone())) {
            return Err(TransportError(format!("connection reset: {}", request.path)));
        }
        if let Some(status) = state.failures.get(&(request.method, request.path.clone())) {
            return Ok(ApiResponse::new(*status, r#"{"detail":"injected failure"}"#));
        }

        let body = request.body.clone().unwrap_or(Value::Null);
        Ok(route(&mut state, request, body))
    }
}

fn route(state: &mut State, request: &ApiRequest, body: Value) -> ApiResponse {
    match (request.method, request.path.as_str()) {
        (Method::Post, "/login/") => login(state, &body),
        (Method::Post, "/token/refresh/") => refresh(state, &body),
        _ => {
            let Some(caller) = authenticate(state, request) else {
                return ApiResponse::new(401, FakeBackend::UNAUTHORIZED_BODY);
            };
            authenticated_route(state, request, caller, body)
        }
    }
}

fn authenticated_route(state: &mut State, request: &ApiRequest, caller: User, body: Value) -> ApiResponse {
    match (request.method, request.path.as_str()) {
        (Method::Get, "/profile/") => ok(200, &caller),
        (Method::Post, "/logout/") => {
            if let Some(token) = body.get("refresh").and_then(Value::as_str) {
                state.refresh.remove(token);
            }
            ApiResponse::new(205, "")
        }
        (Method::Get, "/users/") => match caller.role {
            Role::Admin => ok(200, &all_users(state)),
            Role::Manager => {
                let employees: Vec<User> = all_users(state)
                    .into_iter()
                    .filter(|u| u.role == Role::Employee)
                    .collect();
                ok(200, &employees)
            }
            Role::Employee => forbidden(),
        },
        (Method::Post, "/users/create/") => {
            if caller.role != Role::Admin {
                return forbidden();
            }
            let Ok(new_user) = serde_json::from_value::<NewUser>(body) else {
                return ApiResponse::new(400, r#"{"detail":"bad payload"}"#);
            };
            let user = User {
                id: UserId::new(state.next_id),
                username: new_user.username,
                email: new_user.email,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                role: new_user.role,
            };
            state.next_id += 1;
            state.accounts.push((user.clone(), new_user.password));
            ok(201, &user)
        }
        (method, path) if path.starts_with("/users/") => {
            if caller.role != Role::Admin {
                return forbidden();
            }
            let Some(id) = path
                .trim_start_matches("/users/")
                .trim_end_matches('/')
                .parse::<UserId>()
                .ok()
            else {
                return not_found();
            };
            let Some(index) = state.accounts.iter().position(|(u, _)| u.id == id) else {
                return not_found();
            };
            match method {
                Method::Get => ok(200, &state.accounts[index].0),
                Method::Put => {
                    let Ok(update) = serde_json::from_value::<UserUpdate>(body) else {
                        return ApiResponse::new(400, r#"{"detail":"bad payload"}"#);
                    };
                    let user = &mut state.accounts[index].0;
                    user.username = update.username;
                    user.email = update.email;
                    user.first_name = update.first_name;
                    user.last_name = update.last_name;
                    user.role = update.role;
                    let user = user.clone();
                    ok(200, &user)
                }
                Method::Delete => {
                    state.accounts.remove(index);
                    ApiResponse::new(204, "")
                }
                Method::Post => ApiResponse::new(405, r#"{"detail":"Method not allowed."}"#),
            }
        }
        _ => not_found(),
    }
}

fn login(state: &mut State, body: &Value) -> ApiResponse {
    let username = body.get("username").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    let account = state
        .accounts
        .iter()
        .find(|(u, p)| u.username == username && p == password)
        .map(|(u, _)| u.id);
    match account {
        Some(id) => {
            let pair = mint_pair(state, id);
            ok(200, &json!({"access": pair.access_token, "refresh": pair.refresh_token}))
        }
        None => ApiResponse::new(
            401,
            r#"{"detail":"No active account found with the given credentials"}"#,
        ),
    }
}

fn refresh(state: &mut State, body: &Value) -> ApiResponse {
    let token = body.get("refresh").and_then(Value::as_str).unwrap_or_default();
    match state.refresh.get(token).copied() {
        Some(id) => {
            state.token_seq += 1;
            let access = format!("access-{}-{}", id, state.token_seq);
            state.access.insert(access.clone(), id);
            ok(200, &json!({"access": access}))
        }
        None => ApiResponse::new(
            401,
            r#"{"detail":"Token is invalid or expired","code":"token_not_valid"}"#,
        ),
    }
}

fn authenticate(state: &State, request: &ApiRequest) -> Option<User> {
    if state.reject_all_access {
        return None;
    }
    let id = state.access.get(request.bearer.as_deref()?)?;
    state
        .accounts
        .iter()
        .find(|(u, _)| u.id == *id)
        .map(|(u, _)| u.clone())
}

fn mint_pair(state: &mut State, id: UserId) -> Credentials {
    state.token_seq += 1;
    let access = format!("access-{}-{}", id, state.token_seq);
    let refresh = format!("refresh-{}-{}", id, state.token_seq);
    state.access.insert(access.clone(), id);
    state.refresh.insert(refresh.clone(), id);
    Credentials::new(access, refresh)
}

fn all_users(state: &State) -> Vec<User> {
    state.accounts.iter().map(|(u, _)| u.clone()).collect()
}

fn ok<T: serde::Serialize>(status: u16, value: &T) -> ApiResponse {
    ApiResponse::new(status, serde_json::to_string(value).unwrap())
}

fn forbidden() -> ApiResponse {
    ApiResponse::new(
        403,
        r#"{"detail":"You do not have permission to perform this action."}"#,
    )
}

fn not_found() -> ApiResponse {
    ApiResponse::new(404, r#"{"detail":"Not found."}"#)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
