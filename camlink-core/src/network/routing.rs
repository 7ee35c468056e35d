// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Batch Routing
//!
//! Decides between GET and POST and builds the query string for a batch.
//!
//! Feature areas register [`ForceGetPredicate`]s on the transport client.
//! Every predicate sees the outgoing batch; GET is used if any predicate
//! asks for it, and the last predicate supplying a query wins.

use serde_json::Value;
use url::form_urlencoded;

use super::transport::HttpMethod;
use crate::command::{Request, LOGIN_COMMAND, SNAPSHOT_COMMAND};

/// Information predicates may use to build a query.
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    /// Current bearer token, if authenticated.
    pub token: Option<String>,
}

/// What one predicate wants for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDecision {
    /// Send this batch with GET.
    pub force_get: bool,
    /// Replacement query string (without the leading `?`).
    pub query: Option<String>,
}

impl RouteDecision {
    /// No opinion about this batch.
    pub fn pass() -> Self {
        Self::default()
    }
}

/// Per-feature rule overriding the default POST routing.
pub trait ForceGetPredicate: Send + Sync {
    fn route(&self, requests: &[Request], context: &RouteContext) -> RouteDecision;
}

/// Final routing of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub method: HttpMethod,
    pub query: String,
}

impl ResolvedRoute {
    pub fn is_get(&self) -> bool {
        self.method == HttpMethod::Get
    }
}

/// Evaluates all predicates in order and falls back to the default query.
pub fn resolve_route(
    predicates: &[std::sync::Arc<dyn ForceGetPredicate>],
    requests: &[Request],
    context: &RouteContext,
) -> ResolvedRoute {
    let mut use_get = false;
    let mut query = None;

    for predicate in predicates {
        let decision = predicate.route(requests, context);
        use_get |= decision.force_get;
        if decision.query.is_some() {
            query = decision.query;
        }
    }

    let query = query.unwrap_or_else(|| default_query(requests, context, use_get));
    ResolvedRoute {
        method: if use_get {
            HttpMethod::Get
        } else {
            HttpMethod::Post
        },
        query,
    }
}

/// `cmd=<first command>[&<params>]&token=<token>`.
///
/// Parameters of the first request are only flattened into the query for GET.
pub fn default_query(requests: &[Request], context: &RouteContext, use_get: bool) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(first) = requests.first() {
        query.append_pair("cmd", first.command());
        if use_get {
            for (key, value) in first.parameters() {
                query.append_pair(key, &query_value(value));
            }
        }
    }
    if let Some(token) = &context.token {
        query.append_pair("token", token);
    }
    query.finish()
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Login batches go to `?cmd=Login` with no token.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoginRoute;

impl ForceGetPredicate for LoginRoute {
    fn route(&self, requests: &[Request], _context: &RouteContext) -> RouteDecision {
        if requests.iter().any(Request::is_login) {
            RouteDecision {
                force_get: false,
                query: Some(format!("cmd={LOGIN_COMMAND}")),
            }
        } else {
            RouteDecision::pass()
        }
    }
}

/// Snapshot requests are fetched with GET and return JPEG bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotRoute;

impl ForceGetPredicate for SnapshotRoute {
    fn route(&self, requests: &[Request], context: &RouteContext) -> RouteDecision {
        let [request] = requests else {
            return RouteDecision::pass();
        };
        if request.command() != SNAPSHOT_COMMAND {
            return RouteDecision::pass();
        }

        let channel = request
            .param("channel")
            .map(query_value)
            .unwrap_or_else(|| "0".to_string());
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("cmd", SNAPSHOT_COMMAND);
        query.append_pair("channel", &channel);
        // Cache buster, the device ignores its value.
        query.append_pair("rs", &uuid::Uuid::new_v4().simple().to_string()[..16]);
        if let Some(token) = &context.token {
            query.append_pair("token", token);
        }

        RouteDecision {
            force_get: true,
            query: Some(query.finish()),
        }
    }
}
