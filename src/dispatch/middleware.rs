//! Route middleware.
//!
//! # Responsibilities
//! - Register middleware by name and attach it to named groups
//! - Resolve a route's middleware/group list into an ordered chain
//!
//! # Design Decisions
//! - Every route carries the implicit `global` group
//! - Lower priority value runs earlier; equal priorities keep the order in
//!   which the route named them (stable sort)
//! - A middleware named twice (directly or through groups) runs once

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::context::RequestContext;

/// Group every route belongs to.
pub const GLOBAL_GROUP: &str = "global";

/// Hooks run around a route target.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs earlier.
    fn priority(&self) -> i32 {
        0
    }

    fn before(&self, ctx: &mut RequestContext);

    fn after(&self, _ctx: &mut RequestContext) {}
}

type Hook = Box<dyn Fn(&mut RequestContext) + Send + Sync>;

/// Middleware built from closures.
pub struct FnMiddleware {
    name: String,
    priority: i32,
    before: Hook,
    after: Option<Hook>,
}

impl FnMiddleware {
    pub fn new<F>(name: impl Into<String>, before: F) -> Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            priority: 0,
            before: Box::new(before),
            after: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_after<F>(mut self, after: F) -> Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.after = Some(Box::new(after));
        self
    }
}

impl Middleware for FnMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn before(&self, ctx: &mut RequestContext) {
        (self.before)(ctx)
    }

    fn after(&self, ctx: &mut RequestContext) {
        if let Some(after) = &self.after {
            after(ctx)
        }
    }
}

impl fmt::Debug for FnMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Middleware instances by name, plus group membership.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: Vec<Arc<dyn Middleware>>,
    /// Group name -> member middleware names, in registration order.
    groups: HashMap<String, Vec<String>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a middleware addressable by its own name. A later
    /// registration with the same name replaces the earlier one.
    pub fn register(&mut self, middleware: Arc<dyn Middleware>) {
        self.entries.retain(|m| m.name() != middleware.name());
        tracing::debug!(name = %middleware.name(), priority = middleware.priority(), "Middleware registered");
        self.entries.push(middleware);
    }

    /// Register a middleware and add it to each of `groups`.
    pub fn register_in(&mut self, middleware: Arc<dyn Middleware>, groups: &[&str]) {
        let name = middleware.name().to_string();
        self.register(middleware);
        for group in groups {
            let members = self.groups.entry((*group).to_string()).or_default();
            if !members.contains(&name) {
                members.push(name.clone());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.entries.iter().find(|m| m.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered chain for a route's middleware and group names. Unknown names
    /// are skipped.
    pub fn resolve(&self, names: &[String]) -> Vec<Arc<dyn Middleware>> {
        let mut chain: Vec<Arc<dyn Middleware>> = Vec::new();
        let mut push = |m: Arc<dyn Middleware>| {
            if !chain.iter().any(|c| c.name() == m.name()) {
                chain.push(m);
            }
        };

        for name in names {
            if let Some(m) = self.get(name) {
                push(m);
            }
            if let Some(members) = self.groups.get(name) {
                for member in members {
                    if let Some(m) = self.get(member) {
                        push(m);
                    }
                }
            }
        }

        chain.sort_by_key(|m| m.priority());
        chain
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("entries", &self.entries.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("groups", &self.groups)
            .finish()
    }
}
