//! Controller targets.
//!
//! A route whose target names a registered controller gets a fresh instance
//! per request from a zero-argument factory. What happens next depends on the
//! variant the factory returns:
//!
//! - [`Controller::Service`]: the service processes the request itself
//! - [`Controller::Page`]: the page renders
//! - [`Controller::Actions`]: the route's `action` is invoked by name

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::context::RequestContext;

/// A web service that handles its own method routing and output.
pub trait WebService: Send {
    fn process(&mut self, ctx: &mut RequestContext);
}

/// A page that renders into the response.
pub trait Page: Send {
    fn render(&mut self, ctx: &mut RequestContext);
}

/// A controller with named actions.
pub trait ActionController: Send {
    /// Run `action`. Returns false if the controller has no such action.
    fn call_action(&mut self, action: &str, ctx: &mut RequestContext) -> bool;
}

/// A freshly instantiated controller.
pub enum Controller {
    Service(Box<dyn WebService>),
    Page(Box<dyn Page>),
    Actions(Box<dyn ActionController>),
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Controller::Service(_) => "Service",
            Controller::Page(_) => "Page",
            Controller::Actions(_) => "Actions",
        };
        f.write_str(variant)
    }
}

pub type ControllerFactory = Arc<dyn Fn() -> Controller + Send + Sync>;

/// Controllers by name.
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Controller + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(controller = %name, "Controller registered");
        self.factories.insert(name, Arc::new(factory));
    }

    pub fn register_service<T>(&mut self, name: impl Into<String>)
    where
        T: WebService + Default + 'static,
    {
        self.register(name, || Controller::Service(Box::new(T::default())));
    }

    pub fn register_page<T>(&mut self, name: impl Into<String>)
    where
        T: Page + Default + 'static,
    {
        self.register(name, || Controller::Page(Box::new(T::default())));
    }

    pub fn register_actions<T>(&mut self, name: impl Into<String>)
    where
        T: ActionController + Default + 'static,
    {
        self.register(name, || Controller::Actions(Box::new(T::default())));
    }

    pub fn get(&self, name: &str) -> Option<ControllerFactory> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[derive(Default)]
    struct Users {
        calls: usize,
    }

    impl ActionController for Users {
        fn call_action(&mut self, action: &str, ctx: &mut RequestContext) -> bool {
            self.calls += 1;
            match action {
                "list" => {
                    ctx.response_mut().write(format!("list #{}", self.calls));
                    true
                }
                _ => false,
            }
        }
    }

    #[test]
    fn test_each_request_gets_a_fresh_instance() {
        let mut registry = ControllerRegistry::new();
        registry.register_actions::<Users>("Users");
        let factory = registry.get("Users").unwrap();

        for _ in 0..2 {
            let mut ctx = RequestContext::new(Method::GET, "/users");
            match factory() {
                Controller::Actions(mut c) => assert!(c.call_action("list", &mut ctx)),
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!(ctx.response().body_text(), "list #1");
        }
    }

    #[test]
    fn test_lookup() {
        let mut registry = ControllerRegistry::new();
        registry.register_actions::<Users>("Users");
        assert!(registry.contains("Users"));
        assert!(registry.get("Missing").is_none());
        assert_eq!(registry.names(), ["Users"]);
    }
}
