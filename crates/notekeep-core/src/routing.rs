//! Screen locations and navigation.
//!
//! Routes are addressed by path (`/notes/5`) or by path segments
//! (`["notes", "5"]`). The root route has no segments.

use std::fmt;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::auth::SessionEvent;

/// Entry screen for unauthenticated users
pub const LOGIN_PATH: &str = "/login";

/// Registration screen, also reachable without a session
pub const REGISTER_PATH: &str = "/register";

/// Protected landing screen
pub const LANDING_PATH: &str = "/notes";

/// Every screen of the app.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Login,
    Register,
    Notes,
    NoteCreate,
    Note(i64),
    Categories,
    CategoryCreate,
    Category(i64),
    Favorites,
    /// A path that does not name a known screen
    Other(Vec<String>),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::from_segments(&segments)
    }

    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let parts: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
        match parts.as_slice() {
            [] => Route::Root,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["notes"] => Route::Notes,
            ["notes", "create"] => Route::NoteCreate,
            ["notes", id] => match id.parse() {
                Ok(id) => Route::Note(id),
                Err(_) => Route::other(&parts),
            },
            ["categories"] => Route::Categories,
            ["categories", "create"] => Route::CategoryCreate,
            ["categories", id] => match id.parse() {
                Ok(id) => Route::Category(id),
                Err(_) => Route::other(&parts),
            },
            ["favorites"] => Route::Favorites,
            _ => Route::other(&parts),
        }
    }

    fn other(parts: &[&str]) -> Self {
        Route::Other(parts.iter().map(|s| s.to_string()).collect())
    }

    pub fn segments(&self) -> Vec<String> {
        match self {
            Route::Root => Vec::new(),
            Route::Login => vec!["login".into()],
            Route::Register => vec!["register".into()],
            Route::Notes => vec!["notes".into()],
            Route::NoteCreate => vec!["notes".into(), "create".into()],
            Route::Note(id) => vec!["notes".into(), id.to_string()],
            Route::Categories => vec!["categories".into()],
            Route::CategoryCreate => vec!["categories".into(), "create".into()],
            Route::Category(id) => vec!["categories".into(), id.to_string()],
            Route::Favorites => vec!["favorites".into()],
            Route::Other(segments) => segments.clone(),
        }
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Route::Root)
    }

    /// Screens reachable without a session: anything under `login` or
    /// `register`.
    pub fn is_public(&self) -> bool {
        matches!(
            self.segments().first().map(String::as_str),
            Some("login") | Some("register")
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Current screen location plus imperative navigation.
pub trait RouteObserver: Send + Sync {
    /// Path segments of the current location
    fn segments(&self) -> Vec<String>;

    /// Navigate to `path`, replacing the current history entry.
    fn replace(&self, path: &str);

    /// Navigate to `path`, keeping the current entry in history.
    fn push(&self, path: &str);

    fn current_route(&self) -> Route {
        Route::from_segments(&self.segments())
    }
}

impl<T: RouteObserver + ?Sized> RouteObserver for std::sync::Arc<T> {
    fn segments(&self) -> Vec<String> {
        (**self).segments()
    }

    fn replace(&self, path: &str) {
        (**self).replace(path)
    }

    fn push(&self, path: &str) {
        (**self).push(path)
    }
}

/// In-memory navigation stack.
pub struct MemoryRouter {
    history: Mutex<Vec<Route>>,
    notifier: Mutex<Option<mpsc::Sender<SessionEvent>>>,
}

impl MemoryRouter {
    /// Router positioned at the root route.
    pub fn new() -> Self {
        Self::at(Route::Root)
    }

    pub fn at(route: Route) -> Self {
        Self {
            history: Mutex::new(vec![route]),
            notifier: Mutex::new(None),
        }
    }

    /// Publish a `RouteChanged` event on every navigation.
    pub fn attach(&self, tx: mpsc::Sender<SessionEvent>) {
        *self.notifier.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
    }

    fn history(&self) -> std::sync::MutexGuard<'_, Vec<Route>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> Route {
        self.history().last().cloned().unwrap_or(Route::Root)
    }

    pub fn depth(&self) -> usize {
        self.history().len()
    }

    /// Pop one entry. Returns false when already at the first entry.
    pub fn back(&self) -> bool {
        let popped = {
            let mut history = self.history();
            if history.len() > 1 {
                history.pop();
                true
            } else {
                false
            }
        };
        if popped {
            self.notify();
        }
        popped
    }

    fn notify(&self) {
        let route = self.current();
        let notifier = self.notifier.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref tx) = *notifier {
            if let Err(e) = tx.try_send(SessionEvent::RouteChanged(route)) {
                warn!(error = %e, "Dropped route change notification");
            }
        }
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteObserver for MemoryRouter {
    fn segments(&self) -> Vec<String> {
        self.current().segments()
    }

    fn replace(&self, path: &str) {
        let route = Route::parse(path);
        debug!(%route, "Replacing route");
        {
            let mut history = self.history();
            history.pop();
            history.push(route);
        }
        self.notify();
    }

    fn push(&self, path: &str) {
        let route = Route::parse(path);
        debug!(%route, "Pushing route");
        self.history().push(route);
        self.notify();
    }
}
