//! Radix-tree route table.
//!
//! One tree per method, built once at assembly from the registry in
//! registration order and read-only while serving. matchit ranks static
//! segments above parameters, so a hit is then checked against every earlier
//! registration: among overlapping patterns the one registered first answers.

use std::collections::HashMap;

use matchit::{InsertError, Router as MatchitRouter};

use crate::error::Error;
use crate::method::Method;

pub(crate) struct Router<T> {
    routes: HashMap<Method, Table<T>>,
}

/// The routes of one method.
struct Table<T> {
    /// Every pattern, valued by its index in `mounted`.
    tree: MatchitRouter<usize>,
    /// Each route with a tree holding its pattern alone.
    mounted: Vec<(MatchitRouter<()>, T)>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { tree: MatchitRouter::new(), mounted: Vec::new() }
    }
}

impl<T: Clone> Router<T> {
    pub(crate) fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Mounts `value` at `path`.
    ///
    /// A pattern identical to one already mounted is skipped and `Ok(false)`
    /// returned: the earlier registration keeps answering.
    pub(crate) fn insert(&mut self, method: Method, path: &str, value: T) -> Result<bool, Error> {
        let pattern = normalize(path);
        let invalid = |source| Error::InvalidRoute { path: path.to_owned(), source };

        let mut own = MatchitRouter::new();
        own.insert(pattern.as_str(), ()).map_err(invalid)?;

        let table = self.routes.entry(method).or_default();
        match table.tree.insert(pattern.as_str(), table.mounted.len()) {
            Ok(()) => {
                table.mounted.push((own, value));
                Ok(true)
            }
            Err(InsertError::Conflict { with }) => {
                tracing::debug!(%method, path, conflicts_with = %with, "route shadowed by an earlier registration");
                Ok(false)
            }
            Err(source) => Err(invalid(source)),
        }
    }

    /// The earliest-registered route matching `path`, with its raw
    /// (still percent-encoded) parameters.
    pub(crate) fn lookup(&self, method: Method, path: &str) -> Option<(T, HashMap<String, String>)> {
        let table = self.routes.get(&method)?;
        let hit = *table.tree.at(path).ok()?.value;
        table.mounted.iter().take(hit + 1).find_map(|(own, value)| {
            let matched = own.at(path).ok()?;
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            Some((value.clone(), params))
        })
    }

    /// Methods with a route matching `path`, in a stable order.
    pub(crate) fn allowed(&self, path: &str) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|m| self.routes.get(m).is_some_and(|table| table.tree.at(path).is_ok()))
            .collect()
    }
}

/// Rewrites express-style `:name` segments into matchit's `{name}`.
fn normalize(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
