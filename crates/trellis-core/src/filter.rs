//! Hijack and filter pipeline
//!
//! Both kinds of entry are prefix-scoped callbacks kept in registration
//! order under a unique id, so several entries may share one prefix.
//!
//! ## Matching
//! - Hijack on `/admin`: `/admin` and `/admin/...`, never `/administrator`
//! - Filter with `match_all`: any path starting with the prefix
//! - Filter without `match_all`: the prefix path only
//! - Area filters additionally require the matched route to belong to
//!   their area
//!
//! ## Order
//! 1. Hijacks, for every resolvable path
//! 2. Filters, only when a handler was found
//!
//! Each phase stops at the first callback that ends the request.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::handler::Filter;
use crate::Context;

struct FilterEntry {
    prefix: String,
    match_all: bool,
    area: Option<Arc<str>>,
    callback: Box<dyn Filter>,
}

impl FilterEntry {
    fn matches(&self, path: &str, ctx: &Context) -> bool {
        let on_path = if self.match_all {
            path.starts_with(&self.prefix)
        } else {
            path == self.prefix
        };
        on_path
            && self
                .area
                .as_deref()
                .map_or(true, |area| ctx.area() == Some(area))
    }
}

struct HijackEntry {
    /// Without trailing slash; the root hijack is the empty string
    prefix: String,
    callback: Box<dyn Filter>,
}

impl HijackEntry {
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Filter and hijack registry of a router.
#[derive(Default)]
pub(crate) struct Pipeline {
    hijacks: BTreeMap<u64, HijackEntry>,
    filters: BTreeMap<u64, FilterEntry>,
    next_id: u64,
}

impl Pipeline {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn add_filter(
        &mut self,
        prefix: &str,
        match_all: bool,
        area: Option<Arc<str>>,
        callback: Box<dyn Filter>,
    ) {
        let prefix = filter_prefix(prefix);
        let id = self.next_id();
        tracing::debug!(id, prefix = %prefix, match_all, area = ?area.as_deref(), "registered filter");
        self.filters.insert(
            id,
            FilterEntry {
                prefix,
                match_all,
                area,
                callback,
            },
        );
    }

    pub(crate) fn add_hijack(&mut self, prefix: &str, callback: Box<dyn Filter>) {
        let prefix = with_leading_slash(prefix).trim_end_matches('/').to_string();
        let id = self.next_id();
        tracing::debug!(id, prefix = %prefix, "registered hijack");
        self.hijacks.insert(id, HijackEntry { prefix, callback });
    }

    pub(crate) fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub(crate) fn hijack_count(&self) -> usize {
        self.hijacks.len()
    }

    /// Returns whether the request was ended
    pub(crate) fn run_hijacks(&self, path: &str, ctx: &mut Context) -> bool {
        for entry in self.hijacks.values() {
            if !entry.matches(path) {
                continue;
            }
            entry.callback.call(ctx);
            if ctx.is_ended() {
                return true;
            }
        }
        false
    }

    /// Returns whether the request was ended
    pub(crate) fn run_filters(&self, path: &str, ctx: &mut Context) -> bool {
        for entry in self.filters.values() {
            if !entry.matches(path, ctx) {
                continue;
            }
            entry.callback.call(ctx);
            if ctx.is_ended() {
                return true;
            }
        }
        false
    }
}

fn with_leading_slash(prefix: &str) -> String {
    if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{prefix}")
    }
}

/// Leading slash added, trailing slashes trimmed except for the root
fn filter_prefix(prefix: &str) -> String {
    let prefix = with_leading_slash(prefix);
    match prefix.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::Request;
    use trellis_router::Method;

    fn context(path: &str, area: Option<&str>) -> Context {
        Context::new(
            1,
            Request::new(Method::Get, path),
            HashMap::new(),
            area.map(str::to_string),
        )
    }

    fn trail(tag: &'static str) -> Box<dyn Filter> {
        Box::new(move |ctx: &mut Context| {
            let mut seen = ctx.remove_item::<Vec<&'static str>>("trail").unwrap_or_default();
            seen.push(tag);
            ctx.set_item("trail", seen);
        })
    }

    fn seen(ctx: &Context) -> Vec<&'static str> {
        ctx.get_item::<Vec<&'static str>>("trail")
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn test_hijack_boundary() {
        let mut pipeline = Pipeline::default();
        pipeline.add_hijack("admin/", trail("admin"));

        for (path, hit) in [
            ("/admin", true),
            ("/admin/users", true),
            ("/administrator", false),
            ("/", false),
        ] {
            let mut ctx = context(path, None);
            pipeline.run_hijacks(path, &mut ctx);
            assert_eq!(seen(&ctx) == vec!["admin"], hit, "{path}");
        }
    }

    #[test]
    fn test_root_hijack_matches_everything() {
        let mut pipeline = Pipeline::default();
        pipeline.add_hijack("/", trail("root"));
        let mut ctx = context("/any/path", None);
        pipeline.run_hijacks("/any/path", &mut ctx);
        assert_eq!(seen(&ctx), vec!["root"]);
    }

    #[test]
    fn test_filter_match_modes() {
        let mut pipeline = Pipeline::default();
        pipeline.add_filter("/api/", true, None, trail("prefix"));
        pipeline.add_filter("/api/health", false, None, trail("exact"));

        let mut ctx = context("/api/health", None);
        pipeline.run_filters("/api/health", &mut ctx);
        assert_eq!(seen(&ctx), vec!["prefix", "exact"]);

        let mut ctx = context("/api/health/db", None);
        pipeline.run_filters("/api/health/db", &mut ctx);
        assert_eq!(seen(&ctx), vec!["prefix"]);

        let mut ctx = context("/web", None);
        pipeline.run_filters("/web", &mut ctx);
        assert!(seen(&ctx).is_empty());
    }

    #[test]
    fn test_filters_run_in_registration_order_and_stop_when_ended() {
        let mut pipeline = Pipeline::default();
        pipeline.add_filter("/", true, None, trail("first"));
        pipeline.add_filter("/", true, None, trail("second"));
        pipeline.add_filter("/", true, None, Box::new(|ctx: &mut Context| ctx.end()));
        pipeline.add_filter("/", true, None, trail("never"));

        let mut ctx = context("/x", None);
        assert!(pipeline.run_filters("/x", &mut ctx));
        assert_eq!(seen(&ctx), vec!["first", "second"]);
        assert_eq!(pipeline.filter_count(), 4);
    }

    #[test]
    fn test_area_filter() {
        let mut pipeline = Pipeline::default();
        pipeline.add_filter("/admin", true, Some(Arc::from("/admin")), trail("area"));

        let mut ctx = context("/admin/users", Some("/admin"));
        pipeline.run_filters("/admin/users", &mut ctx);
        assert_eq!(seen(&ctx), vec!["area"]);

        let mut ctx = context("/admin/users", None);
        pipeline.run_filters("/admin/users", &mut ctx);
        assert!(seen(&ctx).is_empty());
    }

    #[test]
    fn test_prefix_normalisation() {
        assert_eq!(filter_prefix("api/"), "/api");
        assert_eq!(filter_prefix("/"), "/");
        assert_eq!(filter_prefix("//"), "/");
    }
}
