//! Route tables.
//!
//! # Responsibilities
//! - Parse a service's route file
//! - Flatten `sub-service → { path → [verb, method] }` into path-keyed entries
//!
//! # Design Decisions
//! - Entries are not checked against the parsed schema; dangling names
//!   surface at dispatch time
//! - A path suffix may be claimed by only one sub-service

use std::collections::BTreeMap;

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// Target of one configured HTTP path suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub verb: Method,
    pub sub_service: String,
    pub method: String,
}

/// Path suffix → route entry for one logical service.
pub type RouteTable = BTreeMap<String, RouteEntry>;

/// On-disk route file shape.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RouteFile {
    #[serde(default)]
    pub services: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// Parse and flatten a route file. Errors are plain messages; the caller
/// attaches the service name.
pub fn parse_routes(source: &str) -> Result<RouteTable, String> {
    let file: RouteFile = serde_yaml::from_str(source).map_err(|e| e.to_string())?;
    flatten(file)
}

fn flatten(file: RouteFile) -> Result<RouteTable, String> {
    let mut table = RouteTable::new();

    for (sub_service, paths) in file.services {
        for (path, target) in paths {
            let [verb, method] = target.as_slice() else {
                return Err(format!(
                    "{sub_service} {path}: expected [verb, method], got {} values",
                    target.len()
                ));
            };
            let verb = Method::from_bytes(verb.trim().to_ascii_uppercase().as_bytes())
                .map_err(|_| format!("{sub_service} {path}: invalid verb {verb}"))?;

            let entry = RouteEntry {
                verb,
                sub_service: sub_service.clone(),
                method: method.trim().to_string(),
            };
            if let Some(previous) = table.insert(path.clone(), entry) {
                return Err(format!(
                    "path {path} mapped by both {} and {sub_service}",
                    previous.sub_service
                ));
            }
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_routes() {
        let table = parse_routes(
            r#"
services:
  OrderService:
    /get: [get, GetOrder]
    /create: [POST, CreateOrder]
  UserService:
    /user: [GET, GetUser]
"#,
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        let get = &table["/get"];
        assert_eq!(get.verb, Method::GET);
        assert_eq!(get.sub_service, "OrderService");
        assert_eq!(get.method, "GetOrder");
        assert_eq!(table["/user"].sub_service, "UserService");
    }

    #[test]
    fn test_rejects_short_target() {
        let err = parse_routes("services:\n  S:\n    /x: [GET]\n").unwrap_err();
        assert!(err.contains("expected [verb, method]"));
    }

    #[test]
    fn test_rejects_duplicate_path() {
        let err = parse_routes(
            "services:\n  A:\n    /x: [GET, One]\n  B:\n    /x: [GET, Two]\n",
        )
        .unwrap_err();
        assert!(err.contains("/x"));
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_routes("{}").unwrap().is_empty());
    }
}
