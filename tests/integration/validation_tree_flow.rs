use std::cell::RefCell;
use std::rc::Rc;

use apivalid::domain::assertion::{Expected, produce};
use apivalid::domain::error::SpecError;
use apivalid::domain::report::ResponseAspect;
use apivalid::domain::response::Response;
use apivalid::engine::assert::{HeaderExpectation, StatusExpectation};
use apivalid::engine::spec::registry::Registry;
use apivalid::engine::spec::{NodeOptions, ValidationNode};
use serde_json::{Value, json};

fn record_runs(node: &Rc<ValidationNode>, log: &Rc<RefCell<Vec<String>>>) {
    let log = Rc::clone(log);
    node.before(move |node| {
        log.borrow_mut().push(node.name().to_string());
        Ok(())
    });
}

#[test]
fn dependents_run_after_their_dependency_and_unrelated_siblings_keep_their_slot() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let root = ValidationNode::root("", Rc::new(Registry::new()));

    for (name, options) in [
        ("b", NodeOptions::new().named("b").depends_on(["a"])),
        ("c", NodeOptions::new()),
        ("a", NodeOptions::new().named("a")),
    ] {
        let log = Rc::clone(&log);
        root.describe(name, options, move |node| {
            record_runs(node, &log);
            Ok(())
        })
        .expect("describe");
    }

    root.run().expect("run");
    assert_eq!(*log.borrow(), vec!["a", "c", "b"]);
}

#[test]
fn cache_values_are_inherited_and_shadowed_per_subtree() {
    let root = ValidationNode::root("API", Rc::new(Registry::new()));
    root.set("/auth/token", "root-token").expect("set");

    let admin = root
        .describe("admin", NodeOptions::new(), |node| node.set("/auth/token", "admin-token"))
        .expect("describe");
    let admin_child = admin
        .describe("users", NodeOptions::new(), |_| Ok(()))
        .expect("describe");
    let guest = root
        .describe("guest", NodeOptions::new(), |_| Ok(()))
        .expect("describe");

    assert_eq!(guest.get("/auth/token"), Some(json!("root-token")));
    assert_eq!(admin.get("/auth/token"), Some(json!("admin-token")));
    assert_eq!(admin_child.get("/auth/token"), Some(json!("admin-token")));
    assert_eq!(root.get("/auth/token"), Some(json!("root-token")));
    assert_eq!(guest.get("/auth/missing"), None);
}

#[test]
fn producers_are_evaluated_lazily_in_the_requesting_node() {
    let root = ValidationNode::root("API", Rc::new(Registry::new()));
    root.set_with("/resource_url", |node| {
        let id = node.get("/id").unwrap_or(Value::Null);
        json!(format!("/users/{id}"))
    });
    let first = root
        .describe("first", NodeOptions::new(), |node| node.set("/id", 1))
        .expect("describe");
    let second = root
        .describe("second", NodeOptions::new(), |node| node.set("/id", 2))
        .expect("describe");

    assert_eq!(first.get("/resource_url"), Some(json!("/users/1")));
    assert_eq!(second.get("/resource_url"), Some(json!("/users/2")));
    second.set("/id", 3).expect("set");
    assert_eq!(second.get("/resource_url"), Some(json!("/users/3")));
}

#[test]
fn full_suite_with_registry_shared_examples_and_failures() {
    let mut base = Registry::new();
    base.register_headers("json", [("Content-Type", "application/json")])
        .shared_example("a json response", |node| {
            node.expect_response(|expectation| {
                expectation
                    .expect_headers(HeaderExpectation::named("json"))?
                    .capture(|_| {
                        Ok(Response::new(200).with_header("Content-Type", "application/json"))
                    });
                Ok(())
            })
        });
    let mut registry = Registry::with_parent(Rc::new(base));
    registry.register_hook("authenticate", |node| node.set("/token", "t-1"));

    let root = ValidationNode::root("Users API", Rc::new(registry));
    root.describe("list", NodeOptions::new().before_named("authenticate"), |node| {
        node.behaves_as("a json response")?;
        node.expect_response(|expectation| {
            expectation
                .expect_status(StatusExpectation::predicate("success", |code| code < 300))
                .expect_properties(Expected::map([
                    ("token", produce(|_| json!("t-1"))),
                    ("count", Expected::from(3i64)),
                ]))
                .capture(|context| {
                    let token = context.get("/token").unwrap_or(Value::Null);
                    Ok(Response::new(200).with_body(json!({"token": token, "count": 2})))
                });
            Ok(())
        })?;
        node.describe("nested", NodeOptions::new(), |nested| {
            nested.expect_response(|expectation| {
                expectation.expect_status(200u16).capture(|_| Ok(Response::new(200)));
                Ok(())
            })
        })?;
        Ok(())
    })
    .expect("describe");

    let report = root.run().expect("run").into_report();
    let names: Vec<&str> = report.results.iter().map(|entry| entry.validations[0].as_str()).collect();
    assert_eq!(names, vec!["Users API list", "Users API list", "Users API list nested"]);
    assert!(report.results[0].report.valid);
    assert!(!report.results[1].report.valid);
    assert!(report.results[2].report.valid);
    assert!(!report.valid);

    let body = &report.results[1].report.expected[&ResponseAspect::ResponseBody];
    assert_eq!(body.failed_assertions.len(), 1);
    assert_eq!(body.diff[0].path.to_string(), "/count");
}

#[test]
fn unknown_named_header_expectations_fail_at_declaration() {
    let root = ValidationNode::root("API", Rc::new(Registry::new()));
    let error = root
        .describe("x", NodeOptions::new(), |node| {
            node.expect_response(|expectation| {
                expectation.expect_headers(HeaderExpectation::named("xml"))?;
                Ok(())
            })
        })
        .expect_err("unknown expectation");
    assert!(matches!(error, SpecError::UnknownExpectation { name } if name == "xml"));
}
