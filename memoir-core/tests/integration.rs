//! Integration Tests: End-to-End Memoization Flows
//!
//! These tests drive complete declarations through the public API:
//! declare → build → construct → call, across block and list forms,
//! eager and lazy strategies, inheritance and layered interceptors.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use memoir_core::{
    Instance, MemoirConfig, MemoirError, Memoize, Next, SyncPolicy, TypeBuilder, Value,
    Visibility,
};
use serde_json::json;

/// Stand-in for an external collaborator: counts how often it is asked.
#[derive(Clone, Default)]
struct Listener {
    calls: Arc<AtomicU64>,
}

impl Listener {
    fn call(&self, result: Value) -> Value {
        self.calls.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

fn slot_names(obj: &Instance) -> Vec<String> {
    obj.cache().keys().iter().map(ToString::to_string).collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

// ---------------------------------------------------------------------------
// Block and list declarations
// ---------------------------------------------------------------------------

#[test]
fn memoizes_methods_defined_in_a_block() {
    init_tracing();
    let listener = Listener::default();
    let l = listener.clone();

    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new(), move |b| {
        b.define("my_method", move |_| Ok(l.call(json!("result"))))?;
        Ok(())
    })
    .expect("memoize");
    let foo = b.build().new_instance().expect("instance");

    for _ in 0..2 {
        assert_eq!(foo.call("my_method").expect("call"), json!("result"));
    }
    assert_eq!(listener.count(), 1);
    assert_eq!(slot_names(&foo), vec!["__default_my_method"]);
}

#[test]
fn memoizes_methods_passed_as_list() {
    let first = Listener::default();
    let second = Listener::default();
    let (l1, l2) = (first.clone(), second.clone());

    let mut b = TypeBuilder::new("Widget");
    b.define("method1", move |_| Ok(l1.call(json!("one")))).expect("method1");
    b.define("method2", move |_| Ok(l2.call(json!("two")))).expect("method2");
    b.memoize(Memoize::new().methods(["method1", "method2"])).expect("memoize");
    let foo = b.build().new_instance().expect("instance");

    for _ in 0..2 {
        assert_eq!(foo.call("method1").expect("method1"), json!("one"));
    }
    assert_eq!(first.count(), 1);
    assert_eq!(slot_names(&foo), vec!["__default_method1"]);

    for _ in 0..2 {
        assert_eq!(foo.call("method2").expect("method2"), json!("two"));
    }
    assert_eq!(second.count(), 1);
    assert_eq!(slot_names(&foo), vec!["__default_method1", "__default_method2"]);
}

#[test]
fn both_methods_and_block_fails_without_installing() {
    let mut b = TypeBuilder::new("Widget");
    b.define("foo", |_| Ok(json!(1))).expect("foo");
    let err = b
        .memoize_with(Memoize::new().methods(["foo"]), |_| Ok(()))
        .expect_err("both");
    assert_eq!(
        err.to_string(),
        "Invalid arguments: memoize takes method names or a block defining methods, not both"
    );

    let ty = b.build();
    assert!(ty.augmentations().is_empty());
    let obj = ty.new_instance().expect("instance");
    obj.call("foo").expect("call");
    assert!(obj.cache().is_empty());
}

#[test]
fn unknown_explicit_method_is_rejected() {
    let mut b = TypeBuilder::new("Widget");
    let err = b.memoize(Memoize::new().methods(["missing"])).expect_err("unknown");
    assert!(matches!(err, MemoirError::UnknownMethod { ref type_name, ref method }
        if type_name == "Widget" && method == "missing"));
}

// ---------------------------------------------------------------------------
// Markers, prefixes and falsy values
// ---------------------------------------------------------------------------

#[test]
fn handles_bang_and_query_methods() {
    let listener = Listener::default();
    let (lq, lb) = (listener.clone(), listener.clone());

    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new(), move |b| {
        b.define("ready?", move |_| Ok(lq.call(json!(true))))?;
        b.define("ready!", move |_| Ok(lb.call(json!("fired"))))?;
        Ok(())
    })
    .expect("memoize");
    let foo = b.build().new_instance().expect("instance");

    for _ in 0..2 {
        assert_eq!(foo.call("ready?").expect("query"), json!(true));
        assert_eq!(foo.call("ready!").expect("bang"), json!("fired"));
    }
    assert_eq!(listener.count(), 2);
}

#[test]
fn slots_use_default_prefix_and_mangled_stems() {
    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new(), |b| {
        b.define("my_method", |_| Ok(json!(null)))?;
        b.define("my_method!", |_| Ok(json!(null)))?;
        b.define("my_method?", |_| Ok(json!(null)))?;
        Ok(())
    })
    .expect("memoize");
    let foo = b.build().new_instance().expect("instance");
    for name in ["my_method", "my_method!", "my_method?"] {
        foo.call(name).expect("call");
    }
    assert_eq!(
        slot_names(&foo),
        vec![
            "__default_my_method",
            "__default_my_method_bang",
            "__default_my_method_query",
        ]
    );
}

#[test]
fn accepts_custom_prefix() {
    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new().prefix("foo"), |b| {
        b.define("my_method", |_| Ok(json!(null)))?;
        Ok(())
    })
    .expect("memoize");
    let foo = b.build().new_instance().expect("instance");
    foo.call("my_method").expect("call");
    assert_eq!(slot_names(&foo), vec!["foo_my_method"]);
}

#[test]
fn falsy_and_empty_results_are_cached() {
    let listener = Listener::default();
    let mut b = TypeBuilder::new("Widget");
    let values = [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})];
    let mut names = Vec::new();
    for (i, v) in values.iter().enumerate() {
        let name = format!("empty{i}");
        let l = listener.clone();
        let v = v.clone();
        b.define(&name, move |_| Ok(l.call(v.clone()))).expect("define");
        names.push(name);
    }
    b.memoize(Memoize::new().methods(names.clone())).expect("memoize");
    let obj = b.build().new_instance().expect("instance");

    for _ in 0..3 {
        for (name, expected) in names.iter().zip(values.iter()) {
            assert_eq!(&obj.call(name).expect("call"), expected);
        }
    }
    assert_eq!(listener.count(), values.len() as u64);
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

#[test]
fn maintains_visibility_of_memoized_methods() {
    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new().prefix("foo"), |b| {
        b.define("public_method", |_| Ok(json!(1)))?;
        b.define("protected_method", |_| Ok(json!(2)))?;
        b.make_protected("protected_method")?;
        b.define("private_method", |_| Ok(json!(3)))?;
        b.make_private("private_method")?;
        b.define("reveal", |inst| inst.send("private_method"))?;
        Ok(())
    })
    .expect("memoize");
    let ty = b.build();

    let ids = |v| -> Vec<String> { ty.instance_methods(v).iter().map(ToString::to_string).collect() };
    assert!(ids(Visibility::Public).contains(&"public_method".to_string()));
    assert!(ids(Visibility::Protected).contains(&"protected_method".to_string()));
    assert!(ids(Visibility::Private).contains(&"private_method".to_string()));

    let a = ty.new_instance().expect("a");
    let other = ty.new_instance().expect("other");
    assert_eq!(a.call("public_method").expect("public"), json!(1));
    assert!(matches!(a.call("protected_method"), Err(MemoirError::NotVisible { .. })));
    assert_eq!(a.call_from(&other, "protected_method").expect("protected"), json!(2));
    assert!(matches!(a.call("private_method"), Err(MemoirError::NotVisible { .. })));
    assert_eq!(a.call("reveal").expect("reveal"), json!(3));
    assert!(slot_names(&a).contains(&"foo_private_method".to_string()));
}

// ---------------------------------------------------------------------------
// Eager strategy
// ---------------------------------------------------------------------------

#[test]
fn eager_option_evaluates_at_construction() {
    let listener = Listener::default();
    let l = listener.clone();

    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new().eager(true), move |b| {
        b.define("my_method", move |_| Ok(l.call(json!("result"))))?;
        Ok(())
    })
    .expect("memoize");
    let ty = b.build();

    let obj = ty.new_instance().expect("instance");
    assert_eq!(listener.count(), 1);
    assert_eq!(obj.call("my_method").expect("call"), json!("result"));
    assert_eq!(listener.count(), 1);

    let _second = ty.new_instance().expect("second");
    assert_eq!(listener.count(), 2);
}

#[test]
fn eager_and_lazy_declarations_coexist() {
    let eager_calls = Listener::default();
    let lazy_calls = Listener::default();
    let (le, ll) = (eager_calls.clone(), lazy_calls.clone());

    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::eagerly(), move |b| {
        b.define("warm", move |_| Ok(le.call(json!("w"))))?;
        Ok(())
    })
    .expect("eager");
    b.memoize_with(Memoize::new(), move |b| {
        b.define("cold", move |_| Ok(ll.call(json!("c"))))?;
        Ok(())
    })
    .expect("lazy");
    let obj = b.build().new_instance().expect("instance");

    assert_eq!(slot_names(&obj), vec!["__default_warm"]);
    assert_eq!((eager_calls.count(), lazy_calls.count()), (1, 0));

    obj.call("cold").expect("cold");
    assert_eq!(slot_names(&obj), vec!["__default_cold", "__default_warm"]);
    assert_eq!(lazy_calls.count(), 1);
}

#[test]
fn eager_runs_after_initializer_state_is_set() {
    let mut b = TypeBuilder::new("Point");
    b.initializer(|inst, args| {
        inst.set_field("x", args.first().cloned().unwrap_or(json!(0)));
        Ok(())
    });
    b.memoize_with(Memoize::eagerly(), |b| {
        b.define("doubled", |inst| {
            let x = inst.get_field("x").and_then(|v| v.as_i64()).unwrap_or_default();
            Ok(json!(x * 2))
        })?;
        Ok(())
    })
    .expect("memoize");
    let ty = b.build();

    let p = ty.instantiate(&[json!(21)]).expect("instance");
    p.set_field("x", json!(1));
    assert_eq!(p.call("doubled").expect("doubled"), json!(42));
}

// ---------------------------------------------------------------------------
// Inheritance and composition
// ---------------------------------------------------------------------------

#[test]
fn memoizing_inherited_method_caches_on_subclass_only() {
    let listener = Listener::default();
    let l = listener.clone();

    let mut base = TypeBuilder::new("Base");
    base.define("lookup", move |_| Ok(l.call(json!("data")))).expect("lookup");
    let base = base.build();

    let mut derived = TypeBuilder::subclass("Derived", &base);
    derived.memoize(Memoize::new().methods(["lookup"])).expect("memoize");
    let derived = derived.build();

    let d = derived.new_instance().expect("derived");
    d.call("lookup").expect("first");
    d.call("lookup").expect("second");
    assert_eq!(listener.count(), 1);

    let plain = base.new_instance().expect("base");
    plain.call("lookup").expect("first");
    plain.call("lookup").expect("second");
    assert_eq!(listener.count(), 3);
    assert!(plain.cache().is_empty());
}

#[test]
fn interceptors_compose_with_memoization() {
    let inner_hits = Arc::new(AtomicU64::new(0));
    let outer_hits = Arc::new(AtomicU64::new(0));
    let (ih, oh) = (Arc::clone(&inner_hits), Arc::clone(&outer_hits));

    let mut b = TypeBuilder::new("Widget");
    b.define("value", |_| Ok(json!(10))).expect("define");
    b.intercept("value", move |inst: &Instance, next: Next<'_>| {
        ih.fetch_add(1, Ordering::SeqCst);
        next.call(inst)
    })
    .expect("inner");
    b.memoize(Memoize::new().methods(["value"])).expect("memoize");
    b.intercept("value", move |inst: &Instance, next: Next<'_>| {
        oh.fetch_add(1, Ordering::SeqCst);
        next.call(inst)
    })
    .expect("outer");
    let obj = b.build().new_instance().expect("instance");

    for _ in 0..3 {
        assert_eq!(obj.call("value").expect("call"), json!(10));
    }
    assert_eq!(inner_hits.load(Ordering::SeqCst), 1);
    assert_eq!(outer_hits.load(Ordering::SeqCst), 3);
}

#[test]
fn stacked_memoize_declarations_keep_delegation() {
    let listener = Listener::default();
    let l = listener.clone();

    let mut b = TypeBuilder::new("Widget");
    b.define("value", move |_| Ok(l.call(json!("v")))).expect("define");
    b.memoize(Memoize::new().methods(["value"]).prefix("inner")).expect("inner");
    b.memoize(Memoize::new().methods(["value"]).prefix("outer")).expect("outer");
    let obj = b.build().new_instance().expect("instance");

    obj.call("value").expect("first");
    obj.call("value").expect("second");
    assert_eq!(listener.count(), 1);
    assert_eq!(slot_names(&obj), vec!["inner_value", "outer_value"]);
}

#[test]
fn redefinition_after_memoize_is_still_wrapped() {
    let mut b = TypeBuilder::new("Widget");
    b.define("answer", |_| Ok(json!(1))).expect("define");
    b.memoize(Memoize::new().methods(["answer"])).expect("memoize");
    b.define("answer", |_| Ok(json!(2))).expect("redefine");
    let obj = b.build().new_instance().expect("instance");
    assert_eq!(obj.call("answer").expect("call"), json!(2));
    assert_eq!(obj.cache().len(), 1);
}

// ---------------------------------------------------------------------------
// Failures, stats, concurrency
// ---------------------------------------------------------------------------

#[test]
fn failures_pass_through_and_are_retried() {
    let attempts = Arc::new(AtomicU64::new(0));
    let a = Arc::clone(&attempts);

    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new(), move |b| {
        b.define("fetch", move |_| {
            if a.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(MemoirError::method_failure("fetch", "unavailable"))
            } else {
                Ok(json!("payload"))
            }
        })?;
        Ok(())
    })
    .expect("memoize");
    let ty = b.build();
    let obj = ty.new_instance().expect("instance");

    for _ in 0..2 {
        let err = obj.call("fetch").expect_err("failure");
        assert_eq!(err.to_string(), "Method `fetch` failed: unavailable");
        assert!(obj.cache().is_empty());
    }
    assert_eq!(obj.call("fetch").expect("third"), json!("payload"));
    assert_eq!(obj.call("fetch").expect("cached"), json!("payload"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let stats = ty.augmentations()[0].stats();
    assert_eq!((stats.hits, stats.misses, stats.failures), (1, 3, 2));
}

#[test]
fn caches_are_per_instance() {
    let listener = Listener::default();
    let l = listener.clone();

    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new(), move |b| {
        b.define("id", move |_| Ok(l.call(json!(1))))?;
        Ok(())
    })
    .expect("memoize");
    let ty = b.build();

    let a = ty.new_instance().expect("a");
    let c = ty.new_instance().expect("c");
    a.call("id").expect("a");
    a.call("id").expect("a again");
    c.call("id").expect("c");
    assert_eq!(listener.count(), 2);
}

#[test]
fn per_slot_config_runs_body_once_under_contention() {
    let config = MemoirConfig::from_toml("[concurrency]\nsync_policy = \"per_slot\"\n")
        .expect("config");
    assert_eq!(config.concurrency.sync_policy, SyncPolicy::PerSlot);

    let listener = Listener::default();
    let l = listener.clone();
    let mut b = TypeBuilder::new("Widget").with_config(&config);
    b.memoize_with(Memoize::new(), move |b| {
        b.define("expensive", move |_| {
            std::thread::sleep(std::time::Duration::from_millis(10));
            Ok(l.call(json!("done")))
        })?;
        Ok(())
    })
    .expect("memoize");
    let obj = b.build().new_instance().expect("instance");

    std::thread::scope(|scope| {
        for _ in 0..16 {
            scope.spawn(|| assert_eq!(obj.call("expensive").expect("call"), json!("done")));
        }
    });
    assert_eq!(listener.count(), 1);
}

#[test]
fn memoized_methods_may_call_each_other() {
    let listener = Listener::default();
    let l = listener.clone();

    let mut b = TypeBuilder::new("Widget");
    b.memoize_with(Memoize::new(), move |b| {
        b.define("base", move |_| Ok(l.call(json!(3))))?;
        b.define("derived", |inst| {
            let base = inst.send("base")?.as_i64().unwrap_or_default();
            Ok(json!(base * 10))
        })?;
        Ok(())
    })
    .expect("memoize");
    let obj = b.build().new_instance().expect("instance");

    assert_eq!(obj.call("derived").expect("derived"), json!(30));
    assert_eq!(obj.call("base").expect("base"), json!(3));
    assert_eq!(listener.count(), 1);
    assert_eq!(obj.cache().len(), 2);
}
