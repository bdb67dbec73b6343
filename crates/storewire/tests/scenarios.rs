#![forbid(unsafe_code)]

//! End-to-end scenarios across the store, selectors and field bindings.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use storewire::prelude::*;
use storewire::storewire_core::codec;
use storewire::{InvalidInputPolicy, TimeZoneSetting};

fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

fn login() -> Value {
    Value::from_pairs([
        ("email", Value::from("")),
        ("password", Value::from("")),
        ("agree", Value::from(false)),
        ("volume", Value::from(10)),
    ])
}

#[test]
fn counter_selector_fires_once() {
    let store = create_store(Value::from_pairs([("count", 0)]));
    let count = bind_selector(&store, |s: &Value| s.get("count").and_then(Value::as_f64));
    let fired = Rc::new(RefCell::new(Vec::new()));
    let f = Rc::clone(&fired);
    count.on_change(move |v| f.borrow_mut().push(*v));

    store.dispatch(|draft| {
        let n = draft.get("count").and_then(Value::as_f64).unwrap_or(0.0);
        draft.insert("count", n + 1.0).unwrap();
    });

    assert_eq!(store.state().get("count"), Some(&Value::from(1)));
    assert_eq!(*fired.borrow(), vec![Some(1.0)]);
}

#[test]
fn two_checkboxes_stay_in_step() {
    let form = FormStore::new(login());
    let first = MemoryElement::input().shared();
    let second = MemoryElement::input().shared();
    let a = form.input(&first, "agree", ControlKind::Checkbox).unwrap();
    let b = form.input(&second, "agree", ControlKind::Checkbox).unwrap();

    let origins = Rc::new(RefCell::new(Vec::new()));
    let o = Rc::clone(&origins);
    let _probe = form.subscribe(move |_, origin| o.borrow_mut().push(origin));

    first.user_toggle(true);

    assert_eq!(form.state().get("agree"), Some(&Value::Bool(true)));
    assert!(second.checked());
    assert_eq!(second.checked_writes(), 1);
    assert_eq!(second.input_events(), 1);
    assert_eq!(first.checked_writes(), 0, "originator is not rewritten");
    assert_eq!(first.input_events(), 0);
    assert_eq!(*origins.borrow(), vec![Some(a.origin())]);
    assert_ne!(a.origin(), b.origin());
}

#[test]
fn range_input_writes_numbers() {
    let form = FormStore::new(login());
    let slider = MemoryElement::input().shared();
    let _volume = form.input(&slider, "volume", ControlKind::Range).unwrap();
    assert_eq!(slider.value(), "10");

    slider.user_input("75");
    assert_eq!(form.state().get("volume"), Some(&Value::Number(75.0)));
}

#[test]
fn email_selector_ignores_password() {
    let form = FormStore::new(login());
    let email = form.selector(|s: &Value| s.get("email").cloned());
    let fired = Rc::new(Cell::new(0));
    let f = Rc::clone(&fired);
    email.on_change(move |_| f.set(f.get() + 1));

    let password = MemoryElement::input().shared();
    let _pw = form.input(&password, "password", ControlKind::Password).unwrap();
    password.user_input("hunter2");
    assert_eq!(fired.get(), 0);

    form.dispatch(|d| {
        d.insert("email", "a@b.c").unwrap();
    });
    assert_eq!(fired.get(), 1);
}

#[test]
fn subscription_order_and_unsubscribe() {
    let store = Store::new(login());
    let log = Rc::new(RefCell::new(Vec::new()));
    let subscribe = |name: &'static str| {
        let log = Rc::clone(&log);
        store.subscribe(move |_, _| log.borrow_mut().push(name))
    };
    let _a = subscribe("a");
    let b = subscribe("b");
    let _c = subscribe("c");

    store.dispatch(|d| {
        d.insert("email", "1").unwrap();
    });
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);

    b.unsubscribe();
    log.borrow_mut().clear();
    store.dispatch(|d| {
        d.insert("email", "2").unwrap();
    });
    assert_eq!(*log.borrow(), vec!["a", "c"]);
}

#[test]
fn failed_recipe_changes_nothing() {
    let store = Store::new(login());
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    let _sub = store.subscribe(move |_, _| h.set(h.get() + 1));
    let before = store.state();

    let result: Result<(), &str> = store.try_dispatch(
        |draft| {
            draft.insert("email", "half-written").unwrap();
            Err("validation failed")
        },
        None,
    );

    assert_eq!(result, Err("validation failed"));
    assert!(Rc::ptr_eq(&before, &store.state()));
    assert_eq!(hits.get(), 0);
}

#[test]
fn indexed_fields_bind_array_elements() {
    let form = FormStore::new(Value::from_pairs([(
        "tags",
        Value::from(vec![Value::from("rust"), Value::from("wasm")]),
    )]));
    let first = MemoryElement::input().shared();
    let second = MemoryElement::input().shared();
    let _t0 = form.input(&first, "tags.0", ControlKind::Text).unwrap();
    let _t1 = form.input(&second, "tags.1", ControlKind::Text).unwrap();
    assert_eq!(first.value(), "rust");
    assert_eq!(second.value(), "wasm");

    second.user_input("web");
    let tags = form.state().get("tags").cloned().unwrap();
    assert_eq!(
        tags,
        Value::from(vec![Value::from("rust"), Value::from("web")])
    );
    assert_eq!(first.value_writes(), 1, "only the initial write");
}

#[test]
fn datetime_local_uses_configured_zone() {
    let config = SyncConfig::default().with_time_zone(TimeZoneSetting::FixedOffset(-5 * 3600));
    let form = FormStore::new(Value::from_pairs([("due", utc("2024-03-10T15:00:00Z"))]))
        .with_config(config);
    let picker = MemoryElement::input().shared();
    let _due = form.input(&picker, "due", ControlKind::DateTimeLocal).unwrap();
    assert_eq!(picker.value(), "2024-03-10T10:00:00");

    picker.user_input("2024-03-11T09:30:00");
    assert_eq!(
        form.state().get("due"),
        Some(&Value::Date(utc("2024-03-11T14:30:00Z")))
    );

    picker.user_input("");
    assert_eq!(form.state().get("due"), Some(&Value::Null));
}

#[test]
fn invalid_number_is_retained() {
    let form = FormStore::new(login());
    let slider = MemoryElement::input().shared();
    let volume = form.input(&slider, "volume", ControlKind::Number).unwrap();

    slider.user_input("loud");
    assert_eq!(form.state().get("volume"), Some(&Value::from(10)));
    assert_eq!(volume.edit_count(), 0);

    let cleared = FormStore::new(login())
        .with_config(SyncConfig::default().with_invalid_input(InvalidInputPolicy::Clear));
    let other = MemoryElement::input().shared();
    let _v = cleared.input(&other, "volume", ControlKind::Number).unwrap();
    other.user_input("loud");
    assert_eq!(cleared.state().get("volume"), Some(&Value::Null));
}

#[test]
fn snapshot_survives_codec_round_trip() {
    let store = Store::new(login());
    store.dispatch(|d| {
        d.insert("email", "a@b.c").unwrap();
        d.insert("joined", utc("2024-01-02T03:04:05.678Z")).unwrap();
        d.insert("tags", Value::from(vec![Value::from("x"), Value::Null])).unwrap();
    });
    let state = store.state();

    let encoded = codec::serialize(Some(state.as_ref())).unwrap();
    let json = serde_json::to_string(&encoded).unwrap();
    let parsed = serde_json::from_str::<serde_json::Value>(&json).ok();
    let decoded = codec::deserialize(parsed.as_ref());
    assert_eq!(decoded.as_ref(), Some(state.as_ref()));
}

#[test]
fn external_observer_sees_synthetic_input() {
    let form = FormStore::new(login());
    let el = MemoryElement::input().shared();
    let _email = form.input(&el, "email", ControlKind::Email).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = Rc::clone(&seen);
    el.observe_input(move |v| s.borrow_mut().push(v.to_owned()));

    form.assign(&Patch::new().set("email", "x@y.z")).unwrap();
    assert_eq!(*seen.borrow(), vec!["x@y.z".to_owned()]);
}

#[test]
fn unmounting_a_scope_detaches_everything() {
    let form = FormStore::new(login());
    let el = MemoryElement::input().shared();
    let renders = {
        let mut scope = BindingScope::new();
        scope.hold(form.input(&el, "email", ControlKind::Email).unwrap());
        let cell = form.render(|s: &Value| {
            s.get("email")
                .cloned()
                .unwrap_or_default()
                .to_display_string()
        });
        let probe = cell.output();
        scope.hold(cell);
        assert_eq!(form.store().listener_count(), 2);
        probe
    };
    assert_eq!(form.store().listener_count(), 0);
    assert_eq!(el.handler_count(), 0);
    assert_eq!(*renders, "");

    el.user_input("after unmount");
    assert_eq!(form.state().get("email"), Some(&Value::from("")));
}
