//! Reconciliation pass tests.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tessera_component::testing::{init_tracing, Probe, Recorder};
use tessera_component::{sync_handler, Component, ComponentError, Constructed, Dispatch};
use tessera_event::Caller;
use tessera_runtime::app::{Application, ApplicationBuilder, ComponentType, InitArgs};
use tessera_runtime::config::RuntimeConfig;
use tessera_runtime::RuntimeError;
use tessera_types::{Category, Relation, TypeKey};

/// Mutable relation list shared with a type's provider.
#[derive(Clone, Default)]
struct Relations(Arc<Mutex<Vec<Relation>>>);

impl Relations {
    fn of(relations: &[&Relation]) -> Self {
        Self(Arc::new(Mutex::new(
            relations.iter().map(|r| (*r).clone()).collect(),
        )))
    }

    fn push(&self, relation: &Relation) {
        self.0.lock().push(relation.clone());
    }

    fn remove(&self, relation: &Relation) {
        self.0.lock().retain(|r| r != relation);
    }

    fn provider(&self) -> impl Fn() -> Option<Vec<Relation>> + Send + Sync + 'static {
        let list = Arc::clone(&self.0);
        move || Some(list.lock().clone())
    }
}

fn chat_type(relations: &Relations) -> ComponentType {
    ComponentType::of::<Probe>(Category::Controllers, |cx| {
        Ok(Constructed::ready(Probe::new("Chat", &cx)))
    })
    .with_relations(relations.provider())
}

fn expose_ping(builder: ApplicationBuilder) -> ApplicationBuilder {
    builder.on_construct(TypeKey::of::<Probe>(), |_app, component| {
        component
            .base()
            .expose("ping", sync_handler(|_| Ok(json!("pong"))));
        Ok(())
    })
}

async fn initialized(builder: ApplicationBuilder) -> Application {
    let app = builder.build();
    let report = app.initialize(InitArgs::new()).await;
    assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
    app
}

#[tokio::test]
async fn initial_snapshot_constructed_and_initialized() {
    init_tracing();
    let a = Relation::new("a");
    let b = Relation::new("b");
    let relations = Relations::of(&[&a, &b]);

    let app = ApplicationBuilder::new().component(chat_type(&relations)).build();
    assert_eq!(app.instance_count(), 2);
    assert!(!app.is_initialized());

    let report = app.initialize(InitArgs::new()).await;
    assert_eq!(report.created, 2);
    assert!(report.is_clean());
    assert!(app.is_initialized());

    for relation in [&a, &b] {
        let probe = app.get::<Probe>(Some(relation)).expect("instance per relation");
        assert_eq!(probe.initialize_count(), 1);
        assert_eq!(probe.base().relation(), Some(relation));
    }
}

#[tokio::test]
async fn refresh_with_unchanged_lists_is_a_no_op() {
    let a = Relation::new("a");
    let b = Relation::new("b");
    let relations = Relations::of(&[&a, &b]);
    let app = initialized(ApplicationBuilder::new().component(chat_type(&relations))).await;
    let before = app.get::<Probe>(Some(&a)).expect("a");

    let report = app.refresh().await;

    assert_eq!((report.created, report.closed), (0, 0));
    assert_eq!(app.instance_count(), 2);
    let after = app.get::<Probe>(Some(&a)).expect("a");
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.initialize_count(), 1);
}

#[tokio::test]
async fn equal_contents_with_new_identity_replace_instance() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = initialized(ApplicationBuilder::new().component(chat_type(&relations))).await;
    let old = app.get::<Probe>(Some(&a)).expect("a");

    let replacement = Relation::new("a");
    relations.remove(&a);
    relations.push(&replacement);
    let report = app.refresh().await;

    assert_eq!((report.created, report.closed), (1, 1));
    assert_eq!(old.close_count(), 1);
    assert!(app.get::<Probe>(Some(&a)).is_err());
    assert!(app.get::<Probe>(Some(&replacement)).is_ok());
}

#[tokio::test]
async fn added_relation_gets_configured_args() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = ApplicationBuilder::new().component(chat_type(&relations)).build();
    app.initialize(InitArgs::new().with_type::<Probe>(vec![json!(7)]))
        .await;

    let c = Relation::new("c");
    relations.push(&c);
    let report = app.refresh().await;

    assert_eq!(report.created, 1);
    let probe = app.get::<Probe>(Some(&c)).expect("c");
    assert_eq!(probe.initialize_count(), 1);
    assert_eq!(probe.init_args(), Some(vec![json!(7)]));
}

#[tokio::test]
async fn removed_relation_closes_instance_and_revokes_exposures() {
    let a = Relation::new("a");
    let b = Relation::new("b");
    let relations = Relations::of(&[&a, &b]);
    let app = initialized(expose_ping(
        ApplicationBuilder::new().component(chat_type(&relations)),
    ))
    .await;
    let removed = app.get::<Probe>(Some(&b)).expect("b");

    let all = app
        .exposer()
        .call("chat", "ping", &Caller::Broadcast, vec![])
        .await;
    assert_eq!(all, Ok(Dispatch::Many(vec![json!("pong"), json!("pong")])));

    relations.remove(&b);
    let report = app.refresh().await;

    assert_eq!(report.closed, 1);
    assert_eq!(removed.close_count(), 1);
    assert_eq!(app.instance_count(), 1);

    let scoped = app
        .exposer()
        .call("chat", "ping", &Caller::Scoped(b.clone()), vec![])
        .await;
    assert_eq!(scoped, Ok(Dispatch::None));
    let all = app
        .exposer()
        .call("chat", "ping", &Caller::Broadcast, vec![])
        .await;
    assert_eq!(all, Ok(Dispatch::One(json!("pong"))));
}

#[tokio::test]
async fn failing_singleton_constructor_reports_one_exception() {
    let app = ApplicationBuilder::new()
        .component(ComponentType::new(
            TypeKey::named("Broken"),
            Category::Services,
            |_| Err(ComponentError::ConstructFailed("no backend".into())),
        ))
        .build();
    assert_eq!(
        app.get_component(TypeKey::named("Broken"), None).map(|_| ()),
        Err(RuntimeError::NotFound("Broken".into()))
    );

    let report = app.initialize(InitArgs::new()).await;

    assert_eq!(report.exceptions(), 1);
    assert!(matches!(
        report.failures[0].error,
        RuntimeError::Construction { .. }
    ));
    assert_eq!(app.instance_count(), 0);
    assert_eq!(
        app.get_component(TypeKey::named("Broken"), None).map(|_| ()),
        Err(RuntimeError::NotFound("Broken".into()))
    );

    // Reported once, not retried.
    let again = app.initialize(InitArgs::new()).await;
    assert!(again.is_clean());
    assert_eq!(app.instance_count(), 0);
}

#[tokio::test]
async fn failed_relation_retried_only_after_it_returns() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let bad = Relation::new("bad");
    let relations = Relations::of(&[&bad]);

    let counter = Arc::clone(&attempts);
    let ty = ComponentType::of::<Probe>(Category::Services, move |cx| {
        counter.fetch_add(1, Ordering::SeqCst);
        if counter.load(Ordering::SeqCst) < 3 {
            return Err(ComponentError::ConstructFailed("not yet".into()));
        }
        Ok(Constructed::ready(Probe::new("Flaky", &cx)))
    })
    .with_relations(relations.provider());

    let app = ApplicationBuilder::new().component(ty).build();
    assert_eq!(app.initialize(InitArgs::new()).await.exceptions(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    // Still listed: not retried.
    assert!(app.refresh().await.is_clean());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    relations.remove(&bad);
    app.refresh().await;
    relations.push(&bad);
    let report = app.refresh().await;
    assert_eq!(report.exceptions(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    relations.remove(&bad);
    app.refresh().await;
    relations.push(&bad);
    let report = app.refresh().await;
    assert!(report.is_clean());
    assert_eq!(report.created, 1);
    assert!(app.get::<Probe>(Some(&bad)).is_ok());
}

#[tokio::test]
async fn handlers_run_most_derived_first_before_initialize() {
    let log = Recorder::new();
    let probe_log = log.clone();
    let ty = ComponentType::of::<Probe>(Category::Services, move |cx| {
        Ok(Constructed::ready(
            Probe::new("Player", &cx).logging_to(probe_log.clone()),
        ))
    })
    .extends(TypeKey::named("Service"));

    let base_log = log.clone();
    let typed_log = log.clone();
    let app = ApplicationBuilder::new()
        .component(ty)
        .on_construct(TypeKey::named("Service"), move |_app, _component| {
            base_log.record("service", vec![]);
            Ok(())
        })
        .on_construct_typed::<Probe>(move |_app, probe| {
            assert_eq!(probe.initialize_count(), 0);
            typed_log.record("probe", vec![]);
            Ok(())
        })
        .build();

    assert!(app.initialize(InitArgs::new()).await.is_clean());
    assert_eq!(log.labels(), vec!["probe", "service", "Player.initialize"]);
}

#[tokio::test]
async fn failing_handler_skips_initialize() {
    let app = ApplicationBuilder::new()
        .component(ComponentType::of::<Probe>(Category::Services, |cx| {
            Ok(Constructed::ready(Probe::new("Player", &cx)))
        }))
        .on_construct(TypeKey::of::<Probe>(), |_app, _component| {
            Err(ComponentError::failed("missing dependency"))
        })
        .build();

    let report = app.initialize(InitArgs::new()).await;

    assert_eq!(report.exceptions(), 1);
    assert!(matches!(
        report.failures[0].error,
        RuntimeError::Initialization { .. }
    ));
    let probe = app.get::<Probe>(None).expect("instance kept");
    assert_eq!(probe.initialize_count(), 0);
}

#[tokio::test]
async fn initialization_follows_category_order() {
    let log = Recorder::new();
    let controller_log = log.clone();
    let service_log = log.clone();

    let app = ApplicationBuilder::new()
        .component(ComponentType::new(
            TypeKey::named("Queue"),
            Category::Controllers,
            move |cx| {
                Ok(Constructed::ready(
                    Probe::new("Queue", &cx).logging_to(controller_log.clone()),
                ))
            },
        ))
        .component(ComponentType::new(
            TypeKey::named("Player"),
            Category::Services,
            move |cx| {
                Ok(Constructed::ready(
                    Probe::new("Player", &cx).logging_to(service_log.clone()),
                ))
            },
        ))
        .build();
    app.initialize(InitArgs::new()).await;

    assert_eq!(log.labels(), vec!["Player.initialize", "Queue.initialize"]);
}

#[tokio::test]
async fn failures_are_isolated_within_a_pass() {
    let app = ApplicationBuilder::new()
        .component(ComponentType::new(
            TypeKey::named("Grumpy"),
            Category::Services,
            |cx| {
                Ok(Constructed::ready(
                    Probe::new("Grumpy", &cx).failing_initialize().failing_close(),
                ))
            },
        ))
        .component(ComponentType::new(
            TypeKey::named("Happy"),
            Category::Services,
            |cx| Ok(Constructed::ready(Probe::new("Happy", &cx))),
        ))
        .build();

    let report = app.initialize(InitArgs::new()).await;
    assert_eq!((report.created, report.exceptions()), (2, 1));

    let happy = app
        .get_component(TypeKey::named("Happy"), None)
        .expect("happy");
    assert_eq!(
        happy.property("name").await,
        Ok(Some(json!("Happy")))
    );

    let report = app.close().await;
    assert_eq!((report.closed, report.exceptions()), (2, 1));
    assert!(matches!(report.failures[0].error, RuntimeError::Close { .. }));
    assert_eq!(app.instance_count(), 0);
}

#[tokio::test]
async fn pending_construction_resolved_before_handlers() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let app = ApplicationBuilder::new()
        .component(ComponentType::of::<Probe>(Category::Views, |cx| {
            Ok(Constructed::pending(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Arc::new(Probe::new("Slow", &cx)) as Arc<dyn Component>)
            }))
        }))
        .on_construct_typed::<Probe>(move |_app, _probe| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();
    assert!(matches!(
        app.get::<Probe>(None),
        Err(RuntimeError::NotFound(_))
    ));

    let report = app.initialize(InitArgs::new()).await;

    assert_eq!(report.created, 1);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(app.get::<Probe>(None).expect("resolved").initialize_count(), 1);
}

#[tokio::test]
async fn failing_pending_construction_is_reported() {
    let app = ApplicationBuilder::new()
        .component(ComponentType::of::<Probe>(Category::Views, |_cx| {
            Ok(Constructed::pending(async {
                Err(ComponentError::ConstructFailed("remote refused".into()))
            }))
        }))
        .build();
    assert_eq!(app.instance_count(), 1);

    let report = app.initialize(InitArgs::new()).await;

    assert_eq!(report.exceptions(), 1);
    assert_eq!(report.created, 0);
    assert_eq!(app.instance_count(), 0);
}

#[tokio::test]
async fn refresh_calls_share_one_pass() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = initialized(ApplicationBuilder::new().component(chat_type(&relations))).await;

    relations.push(&Relation::new("b"));
    let first = app.refresh();
    let second = app.refresh();
    assert!(first.same_pass(&second));

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first, second);
    assert_eq!(first.created, 1);

    let third = app.refresh();
    assert_eq!(third.await.created, 0);
}

#[tokio::test]
async fn component_requested_refresh_runs_a_pass() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = initialized(ApplicationBuilder::new().component(chat_type(&relations))).await;

    let b = Relation::new("b");
    relations.push(&b);
    app.get::<Probe>(Some(&a))
        .expect("a")
        .base()
        .request_refresh();

    let report = app.refresh().await;
    assert_eq!(report.created, 1);
    assert!(app.get::<Probe>(Some(&b)).is_ok());
}

#[tokio::test]
async fn refresh_waits_for_initialize() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = ApplicationBuilder::new().component(chat_type(&relations)).build();

    let b = Relation::new("b");
    relations.push(&b);
    let pending = app.refresh();

    let early = tokio::time::timeout(Duration::from_millis(50), pending.clone()).await;
    assert!(early.is_err(), "refresh ran before initialize");
    assert!(app.get::<Probe>(Some(&b)).is_err());

    app.initialize(InitArgs::new()).await;
    let report = pending.await;

    assert_eq!(report.created, 1);
    assert_eq!(
        app.get::<Probe>(Some(&b)).expect("b").initialize_count(),
        1
    );
}

#[tokio::test]
async fn refresh_after_close_waits_for_next_initialize() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = initialized(ApplicationBuilder::new().component(chat_type(&relations))).await;

    app.close().await;
    assert!(!app.is_initialized());

    let b = Relation::new("b");
    relations.push(&b);
    let pending = app.refresh();

    let early = tokio::time::timeout(Duration::from_millis(50), pending.clone()).await;
    assert!(early.is_err(), "refresh ran while closed");
    assert_eq!(app.instance_count(), 0);

    let init = app.initialize(InitArgs::new()).await;
    assert_eq!(init.created, 2);
    let report = pending.await;

    assert_eq!((report.created, report.closed), (0, 0));
    assert_eq!(app.instance_count(), 2);
    assert!(app.get::<Probe>(Some(&b)).is_ok());
}

#[tokio::test]
async fn pending_refresh_ends_when_application_dropped() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = ApplicationBuilder::new().component(chat_type(&relations)).build();

    let pending = app.refresh();
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(app);

    let report = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("pass released after drop");
    assert_eq!((report.created, report.closed), (0, 0));
}

#[tokio::test]
async fn debounce_delays_the_pass() {
    let config = RuntimeConfig::from_toml("[reconciler]\nrefresh_debounce_ms = 30\n")
        .expect("valid config");
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = initialized(
        ApplicationBuilder::new()
            .config(config)
            .component(chat_type(&relations)),
    )
    .await;

    relations.push(&Relation::new("b"));
    let pending = app.refresh();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let joined = app.refresh();
    assert!(pending.same_pass(&joined));

    let started = tokio::time::Instant::now();
    assert_eq!(pending.await.created, 1);
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn close_clears_instances_and_exposures() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = initialized(expose_ping(
        ApplicationBuilder::new().component(chat_type(&relations)),
    ))
    .await;
    let probe = app.get::<Probe>(Some(&a)).expect("a");
    assert_eq!(app.exposer().modules(), vec!["chat".to_string()]);

    let report = app.close().await;

    assert_eq!(report.closed, 1);
    assert!(report.is_clean());
    assert_eq!(probe.close_count(), 1);
    assert_eq!(app.instance_count(), 0);
    assert!(app.exposer().modules().is_empty());
    assert!(!app.is_initialized());

    // A new initialize rebuilds from the current lists.
    let report = app.initialize(InitArgs::new()).await;
    assert_eq!(report.created, 1);
    assert!(app.exposer().is_exposed("chat", "ping"));
}

#[tokio::test]
async fn lookups_match_ancestors_and_relations() {
    let a = Relation::new("a");
    let relations = Relations::of(&[&a]);
    let app = initialized(
        ApplicationBuilder::new()
            .component(chat_type(&relations).extends(TypeKey::named("Controller")))
            .component(
                ComponentType::new(TypeKey::named("Queue"), Category::Controllers, |cx| {
                    Ok(Constructed::ready(Probe::new("Queue", &cx)))
                })
                .extends(TypeKey::named("Controller")),
            ),
    )
    .await;

    assert_eq!(
        app.get_components(TypeKey::named("Controller"), None).len(),
        2
    );
    assert_eq!(
        app.get_components(TypeKey::named("Controller"), Some(&a))
            .len(),
        1
    );
    assert!(app
        .get_components(TypeKey::named("Controller"), Some(&Relation::new("a")))
        .is_empty());
    assert_eq!(app.get_all::<Probe>(None).len(), 1);
    assert!(matches!(
        app.get_component(TypeKey::named("Missing"), None),
        Err(RuntimeError::NotFound(_))
    ));
}

#[tokio::test]
async fn config_supplies_init_args_and_builder_overrides() {
    let config = RuntimeConfig::from_toml(
        r#"
[components.Player]
args = [30]

[components.Queue]
args = ["fifo"]
"#,
    )
    .expect("valid config");

    let app = ApplicationBuilder::new()
        .config(config)
        .component(ComponentType::new(
            TypeKey::named("Player"),
            Category::Services,
            |cx| Ok(Constructed::ready(Probe::new("Player", &cx))),
        ))
        .component(ComponentType::new(
            TypeKey::named("Queue"),
            Category::Services,
            |cx| Ok(Constructed::ready(Probe::new("Queue", &cx))),
        ))
        .configure(TypeKey::named("Queue"), vec![json!("lifo")])
        .build();
    app.initialize(InitArgs::new()).await;

    let args_of = |name: &'static str| {
        app.get_component(TypeKey::named(name), None)
            .ok()
            .and_then(tessera_component::downcast_arc::<Probe>)
            .and_then(|probe| probe.init_args())
    };
    assert_eq!(args_of("Player"), Some(vec![json!(30)]));
    assert_eq!(args_of("Queue"), Some(vec![json!("lifo")]));
}
