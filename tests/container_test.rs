//! Container integration tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future;
use yard_di::definition::{
    ArrayDefinition, ExtensionDefinition, FactoryDefinition, FactoryParameter, ObjectDefinition,
};
use yard_di::environment::MapEnvironment;
use yard_di::invoker::RequestedEntry;
use yard_di::resolver::{DefinitionResolver, LazyProxy, ResolutionContext};
use yard_di::{
    Container, ContainerBuilder, ContainerError, Definition, InvalidDefinitionReason, Parameters,
    Value,
};

#[derive(Debug)]
struct Client {
    api_key: String,
}

fn counting_factory(counter: &Arc<AtomicUsize>) -> Definition {
    let counter = counter.clone();
    Definition::factory(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(String::from("built"))
    })
}

#[test]
fn test_value_entries_are_memoized() {
    let container = ContainerBuilder::new()
        .add_definition("apiKey", "ABC123")
        .build()
        .unwrap();

    let first = container.get("apiKey").unwrap();
    let second = container.get("apiKey").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.downcast_ref::<String>().unwrap(), "ABC123");
}

#[test]
fn test_client_receives_api_key_and_is_cached() {
    let container = ContainerBuilder::new()
        .add_definition("apiKey", "ABC123")
        .add_definition(
            "client",
            Definition::factory(|c| {
                Ok(Client {
                    api_key: c.get_as::<String>("apiKey")?.to_string(),
                })
            }),
        )
        .build()
        .unwrap();

    let client = container.get_as::<Client>("client").unwrap();
    assert_eq!(client.api_key, "ABC123");
    let again = container.get_as::<Client>("client").unwrap();
    assert!(Arc::ptr_eq(&client, &again));
}

#[test]
fn test_circular_dependency_reports_chain_and_recovers() {
    let container = ContainerBuilder::new()
        .add_definition("a", Definition::factory(|c| Ok(c.get("b")?)))
        .add_definition("b", Definition::factory(|c| Ok(c.get("a")?)))
        .add_definition("unrelated", 42i64)
        .build()
        .unwrap();

    let err = container.get("a").unwrap_err();
    match &err {
        ContainerError::CircularDependency { entry, chain } => {
            assert_eq!(entry, "a");
            assert_eq!(chain, &["a", "b", "a"]);
        }
        other => panic!("expected a circular dependency, got {other}"),
    }
    assert!(err.to_string().contains("a -> b -> a"));

    // the in-progress chain was released
    assert_eq!(*container.get_as::<i64>("unrelated").unwrap(), 42);
    assert!(container.get("b").unwrap_err().is_circular());
    assert_eq!(container.stats().circular_dependency_failures, 2);
}

#[test]
fn test_longer_cycle_keeps_discovery_order() {
    let container = ContainerBuilder::new()
        .add_definition("parser", Definition::reference("lexer"))
        .add_definition("lexer", Definition::reference("source"))
        .add_definition("source", Definition::reference("parser"))
        .build()
        .unwrap();

    let err = container.get("parser").unwrap_err();
    assert!(err
        .to_string()
        .ends_with("Dependencies: parser -> lexer -> source -> parser"));
}

#[test]
fn test_self_alias_is_circular() {
    let container = ContainerBuilder::new()
        .add_definition("me", Definition::alias("me"))
        .build()
        .unwrap();

    match container.get("me").unwrap_err() {
        ContainerError::CircularDependency { chain, .. } => assert_eq!(chain, ["me", "me"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_has_never_constructs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = ContainerBuilder::new()
        .add_definition("service", counting_factory(&calls))
        .build()
        .unwrap();

    assert!(container.has("service"));
    assert!(!container.has("missing"));
    assert!(container.can_resolve("service"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    container.get("service").unwrap();
    container.get("service").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_set_before_and_after_resolution() {
    let container = ContainerBuilder::new()
        .add_definition("locale", "en_US")
        .build()
        .unwrap();

    container.set("locale", "nl_NL").unwrap();
    assert_eq!(container.get_as::<String>("locale").unwrap().as_str(), "nl_NL");

    let err = container.set("locale", "de_DE").unwrap_err();
    assert!(matches!(err, ContainerError::InvalidState(_)));
    assert_eq!(container.get_as::<String>("locale").unwrap().as_str(), "nl_NL");
}

#[test]
fn test_shared_factory_sees_distinct_requested_entries() {
    let factory = FactoryDefinition::new(|call| Ok(call.requested_entry().clone()));
    let container = ContainerBuilder::new()
        .add_definition("deepl.free", factory.clone())
        .add_definition("deepl.pro", factory)
        .build()
        .unwrap();

    let free = container.get_as::<RequestedEntry>("deepl.free").unwrap();
    let pro = container.get_as::<RequestedEntry>("deepl.pro").unwrap();
    assert_eq!(free.name(), "deepl.free");
    assert_eq!(pro.name(), "deepl.pro");
}

#[test]
fn test_factory_parameters_binding_order() {
    let factory = FactoryDefinition::new(|call| {
        let greeting = call.arg::<String>("greeting")?;
        let name = call.arg::<String>("name")?;
        let punctuation = call.arg::<String>("punctuation")?;
        Ok(format!("{greeting}, {name}{punctuation}"))
    })
    .parameter(FactoryParameter::new("greeting").default_value(String::from("Hello")))
    .parameter(FactoryParameter::new("name").typed("user.name"))
    .parameter(FactoryParameter::new("punctuation").default_value(String::from(".")))
    .transient();

    let container = ContainerBuilder::new()
        .add_definition("user.name", "Ada")
        .add_definition("greeter", factory)
        .build()
        .unwrap();

    let default = container.get_as::<String>("greeter").unwrap();
    assert_eq!(default.as_str(), "Hello, Ada.");

    let made = container
        .make(
            "greeter",
            Parameters::new()
                .with("greeting", String::from("Hoi"))
                .with("punctuation", String::from("!")),
        )
        .unwrap();
    assert_eq!(made.downcast_ref::<String>().unwrap(), "Hoi, Ada!");
}

#[test]
fn test_unbound_parameter_is_invalid_definition() {
    let factory = FactoryDefinition::new(|call| Ok(*call.arg::<i64>("port")?))
        .parameter(FactoryParameter::new("port"));
    let container = ContainerBuilder::new()
        .add_definition("port", factory)
        .build()
        .unwrap();

    match container.get("port").unwrap_err() {
        ContainerError::InvalidDefinition {
            entry,
            reason: InvalidDefinitionReason::NotEnoughParameters { name, position },
        } => {
            assert_eq!(entry, "port");
            assert_eq!(name, "port");
            assert_eq!(position, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_factory_from_entry_must_be_callable() {
    let container = ContainerBuilder::new()
        .add_definition("notCallable", 5i64)
        .add_definition("broken", FactoryDefinition::from_entry("notCallable"))
        .add_definition("dangling", FactoryDefinition::from_entry("nowhere"))
        .add_definition(
            "builder",
            Definition::value(yard_di::definition::callable(|_| Ok(7i64))),
        )
        .add_definition("seven", FactoryDefinition::from_entry("builder"))
        .build()
        .unwrap();

    for entry in ["broken", "dangling"] {
        assert!(matches!(
            container.get(entry).unwrap_err(),
            ContainerError::InvalidDefinition {
                reason: InvalidDefinitionReason::NotCallable(_),
                ..
            }
        ));
    }
    assert_eq!(*container.get_as::<i64>("seven").unwrap(), 7);
}

#[test]
fn test_factory_errors_are_wrapped_but_container_errors_pass_through() {
    let container = ContainerBuilder::new()
        .add_definition(
            "remote",
            Definition::factory(|_| -> anyhow::Result<String> { anyhow::bail!("HTTP 403 from DeepL") }),
        )
        .add_definition("needsMissing", Definition::factory(|c| Ok(c.get("missing")?)))
        .build()
        .unwrap();

    let err = container.get("remote").unwrap_err();
    assert!(matches!(
        err,
        ContainerError::InvalidDefinition {
            reason: InvalidDefinitionReason::Failed { .. },
            ..
        }
    ));
    assert!(err.to_string().contains("HTTP 403 from DeepL"));

    assert!(container.get("needsMissing").unwrap_err().is_not_found());
}

#[test]
fn test_not_found_suggests_close_name() {
    let container = ContainerBuilder::new()
        .add_definition("translationService", "deepl")
        .build()
        .unwrap();

    let err = container.get("translation").unwrap_err();
    assert_eq!(
        err.to_string(),
        "No entry or class found for 'translation'. Did you mean 'translationService'?"
    );
}

#[test]
fn test_environment_variables_with_defaults() {
    let env = MapEnvironment::new().with("DEEPL_API_KEY", "from-env");
    let container = ContainerBuilder::new()
        .environment(Arc::new(env))
        .add_definition("apiKey", Definition::env("DEEPL_API_KEY"))
        .add_definition("fallbackKey", "fallback")
        .add_definition(
            "endpoint",
            Definition::env_or("DEEPL_ENDPOINT", Definition::reference("fallbackKey")),
        )
        .add_definition("missing", Definition::env("NOT_SET_ANYWHERE"))
        .build()
        .unwrap();

    assert_eq!(container.get_as::<String>("apiKey").unwrap().as_str(), "from-env");
    assert_eq!(container.get_as::<String>("endpoint").unwrap().as_str(), "fallback");
    match container.get("missing").unwrap_err() {
        ContainerError::NotFound { name, .. } => assert_eq!(name, "NOT_SET_ANYWHERE"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!container.can_resolve("missing"));
}

#[test]
fn test_arrays_preserve_order() {
    let container = ContainerBuilder::new()
        .add_definition("nl", "nl")
        .add_definition(
            "languages",
            ArrayDefinition::new(vec![
                Definition::value(String::from("en")),
                Definition::reference("nl"),
                Definition::value(String::from("de")),
            ]),
        )
        .build()
        .unwrap();

    let items = container.get_as::<Vec<Value>>("languages").unwrap();
    let items: Vec<&str> = items
        .iter()
        .map(|item| item.downcast_ref::<String>().unwrap().as_str())
        .collect();
    assert_eq!(items, ["en", "nl", "de"]);
}

#[test]
fn test_string_expressions() {
    let container = ContainerBuilder::new()
        .add_definition("host", "api-free.deepl.com")
        .add_definition("version", 2i64)
        .add_definition("url", Definition::string("https://{host}/v{version}/translate"))
        .build()
        .unwrap();

    assert_eq!(
        container.get_as::<String>("url").unwrap().as_str(),
        "https://api-free.deepl.com/v2/translate"
    );
}

#[test]
fn test_string_expression_does_not_rescan_substituted_text() {
    let container = ContainerBuilder::new()
        .add_definition("host", "{version}")
        .add_definition("version", 2i64)
        .add_definition("url", Definition::string("{host}/{version}"))
        .build()
        .unwrap();

    assert_eq!(container.get_as::<String>("url").unwrap().as_str(), "{version}/2");
}

#[test]
fn test_factory_can_forward_another_entry() {
    for compile in [false, true] {
        let mut builder = ContainerBuilder::new();
        if compile {
            builder.enable_compilation();
        }
        let container = builder
            .add_definition("apiKey", "ABC123")
            .add_definition("defaultKey", Definition::factory(|c| Ok(c.get("apiKey")?)))
            .build()
            .unwrap();

        assert_eq!(container.get_as::<String>("defaultKey").unwrap().as_str(), "ABC123");
        assert!(Arc::ptr_eq(
            &container.get("defaultKey").unwrap(),
            &container.get("apiKey").unwrap()
        ));
    }
}

struct Mailer {
    transport: Arc<String>,
    sender: Option<Arc<String>>,
}

#[test]
fn test_object_constructor_and_property_injection() {
    let mailer = ObjectDefinition::new(|args| {
        Ok(Mailer {
            transport: args.at::<String>(0)?,
            sender: None,
        })
    })
    .argument(Definition::reference("transport"))
    .property("sender", "noreply@example.com", |mailer: &mut Mailer, sender: Arc<String>| {
        mailer.sender = Some(sender)
    });

    let container = ContainerBuilder::new()
        .add_definition("transport", "smtp")
        .add_definition("mailer", mailer)
        .build()
        .unwrap();

    let mailer = container.get_as::<Mailer>("mailer").unwrap();
    assert_eq!(mailer.transport.as_str(), "smtp");
    assert_eq!(mailer.sender.as_deref().map(String::as_str), Some("noreply@example.com"));
}

struct Parent {
    child: Arc<LazyProxy>,
}

struct Child {
    parent: Arc<LazyProxy>,
}

#[test]
fn test_lazy_objects_allow_mutual_references() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let parent_count = constructed.clone();
    let child_count = constructed.clone();

    let container = ContainerBuilder::new()
        .add_definition(
            "parent",
            ObjectDefinition::new(move |args| {
                parent_count.fetch_add(1, Ordering::SeqCst);
                Ok(Parent { child: args.at::<LazyProxy>(0)? })
            })
            .argument(Definition::reference("child"))
            .lazy(),
        )
        .add_definition(
            "child",
            ObjectDefinition::new(move |args| {
                child_count.fetch_add(1, Ordering::SeqCst);
                Ok(Child { parent: args.at::<LazyProxy>(0)? })
            })
            .argument(Definition::reference("parent"))
            .lazy(),
        )
        .build()
        .unwrap();

    let proxy = container.get_as::<LazyProxy>("parent").unwrap();
    assert!(!proxy.is_initialized());
    assert_eq!(constructed.load(Ordering::SeqCst), 0);

    let parent = container.get_as::<Parent>("parent").unwrap();
    let child = parent.child.instance_as::<Child>().unwrap();
    assert!(Arc::ptr_eq(&child.parent, &proxy));
    assert!(Arc::ptr_eq(&child.parent.instance_as::<Parent>().unwrap(), &parent));
    assert_eq!(constructed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_lazy_object_needing_itself_is_circular() {
    let container = ContainerBuilder::new()
        .add_definition(
            "selfish",
            ObjectDefinition::new(|args| Ok(args.at::<String>(0)?))
                .argument(Definition::factory(|c| {
                    let me = c.get_as::<LazyProxy>("selfish")?;
                    Ok(me.instance_as::<String>()?.to_string())
                }))
                .lazy(),
        )
        .build()
        .unwrap();

    let proxy = container.get_as::<LazyProxy>("selfish").unwrap();
    assert!(proxy.instance().unwrap_err().is_circular());
}

#[test]
fn test_parent_container_fallback() {
    let parent = ContainerBuilder::new()
        .add_definition("apiKey", "from-parent")
        .build()
        .unwrap();
    let child = ContainerBuilder::new()
        .parent(parent.clone())
        .add_definition("local", 1i64)
        .build()
        .unwrap();

    assert!(child.has("apiKey"));
    assert_eq!(child.get_as::<String>("apiKey").unwrap().as_str(), "from-parent");
    assert_eq!(child.known_entry_names(), ["local"]);
    assert!(child.get("nothing").unwrap_err().is_not_found());
}

struct WordpressOptions;

impl DefinitionResolver<ExtensionDefinition> for WordpressOptions {
    fn resolve(&self, definition: &ExtensionDefinition, _context: &ResolutionContext<'_>) -> yard_di::Result<Value> {
        let option = definition.payload_as::<&'static str>().copied().unwrap_or_default();
        Ok(Arc::new(format!("option:{option}")))
    }

    fn is_resolvable(&self, _definition: &ExtensionDefinition, _context: &ResolutionContext<'_>) -> bool {
        true
    }
}

#[test]
fn test_extension_kinds_need_a_resolver() {
    let definition = ExtensionDefinition::new("wp_option", "deepl_api_key");

    let plain = ContainerBuilder::new()
        .add_definition("apiKey", definition.clone())
        .build()
        .unwrap();
    assert!(matches!(
        plain.get("apiKey").unwrap_err(),
        ContainerError::UnsupportedDefinitionKind { kind } if kind == "wp_option"
    ));
    assert!(!plain.can_resolve("apiKey"));

    let extended = ContainerBuilder::new()
        .register_resolver("wp_option", Arc::new(WordpressOptions))
        .add_definition("apiKey", definition)
        .build()
        .unwrap();
    assert_eq!(
        extended.get_as::<String>("apiKey").unwrap().as_str(),
        "option:deepl_api_key"
    );
}

#[test]
fn test_type_mismatch_names_expected_type() {
    let container = ContainerBuilder::new()
        .add_definition("retries", 3i64)
        .build()
        .unwrap();

    match container.get_as::<String>("retries").unwrap_err() {
        ContainerError::InvalidDefinition {
            reason: InvalidDefinitionReason::TypeMismatch { expected },
            ..
        } => assert_eq!(expected, "alloc::string::String"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_make_bypasses_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = ContainerBuilder::new()
        .add_definition("service", counting_factory(&calls))
        .build()
        .unwrap();

    let cached = container.get("service").unwrap();
    let made = container.make("service", Parameters::new()).unwrap();
    assert!(!Arc::ptr_eq(&cached, &made));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(Arc::ptr_eq(&cached, &container.get("service").unwrap()));
}

#[test]
fn test_container_stats() {
    let container = ContainerBuilder::new()
        .add_definition("a", 1i64)
        .add_definition("b", 2i64)
        .build()
        .unwrap();

    for _ in 0..4 {
        container.get("a").unwrap();
    }
    let stats = container.stats();
    assert_eq!(stats.total_resolutions, 4);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.cache_hits, 3);
    assert_eq!(stats.registered_entries, 2);
    assert_eq!(stats.resolved_entries, 1);
    assert_eq!(stats.hit_rate(), 0.75);
}

#[tokio::test]
async fn test_concurrent_singleton_resolution() {
    let creation_count = Arc::new(AtomicUsize::new(0));
    let counter = creation_count.clone();
    let container = ContainerBuilder::new()
        .add_definition(
            "slow",
            Definition::factory(move |_: &Container| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(String::from("ready"))
            }),
        )
        .build()
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let container = container.clone();
        handles.push(tokio::task::spawn_blocking(move || container.get("slow")));
    }

    let results = future::join_all(handles).await;
    let values: Vec<Value> = results
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(creation_count.load(Ordering::SeqCst), 1);
    assert!(values.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}
