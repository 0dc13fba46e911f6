//! Integration tests for MuxServer routing and fan-out
//!
//! Every test wires `TestServer` backends into a mux through their factories.
//! A `TestServer` factory hands out the same instance on every call, so the
//! calls made through the mux can be inspected on the handle the test keeps.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pmux_core::{
    ApplyResourceChangeRequest, BackendError, BackendResult, ConfigureProviderRequest,
    Diagnostic, DynamicValue, GetProviderSchemaRequest, ImportResourceStateRequest,
    PlanResourceChangeRequest, PrepareProviderConfigRequest, ProviderBackend,
    ReadDataSourceRequest, ReadResourceRequest, Rpc, StopProviderRequest, StopProviderResponse,
    TypeKind,
    UpgradeResourceStateRequest, ValidateDataSourceConfigRequest,
    ValidateResourceTypeConfigRequest,
};
use pmux_server::{aggregate, AggregationError, BackendFactory, MuxServer};
use pmux_testserver::{CallJournal, TestServer};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Issue `rpc` for `type_name` through the mux and return the diagnostics
async fn call_typed(mux: &MuxServer, rpc: Rpc, type_name: &str) -> BackendResult<Vec<Diagnostic>> {
    let type_name = type_name.to_string();
    let diagnostics = match rpc {
        Rpc::ValidateResourceTypeConfig => {
            mux.validate_resource_type_config(&ValidateResourceTypeConfigRequest {
                type_name,
                config: None,
            })
            .await?
            .diagnostics
        }
        Rpc::UpgradeResourceState => {
            mux.upgrade_resource_state(&UpgradeResourceStateRequest {
                type_name,
                ..Default::default()
            })
            .await?
            .diagnostics
        }
        Rpc::ReadResource => {
            mux.read_resource(&ReadResourceRequest {
                type_name,
                ..Default::default()
            })
            .await?
            .diagnostics
        }
        Rpc::PlanResourceChange => {
            mux.plan_resource_change(&PlanResourceChangeRequest {
                type_name,
                ..Default::default()
            })
            .await?
            .diagnostics
        }
        Rpc::ApplyResourceChange => {
            mux.apply_resource_change(&ApplyResourceChangeRequest {
                type_name,
                ..Default::default()
            })
            .await?
            .diagnostics
        }
        Rpc::ImportResourceState => {
            mux.import_resource_state(&ImportResourceStateRequest {
                type_name,
                id: "imported-id".to_string(),
            })
            .await?
            .diagnostics
        }
        Rpc::ValidateDataSourceConfig => {
            mux.validate_data_source_config(&ValidateDataSourceConfigRequest {
                type_name,
                config: None,
            })
            .await?
            .diagnostics
        }
        Rpc::ReadDataSource => {
            mux.read_data_source(&ReadDataSourceRequest {
                type_name,
                ..Default::default()
            })
            .await?
            .diagnostics
        }
        other => panic!("{other} is not a type-keyed RPC"),
    };
    Ok(diagnostics)
}

fn two_resource_servers() -> (Arc<TestServer>, Arc<TestServer>) {
    let one = TestServer::builder("server1")
        .resource("test_resource_server1")
        .data_source("test_data_source_server1")
        .build();
    let two = TestServer::builder("server2")
        .resource("test_resource_server2")
        .data_source("test_data_source_server2")
        .build();
    (one, two)
}

// =============================================================================
// Aggregation
// =============================================================================

#[tokio::test]
async fn duplicate_resource_type_fails_build() {
    let a = TestServer::builder("a").resource("test_foo").build();
    let b = TestServer::builder("b").resource("test_foo").build();

    let err = aggregate(vec![a.factory(), b.factory()]).await.err().unwrap();

    assert_eq!(
        err.to_string(),
        "resource \"test_foo\" supported by multiple server implementations (a (#0), b (#1)); remove support from one"
    );
}

#[tokio::test]
async fn duplicate_data_source_type_fails_build() {
    let a = TestServer::builder("a").data_source("test_foo").build();
    let b = TestServer::builder("b").resource("test_bar").build();
    let c = TestServer::builder("c").data_source("test_foo").build();

    let err = MuxServer::new(vec![a.factory(), b.factory(), c.factory()])
        .await
        .err()
        .unwrap();

    match err {
        AggregationError::DuplicateDataSourceType {
            type_name,
            first_owner,
            conflicting_owner,
        } => {
            assert_eq!(type_name, "test_foo");
            assert_eq!(first_owner.index, 0);
            assert_eq!(conflicting_owner.index, 2);
            assert_eq!(conflicting_owner.name, "c");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn duplicate_provider_schema_fails_build() {
    let a = TestServer::builder("a").provider_schema().build();
    let b = TestServer::builder("b").resource("test_bar").build();
    let c = TestServer::builder("c").provider_schema().build();

    let err = aggregate(vec![a.factory(), b.factory(), c.factory()])
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        AggregationError::DuplicateProviderSchema { ref first_owner, ref conflicting_owner }
            if first_owner.name == "a" && conflicting_owner.name == "c"
    ));
}

#[tokio::test]
async fn duplicate_provider_meta_schema_fails_build() {
    let a = TestServer::builder("a").provider_meta_schema().build();
    let b = TestServer::builder("b").provider_meta_schema().build();

    let err = aggregate(vec![a.factory(), b.factory()]).await.err().unwrap();

    assert!(matches!(err, AggregationError::DuplicateProviderMetaSchema { .. }));
    assert_eq!(
        err.to_string(),
        "provider_meta schema supported by multiple server implementations (a (#0), b (#1)), remove support from one"
    );
}

#[tokio::test]
async fn provider_and_meta_schema_may_come_from_different_backends() {
    let a = TestServer::builder("a").provider_schema().build();
    let b = TestServer::builder("b").provider_meta_schema().build();

    let aggregation = aggregate(vec![a.factory(), b.factory()]).await.unwrap();

    assert_eq!(aggregation.routing().provider_schema_owner(), Some(0));
    assert_eq!(aggregation.routing().provider_meta_schema_owner(), Some(1));
    assert!(aggregation.schema().provider().is_some());
    assert!(aggregation.schema().provider_meta().is_some());
}

#[tokio::test]
async fn schema_call_failure_stops_aggregation() {
    let a = TestServer::builder("a").fail_schema("connection refused").build();
    let b = TestServer::builder("b").resource("test_bar").build();

    let err = aggregate(vec![a.factory(), b.factory()]).await.err().unwrap();

    assert!(matches!(
        err,
        AggregationError::SchemaRetrievalFailed { ref backend, source: BackendError::Transport(_) }
            if backend.index == 0
    ));
    assert_eq!(b.call_count(Rpc::GetProviderSchema), 0);
}

#[tokio::test]
async fn error_diagnostic_in_schema_stops_aggregation() {
    let a = TestServer::builder("a").resource("test_foo").build();
    let b = TestServer::builder("b")
        .schema_diagnostic(Diagnostic::error("bad schema", "attribute type missing"))
        .build();
    let c = TestServer::builder("c").resource("test_bar").build();

    let err = aggregate(vec![a.factory(), b.factory(), c.factory()])
        .await
        .err()
        .unwrap();

    match err {
        AggregationError::BackendSchemaError {
            backend,
            attribute,
            summary,
            detail,
        } => {
            assert_eq!(backend.name, "b");
            assert_eq!(attribute, "");
            assert_eq!(summary, "bad schema");
            assert_eq!(detail, "attribute type missing");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(c.call_count(Rpc::GetProviderSchema), 0);
}

#[tokio::test]
async fn schema_warnings_keep_declaration_order() {
    let a = TestServer::builder("a")
        .schema_diagnostic(Diagnostic::warning("a1", ""))
        .schema_diagnostic(Diagnostic::warning("a2", ""))
        .build();
    let b = TestServer::builder("b").build();
    let c = TestServer::builder("c")
        .schema_diagnostic(Diagnostic::warning("c1", ""))
        .build();

    let mux = MuxServer::new(vec![a.factory(), b.factory(), c.factory()])
        .await
        .unwrap();
    let schema = mux
        .get_provider_schema(&GetProviderSchemaRequest::default())
        .await
        .unwrap();

    let summaries: Vec<&str> = schema.diagnostics.iter().map(|d| d.summary.as_str()).collect();
    assert_eq!(summaries, vec!["a1", "a2", "c1"]);
}

#[tokio::test]
async fn factories_are_invoked_once_per_phase() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let factory: BackendFactory = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        TestServer::builder("fresh").resource("test_fresh").build() as Arc<dyn ProviderBackend>
    });

    let aggregation = aggregate(vec![factory]).await.unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);

    let mux = aggregation.server();
    assert_eq!(built.load(Ordering::SeqCst), 2);

    // the serving instance is a fresh backend, not the introspected one
    let diags = call_typed(&mux, Rpc::ReadResource, "test_fresh").await.unwrap();
    assert_eq!(diags[0].summary, "fresh handled ReadResource");
}

// =============================================================================
// GetProviderSchema
// =============================================================================

#[tokio::test]
async fn get_provider_schema_merges_and_never_calls_backends() {
    let (one, two) = two_resource_servers();
    let aggregation = aggregate(vec![one.factory(), two.factory()]).await.unwrap();
    let mux = aggregation.server();

    let first = mux
        .get_provider_schema(&GetProviderSchemaRequest::default())
        .await
        .unwrap();
    let second = mux
        .get_provider_schema(&GetProviderSchemaRequest::default())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, aggregation.schema().to_response());
    assert_eq!(
        first.resource_schemas.keys().collect::<Vec<_>>(),
        vec!["test_resource_server1", "test_resource_server2"]
    );
    assert_eq!(
        first.data_source_schemas.keys().collect::<Vec<_>>(),
        vec!["test_data_source_server1", "test_data_source_server2"]
    );
    // only the aggregation run asked for schemas
    assert_eq!(one.call_count(Rpc::GetProviderSchema), 1);
    assert_eq!(two.call_count(Rpc::GetProviderSchema), 1);
}

// =============================================================================
// PrepareProviderConfig
// =============================================================================

#[tokio::test]
async fn prepare_provider_config_goes_to_provider_schema_owner() {
    let a = TestServer::builder("a").resource("test_foo").build();
    let b = TestServer::builder("b").provider_schema().build();
    let mux = MuxServer::new(vec![a.factory(), b.factory()]).await.unwrap();

    let config = DynamicValue::from_json(br#"{"region":"eu-west-1"}"#.to_vec());
    let resp = mux
        .prepare_provider_config(&PrepareProviderConfigRequest {
            config: Some(config.clone()),
        })
        .await
        .unwrap();

    assert_eq!(resp.prepared_config, Some(config));
    assert_eq!(a.call_count(Rpc::PrepareProviderConfig), 0);
    assert_eq!(b.call_count(Rpc::PrepareProviderConfig), 1);
}

#[tokio::test]
async fn prepare_provider_config_without_owner_fails() {
    let (one, two) = two_resource_servers();
    let mux = MuxServer::new(vec![one.factory(), two.factory()]).await.unwrap();

    let err = mux
        .prepare_provider_config(&PrepareProviderConfigRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::NoProviderSchemaOwner));
    assert_eq!(one.call_count(Rpc::PrepareProviderConfig), 0);
    assert_eq!(two.call_count(Rpc::PrepareProviderConfig), 0);
}

// =============================================================================
// Type-keyed routing
// =============================================================================

#[rstest]
#[case::validate_resource(Rpc::ValidateResourceTypeConfig, "test_resource")]
#[case::upgrade_resource(Rpc::UpgradeResourceState, "test_resource")]
#[case::read_resource(Rpc::ReadResource, "test_resource")]
#[case::plan_resource(Rpc::PlanResourceChange, "test_resource")]
#[case::apply_resource(Rpc::ApplyResourceChange, "test_resource")]
#[case::import_resource(Rpc::ImportResourceState, "test_resource")]
#[case::validate_data_source(Rpc::ValidateDataSourceConfig, "test_data_source")]
#[case::read_data_source(Rpc::ReadDataSource, "test_data_source")]
#[tokio::test]
async fn type_keyed_rpc_reaches_only_the_owner(#[case] rpc: Rpc, #[case] prefix: &str) {
    let (one, two) = two_resource_servers();
    let mux = MuxServer::new(vec![one.factory(), two.factory()]).await.unwrap();

    let first = format!("{prefix}_server1");
    let diags = call_typed(&mux, rpc, &first).await.unwrap();
    assert_eq!(diags, vec![one.handled_diagnostic(rpc, &first)]);
    assert!(one.was_called(rpc, &first));
    assert!(!two.was_called(rpc, &first));

    let second = format!("{prefix}_server2");
    let diags = call_typed(&mux, rpc, &second).await.unwrap();
    assert_eq!(diags, vec![two.handled_diagnostic(rpc, &second)]);
    assert!(!one.was_called(rpc, &second));
    assert!(two.was_called(rpc, &second));
}

#[rstest]
#[case::validate_resource(Rpc::ValidateResourceTypeConfig, TypeKind::Resource)]
#[case::upgrade_resource(Rpc::UpgradeResourceState, TypeKind::Resource)]
#[case::read_resource(Rpc::ReadResource, TypeKind::Resource)]
#[case::plan_resource(Rpc::PlanResourceChange, TypeKind::Resource)]
#[case::apply_resource(Rpc::ApplyResourceChange, TypeKind::Resource)]
#[case::import_resource(Rpc::ImportResourceState, TypeKind::Resource)]
#[case::validate_data_source(Rpc::ValidateDataSourceConfig, TypeKind::DataSource)]
#[case::read_data_source(Rpc::ReadDataSource, TypeKind::DataSource)]
#[tokio::test]
async fn unknown_type_touches_no_backend(#[case] rpc: Rpc, #[case] expected_kind: TypeKind) {
    let (one, two) = two_resource_servers();
    let mux = MuxServer::new(vec![one.factory(), two.factory()]).await.unwrap();

    let err = call_typed(&mux, rpc, "test_nobody").await.unwrap_err();

    match err {
        BackendError::UnsupportedType { kind, type_name } => {
            assert_eq!(kind, expected_kind);
            assert_eq!(type_name, "test_nobody");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(one.call_count(rpc), 0);
    assert_eq!(two.call_count(rpc), 0);
}

#[tokio::test]
async fn resource_name_does_not_route_data_source_rpcs() {
    let (one, two) = two_resource_servers();
    let mux = MuxServer::new(vec![one.factory(), two.factory()]).await.unwrap();

    let err = call_typed(&mux, Rpc::ReadDataSource, "test_resource_server1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackendError::UnsupportedType {
            kind: TypeKind::DataSource,
            ..
        }
    ));
    assert!(one.calls().iter().all(|c| c.rpc == Rpc::GetProviderSchema));
}

#[tokio::test]
async fn responses_are_forwarded_unmodified() {
    let (one, two) = two_resource_servers();
    let mux = MuxServer::new(vec![one.factory(), two.factory()]).await.unwrap();

    let req = ApplyResourceChangeRequest {
        type_name: "test_resource_server2".to_string(),
        planned_state: Some(DynamicValue::from_msgpack(vec![0x81, 0xa2, 0x69, 0x64])),
        planned_private: b"private-bytes".to_vec(),
        ..Default::default()
    };

    let via_mux = mux.apply_resource_change(&req).await.unwrap();
    let direct = two.apply_resource_change(&req).await.unwrap();

    assert_eq!(via_mux, direct);
}

#[tokio::test]
async fn concurrent_requests_route_independently() {
    let (one, two) = two_resource_servers();
    let mux = Arc::new(MuxServer::new(vec![one.factory(), two.factory()]).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..8 {
        let mux = Arc::clone(&mux);
        handles.push(tokio::spawn(async move {
            let type_name = if i % 2 == 0 {
                "test_resource_server1"
            } else {
                "test_resource_server2"
            };
            call_typed(&mux, Rpc::ReadResource, type_name).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(one.call_count(Rpc::ReadResource), 4);
    assert_eq!(two.call_count(Rpc::ReadResource), 4);
}

// =============================================================================
// ConfigureProvider
// =============================================================================

#[tokio::test]
async fn configure_calls_every_backend_and_concatenates_diagnostics() {
    let journal = CallJournal::new();
    let a = TestServer::builder("a")
        .journal(&journal)
        .configure_diagnostic(Diagnostic::warning("a-warn", ""))
        .build();
    let b = TestServer::builder("b").journal(&journal).build();
    let c = TestServer::builder("c")
        .journal(&journal)
        .configure_diagnostic(Diagnostic::warning("c-warn-1", ""))
        .configure_diagnostic(Diagnostic::warning("c-warn-2", ""))
        .build();
    let mux = MuxServer::new(vec![a.factory(), b.factory(), c.factory()])
        .await
        .unwrap();

    let resp = mux
        .configure_provider(&ConfigureProviderRequest::default())
        .await
        .unwrap();

    assert_eq!(journal.servers_called(Rpc::ConfigureProvider), vec!["a", "b", "c"]);
    let summaries: Vec<&str> = resp.diagnostics.iter().map(|d| d.summary.as_str()).collect();
    assert_eq!(summaries, vec!["a-warn", "c-warn-1", "c-warn-2"]);
}

#[tokio::test]
async fn configure_short_circuits_on_error_diagnostic() {
    let journal = CallJournal::new();
    let a = TestServer::builder("a")
        .journal(&journal)
        .configure_diagnostic(Diagnostic::warning("a-warn", ""))
        .build();
    let b = TestServer::builder("b")
        .journal(&journal)
        .configure_diagnostic(Diagnostic::error("b-err", "invalid credentials"))
        .build();
    let c = TestServer::builder("c").journal(&journal).build();
    let mux = MuxServer::new(vec![a.factory(), b.factory(), c.factory()])
        .await
        .unwrap();

    let resp = mux
        .configure_provider(&ConfigureProviderRequest::default())
        .await
        .unwrap();

    assert_eq!(journal.servers_called(Rpc::ConfigureProvider), vec!["a", "b"]);
    assert_eq!(c.call_count(Rpc::ConfigureProvider), 0);
    assert_eq!(
        resp.diagnostics,
        vec![
            Diagnostic::warning("a-warn", ""),
            Diagnostic::error("b-err", "invalid credentials"),
        ]
    );
}

#[tokio::test]
async fn configure_call_failure_aborts_and_names_backend() {
    let a = TestServer::builder("a").build();
    let b = TestServer::builder("b").fail_configure("broken pipe").build();
    let c = TestServer::builder("c").build();
    let mux = MuxServer::new(vec![a.factory(), b.factory(), c.factory()])
        .await
        .unwrap();

    let err = mux
        .configure_provider(&ConfigureProviderRequest::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "error calling ConfigureProvider on b: Transport error: broken pipe"
    );
    assert_eq!(a.call_count(Rpc::ConfigureProvider), 1);
    assert_eq!(c.call_count(Rpc::ConfigureProvider), 0);
}

// =============================================================================
// StopProvider
// =============================================================================

#[tokio::test]
async fn stop_accumulates_error_strings_and_calls_everyone() {
    let journal = CallJournal::new();
    let a = TestServer::builder("a")
        .journal(&journal)
        .stop_error("a: still running")
        .build();
    let b = TestServer::builder("b").journal(&journal).build();
    let c = TestServer::builder("c")
        .journal(&journal)
        .stop_error("c: lock held")
        .build();
    let mux = MuxServer::new(vec![a.factory(), b.factory(), c.factory()])
        .await
        .unwrap();

    let resp = mux.stop_provider(&StopProviderRequest::default()).await.unwrap();

    assert_eq!(journal.servers_called(Rpc::StopProvider), vec!["a", "b", "c"]);
    assert_eq!(resp.error, "a: still running\nc: lock held");
}

#[tokio::test]
async fn stop_without_errors_returns_empty_response() {
    let (one, two) = two_resource_servers();
    let mux = MuxServer::new(vec![one.factory(), two.factory()]).await.unwrap();

    let resp = mux.stop_provider(&StopProviderRequest::default()).await.unwrap();

    assert_eq!(resp, StopProviderResponse::default());
    assert_eq!(one.call_count(Rpc::StopProvider), 1);
    assert_eq!(two.call_count(Rpc::StopProvider), 1);
}

#[tokio::test]
async fn stop_call_failure_aborts_remaining_backends() {
    let a = TestServer::builder("a").stop_error("a: still running").build();
    let b = TestServer::builder("b").fail_stop("connection reset").build();
    let c = TestServer::builder("c").build();
    let mux = MuxServer::new(vec![a.factory(), b.factory(), c.factory()])
        .await
        .unwrap();

    let err = mux
        .stop_provider(&StopProviderRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BackendError::Fanout { rpc: Rpc::StopProvider, ref backend, .. } if backend == "b"
    ));
    assert_eq!(a.call_count(Rpc::StopProvider), 1);
    assert_eq!(c.call_count(Rpc::StopProvider), 0);
}
