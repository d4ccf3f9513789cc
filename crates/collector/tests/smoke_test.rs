//! End-to-end smoke test: load a realistic config with the built-in
//! factories, build the graph, start it against an ephemeral port, stop it.

use conflux_collector::default_registries;
use conflux_component::State;

const CONFIG: &str = r#"
[receivers.conflux]
endpoint = "127.0.0.1:0"

[processors.batch]
send_batch_size = 128
timeout = "250ms"

[processors.noop]

[exporters.noop]

[exporters."noop/secondary"]

[exporters."conflux/upstream"]
endpoint = "127.0.0.1:55999"
disabled = true

[pipelines."traces/default"]
receivers = ["conflux"]
processors = ["batch"]
exporters = ["noop", "noop/secondary", "conflux/upstream"]

[pipelines."metrics/default"]
receivers = ["conflux"]
exporters = ["noop"]
"#;

#[tokio::test]
async fn test_load_build_start_stop() {
    let registries = default_registries();

    let config = conflux_config::load_str(CONFIG, &registries).unwrap();

    // The disabled forwarder is pruned everywhere.
    assert!(!config.exporters.contains_key("conflux/upstream"));
    assert_eq!(
        config.pipelines["traces/default"].exporters,
        vec!["noop", "noop/secondary"]
    );

    let service = conflux_pipeline::build(&config, &registries).unwrap();
    assert_eq!(service.receiver_count(), 1);
    assert_eq!(service.exporter_count(), 2);
    assert_eq!(service.pipeline_count(), 2);

    service.start().await.unwrap();
    assert_eq!(service.state(), State::Running);

    service.stop().await.unwrap();
    assert_eq!(service.state(), State::Stopped);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_build() {
    let registries = default_registries();

    // A traces pipeline without processors never reaches the builder.
    let err = conflux_config::load_str(
        r#"
[receivers.conflux]
endpoint = "127.0.0.1:0"

[exporters.noop]

[pipelines."traces/default"]
receivers = ["conflux"]
exporters = ["noop"]
"#,
        &registries,
    )
    .unwrap_err();
    assert!(err.to_string().contains("at least one processor"));
}
