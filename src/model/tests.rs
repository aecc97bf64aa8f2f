use super::*;

#[test]
fn parse_minimal_document() {
    let json = r#"{
        "endpoints": [
            {
                "uuid": "ep-1",
                "name": "Thermostat",
                "category": 0,
                "visualizationType": "SMABIT_AV2010_32",
                "partitions": ["p-1"],
                "parameters": [
                    {
                        "name": "setpoint",
                        "dataType": 1,
                        "unit": "C",
                        "operation": {"type": "switch"},
                        "logType": 3,
                        "minVal": [5.0],
                        "maxVal": [35.0]
                    }
                ]
            }
        ],
        "areas": [
            {
                "uuid": "area-1",
                "name": "North area",
                "partitions": [{"uuid": "p-1", "name": "First floor"}, "p-2"]
            }
        ],
        "metadata": {"name": "Test House", "revision": "3", "major": 1, "minor": 2}
    }"#;

    let installation: Installation =
        serde_json::from_str(json).expect("document should deserialize");

    assert_eq!(installation.endpoints.len(), 1);
    assert_eq!(installation.areas.len(), 1);

    let endpoint = &installation.endpoints[0];
    assert_eq!(endpoint.uuid.as_deref(), Some("ep-1"));
    assert_eq!(
        endpoint.visualization_type.as_deref(),
        Some("SMABIT_AV2010_32")
    );
    assert_eq!(endpoint.parameters.len(), 1);

    let param = &endpoint.parameters[0];
    assert!(param.is_control());
    assert!(param.is_measurement());
    assert!(!param.has_enumeration());
    assert_eq!(param.min_val, vec![5.0]);

    let area = &installation.areas[0];
    assert_eq!(area.partitions.len(), 2);
    assert_eq!(area.partitions[0].uuid(), "p-1");
    assert_eq!(area.partitions[0].name(), Some("First floor"));
    assert_eq!(area.partitions[1].uuid(), "p-2");
    assert_eq!(area.partitions[1].name(), None);

    let metadata = installation.metadata.expect("metadata should be present");
    assert_eq!(metadata.name.as_deref(), Some("Test House"));
    assert_eq!(metadata.major, Some(1));
}

#[test]
fn missing_fields_default() {
    let installation: Installation =
        serde_json::from_str("{}").expect("empty object should deserialize");
    assert!(installation.endpoints.is_empty());
    assert!(installation.areas.is_empty());
    assert!(installation.metadata.is_none());
}

#[test]
fn endpoint_capability_flags() {
    let endpoint: Endpoint = serde_json::from_str(
        r#"{
            "uuid": "ep-2",
            "parameters": [
                {"name": "fw", "logType": 0},
                {"name": "temperature", "unit": "C", "logType": 3},
                {"name": "mode", "enumerationVal": ["auto", "manual"]}
            ]
        }"#,
    )
    .expect("endpoint should deserialize");

    assert!(!endpoint.has_control_params());
    assert!(endpoint.has_measurement_params());
    assert!(endpoint.has_enumeration_params());
    assert!(endpoint.has_config_params());
    assert_eq!(endpoint.parameter_units(), vec!["C".to_string()]);
}

#[test]
fn duplicate_units_deduplicated() {
    let endpoint: Endpoint = serde_json::from_str(
        r#"{
            "uuid": "ep-3",
            "parameters": [
                {"name": "voltage", "unit": "V"},
                {"name": "line_voltage", "unit": "V"},
                {"name": "power", "unit": "W"}
            ]
        }"#,
    )
    .expect("endpoint should deserialize");

    assert_eq!(
        endpoint.parameter_units(),
        vec!["V".to_string(), "W".to_string()]
    );
}

#[test]
fn category_names() {
    assert_eq!(category_name(0), "controller");
    assert_eq!(category_name(18), "sensor");
    assert_eq!(category_name(99), "Category_99");
}
