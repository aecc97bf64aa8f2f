use super::*;

#[test]
fn analysis_is_idempotent() {
    let query = "Show me all the sensors connected to the first floor";
    assert_eq!(analyze_query(query), analyze_query(query));
}

#[test]
fn generic_query_detected() {
    let analysis = analyze_query("Show me devices");

    assert!(analysis.is_generic_query);
    assert!(!analysis.is_location_query);
    assert!(!analysis.is_automation_query);
    assert!(!analysis.is_specific_query);
    assert!(analysis.matched_categories.is_empty());
}

#[test]
fn location_query_detects_floor() {
    let analysis = analyze_query("Show me all the sensors connected to the first floor");

    assert!(analysis.is_location_query);
    assert!(analysis.is_first_floor_query);
    assert!(!analysis.is_second_floor_query);
    assert_eq!(analysis.target_floor, Some(crate::chunk::FloorLocation::First));
    // sensor family matched via the literal keyword
    assert!(analysis.matched_keywords.contains(&"sensor".to_string()));
    assert!(analysis.matched_categories.contains(&18));
}

#[test]
fn second_floor_detected() {
    let analysis = analyze_query("what devices are on the second floor?");
    assert!(analysis.is_second_floor_query);
    assert_eq!(
        analysis.target_floor,
        Some(crate::chunk::FloorLocation::Second)
    );
}

#[test]
fn no_floor_means_no_constraint() {
    let analysis = analyze_query("describe the thermostat");
    assert!(!analysis.is_first_floor_query);
    assert!(!analysis.is_second_floor_query);
    assert_eq!(analysis.target_floor, None);
}

#[test]
fn multiple_device_families_union_categories() {
    let analysis = analyze_query("show me the uuids of actuator, thermostat and controller");

    assert!(analysis.matched_keywords.contains(&"actuator".to_string()));
    assert!(analysis.matched_keywords.contains(&"thermostat".to_string()));
    assert!(analysis.matched_keywords.contains(&"controller".to_string()));

    // Union of [0, 15], [0] and [11], deduplicated
    assert_eq!(analysis.matched_categories, vec![0, 15, 11]);

    // No duplicate visualization types either
    let mut types = analysis.matched_visualization_types.clone();
    types.sort();
    types.dedup();
    assert_eq!(types.len(), analysis.matched_visualization_types.len());
}

#[test]
fn key_parameter_matches_as_whole_word() {
    let analysis = analyze_query("what is the setpoint right now?");
    assert!(analysis.matched_keywords.contains(&"thermostat".to_string()));

    // Substring inside a longer word does not count
    let analysis = analyze_query("tell me about setpointing");
    assert!(!analysis.matched_keywords.contains(&"thermostat".to_string()));
}

#[test]
fn regex_pattern_matches_family() {
    let analysis = analyze_query("can I close the window covering?");
    assert!(analysis.matched_keywords.contains(&"actuator".to_string()));
    assert!(analysis.matched_categories.contains(&11));
}

#[test]
fn automation_query_detected() {
    let analysis = analyze_query("turn on the lights in the living room");
    assert!(analysis.is_automation_query);
}

#[test]
fn light_keyword_does_not_match_inside_words() {
    // "lightweight" must not trigger the lights family ((?<!\w)light(?!\w))
    let analysis = analyze_query("is this a lightweight protocol?");
    assert!(!analysis.matched_keywords.contains(&"lights".to_string()));

    let analysis = analyze_query("dim the light please");
    assert!(analysis.matched_keywords.contains(&"lights".to_string()));
}

#[test]
fn device_type_resolution() {
    assert_eq!(device_type_for_category(0), "controller");
    assert_eq!(device_type_for_category(11), "actuator");
    assert_eq!(device_type_for_category(15), "controller");
    assert_eq!(device_type_for_category(18), "sensor");
    assert_eq!(device_type_for_category(99), "other");
}

#[test]
fn intent_flags_are_independent() {
    // A query can be both specific and automation at once
    let analysis = analyze_query("set temperature to the configured setpoint value");
    assert!(analysis.is_automation_query);
    assert!(analysis.is_specific_query);
}
