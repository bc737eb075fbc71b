use panorama_tour::config::Configuration;
use std::time::Duration;

#[test]
fn parse_kebab_case_config_with_defaults() {
    let yaml = r#"
api-base-url: "http://backend.test/"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.api_base_url, "http://backend.test/");
    assert_eq!(cfg.image_base_url(), "http://backend.test/");
    assert_eq!(cfg.request_timeout, Duration::from_secs(15));
    assert_eq!(cfg.loader_max_in_flight, 4);
    assert_eq!(cfg.max_texture_dimension, 16_384);
    assert_eq!(cfg.command_queue, 16);
    cfg.validated().unwrap();
}

#[test]
fn parse_overrides() {
    let yaml = r#"
api-base-url: "https://api.test"
image-base-url: "https://cdn.test/uploads"
request-timeout: 2s 500ms
loader-max-in-flight: 2
max-texture-dimension: 8192
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.image_base_url(), "https://cdn.test/uploads");
    assert_eq!(cfg.request_timeout, Duration::from_millis(2500));
    assert_eq!(cfg.loader_max_in_flight, 2);
    assert_eq!(cfg.max_texture_dimension, 8192);
}

#[test]
fn property_url_joins_with_single_slash() {
    let url = |base: &str, id: &str| {
        Configuration::new(base)
            .property_url(id)
            .unwrap()
            .to_string()
    };
    assert_eq!(url("http://api.test/", "42"), "http://api.test/info/42");
    assert_eq!(url("http://api.test", "abc"), "http://api.test/info/abc");
    assert_eq!(url("http://api.test/v1/", "7"), "http://api.test/v1/info/7");
}

#[test]
fn property_id_is_a_single_encoded_segment() {
    let url = Configuration::new("http://api.test/")
        .property_url("a b/../c?x")
        .unwrap();
    assert_eq!(url.as_str(), "http://api.test/info/a%20b%2F..%2Fc%3Fx");
    assert_eq!(url.path_segments().unwrap().count(), 2);
    assert!(url.query().is_none());
}

#[test]
fn missing_api_base_url_is_an_error() {
    let res: Result<Configuration, _> = serde_yaml::from_str("loader-max-in-flight: 3\n");
    assert!(res.is_err());
}

#[test]
fn validation_rejects_bad_values() {
    let mut cfg = Configuration::new("ftp://api.test");
    assert!(cfg.clone().validated().is_err());

    cfg.api_base_url = "http://api.test".into();
    cfg.loader_max_in_flight = 0;
    let err = cfg.clone().validated().unwrap_err();
    assert!(err.to_string().contains("loader-max-in-flight"));

    cfg.loader_max_in_flight = 1;
    cfg.image_base_url = Some("uploads/".into());
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("image-base-url"));
}

#[test]
fn loads_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "api-base-url: http://api.test/\nrequest-timeout: 3s\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path)
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.request_timeout, Duration::from_secs(3));
}
