use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "nomic-embed-text:latest");
    assert_eq!(config.ollama.batch_size, 16);
    assert_eq!(config.paths.dataset, PathBuf::from("faq.json"));
    assert_eq!(config.paths.index, PathBuf::from("data/faq_index"));
    assert_eq!(config.embedding.provider, ProviderKind::Ollama);
    assert_eq!(config.search.metric, Metric::Cosine);
    assert_eq!(config.search.default_top_k, 3);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.dimension = 4;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidEmbeddingDimension(4))
    ));

    let mut invalid_config = config.clone();
    invalid_config.search.default_top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.search.min_score = Some(f32::NAN);
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.paths.index = PathBuf::new();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::EmptyPath("index"))
    ));
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config {
        search: SearchConfig {
            metric: Metric::InnerProduct,
            default_top_k: 5,
            min_score: Some(0.25),
        },
        ..Config::default()
    };
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [paths]
        dataset = "kb/faq.json"

        [embedding]
        provider = "hashing"
        dimension = 256
        "#,
    )
    .expect("partial config should parse");

    assert_eq!(parsed.paths.dataset, PathBuf::from("kb/faq.json"));
    assert_eq!(parsed.paths.index, PathBuf::from(DEFAULT_INDEX_PATH));
    assert_eq!(parsed.embedding.provider, ProviderKind::Hashing);
    assert_eq!(parsed.embedding.dimension, 256);
    assert_eq!(parsed.ollama, OllamaConfig::default());
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig {
        model: "test-model".to_string(),
        batch_size: 32,
        ..OllamaConfig::default()
    };

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(1001).is_err());
}

#[test]
fn load_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.paths, PathsConfig::default());
}

#[test]
fn save_and_load_roundtrip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config.paths.dataset = PathBuf::from("/srv/faq/faq.json");
    config.embedding.provider = ProviderKind::Hashing;

    config.save().expect("should save config");
    let loaded = Config::load(temp_dir.path().join("nested")).expect("should load config");

    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[ollama]\nbatch_size = 0\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
#[serial]
fn env_overrides_replace_paths() {
    // SAFETY: serialised with the other environment tests
    unsafe {
        env::set_var(DATASET_PATH_ENV, "/tmp/other.json");
        env::set_var(INDEX_PATH_ENV, "/tmp/other_index");
    }

    let mut config = Config::default();
    config.apply_env_overrides();

    // SAFETY: serialised with the other environment tests
    unsafe {
        env::remove_var(DATASET_PATH_ENV);
        env::remove_var(INDEX_PATH_ENV);
    }

    assert_eq!(config.paths.dataset, PathBuf::from("/tmp/other.json"));
    assert_eq!(config.paths.index, PathBuf::from("/tmp/other_index"));
}

#[test]
#[serial]
fn blank_env_values_are_ignored() {
    // SAFETY: serialised with the other environment tests
    unsafe {
        env::set_var(DATASET_PATH_ENV, "   ");
        env::remove_var(INDEX_PATH_ENV);
    }

    let mut config = Config::default();
    config.apply_env_overrides();

    // SAFETY: serialised with the other environment tests
    unsafe {
        env::remove_var(DATASET_PATH_ENV);
    }

    assert_eq!(config.paths, PathsConfig::default());
}

#[test]
fn engine_config_carries_paths_and_metric() {
    let mut config = Config::default();
    config.search.metric = Metric::InnerProduct;

    let engine_config = config.engine_config();
    assert_eq!(engine_config.dataset_path, config.paths.dataset);
    assert_eq!(engine_config.index_path, config.paths.index);
    assert_eq!(engine_config.metric, Metric::InnerProduct);
}
