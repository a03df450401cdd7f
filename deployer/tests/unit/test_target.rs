//! Target resolution tests

use std::fs;

use deploy_trigger::deploy::target::{ConfigResolver, RepositoryChannel};
use deploy_trigger::errors::DeployError;
use deploy_trigger::filesys::dir::Dir;
use secrecy::ExposeSecret;
use tempfile::TempDir;

fn environment_dir() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("prod.json"),
        r#"{"aws": {"access_key": "AKIAPROD", "secret_key": "prod-secret",
                    "bucket_name": "prod-artifacts"}}"#,
    )
    .unwrap();
    fs::write(
        tmp.path().join("staging.json"),
        r#"{"aws": {"access_key": "", "secret_key": "", "bucket_name": "staging-artifacts"}}"#,
    )
    .unwrap();
    tmp
}

#[tokio::test]
async fn test_resolve_prod() {
    let tmp = environment_dir();
    let resolver = ConfigResolver::new(Dir::new(tmp.path()), "us-east-1");

    let config = resolver.resolve("prod", "billing").await.unwrap();
    assert_eq!(config.target.application, "billing-app-prod");
    assert_eq!(config.target.group, "billing-group-prod");
    assert_eq!(config.target.prefix, "billing-folder-prod/");
    assert_eq!(config.target.bucket, "prod-artifacts");
    assert_eq!(config.channel, RepositoryChannel::Releases);

    assert_eq!(config.profile.name, "prod");
    let credentials = config.profile.credentials.unwrap();
    assert_eq!(credentials.access_key, "AKIAPROD");
    assert_eq!(credentials.secret_key.expose_secret(), "prod-secret");
}

#[tokio::test]
async fn test_resolve_non_prod_uses_staging_profile() {
    let tmp = environment_dir();
    let resolver = ConfigResolver::new(Dir::new(tmp.path()), "eu-west-1");

    for environment in ["qa", "staging", "playground"] {
        let config = resolver.resolve(environment, "shop").await.unwrap();
        assert_eq!(config.target.bucket, "staging-artifacts");
        assert_eq!(config.target.application, format!("shop-app-{}", environment));
        assert_eq!(config.channel, RepositoryChannel::Snapshots);
        assert_eq!(config.profile.name, "staging");
        assert_eq!(config.profile.region, "eu-west-1");
        assert!(config.profile.credentials.is_none());
    }
}

#[tokio::test]
async fn test_missing_settings_source() {
    let tmp = tempfile::tempdir().unwrap();
    let resolver = ConfigResolver::new(Dir::new(tmp.path()), "us-east-1");

    let err = resolver.resolve("staging", "shop").await.unwrap_err();
    assert!(matches!(err, DeployError::Configuration(_)));
}

#[tokio::test]
async fn test_empty_bucket_or_product() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("staging.json"),
        r#"{"aws": {"bucket_name": ""}}"#,
    )
    .unwrap();
    let resolver = ConfigResolver::new(Dir::new(tmp.path()), "us-east-1");

    let err = resolver.resolve("qa", "shop").await.unwrap_err();
    assert!(err.to_string().contains("bucket_name"));

    let err = resolver.resolve("qa", "  ").await.unwrap_err();
    assert_eq!(err.to_string(), "Configuration error: product not set");
}
