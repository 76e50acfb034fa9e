//! Tests against a live MinIO server on 127.0.0.1:9000
//!
//! Start one with
//! `docker run -p 9000:9000 -e MINIO_ROOT_USER=accesskey -e MINIO_ROOT_PASSWORD=secretkey minio/minio server /data`
//! and run `cargo test -p blobstore --test minio -- --ignored`.

mod common;

use blobstore::{Provider, ProviderData};

fn provider() -> blobstore::Backend {
    let mut provider = blobstore::new("s3", ProviderData::default());
    provider.configure(&common::s3_config()).unwrap();
    provider
}

#[tokio::test]
#[ignore = "requires a MinIO server on 127.0.0.1:9000"]
async fn test_minio_store_retrieve_remove() {
    let provider = provider();

    // Runs twice against the same server, so the bucket may already exist
    let written = common::put(&provider, "foo", b"some content").await;
    assert_eq!(written, 12);
    let written = common::put(&provider, "foo", b"some content").await;
    assert_eq!(written, 12);

    assert!(provider.exists("foo").await.unwrap());
    assert_eq!(
        common::get(&provider, "foo").await.unwrap(),
        b"some content"
    );

    provider.remove("foo").await.unwrap();
    assert!(!provider.exists("foo").await.unwrap());

    let mut buf = Vec::new();
    let err = provider.retrieve("foo", &mut buf).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(buf.is_empty());
}

#[tokio::test]
#[ignore = "requires a MinIO server on 127.0.0.1:9000"]
async fn test_minio_remove_never_stored() {
    let provider = provider();
    common::put(&provider, "present", b"x").await;
    provider.remove("never-stored").await.unwrap();
    provider.remove("present").await.unwrap();
}

#[tokio::test]
#[ignore = "slow: waits out the object_store client's retry budget"]
async fn test_unreachable_endpoint_is_an_error_not_absence() {
    let mut provider = blobstore::new("s3", ProviderData::default());
    let config = common::s3_config().with("endpoint", "127.0.0.1:1");
    provider.configure(&config).unwrap();

    let err = provider.exists("foo").await.unwrap_err();
    assert!(err.is_unavailable(), "{}", err);

    let mut reader: &[u8] = b"x";
    let err = provider.store("foo", &mut reader).await.unwrap_err();
    assert!(err.is_unavailable(), "{}", err);
}
