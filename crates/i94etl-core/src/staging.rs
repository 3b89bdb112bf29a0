//! Staging area for bulk loads.
//!
//! Every table written to the warehouse is first serialized to Parquet and
//! placed under `<location>/<destination>/<run id>.parquet`, either in an
//! S3-compatible bucket (`s3://bucket/prefix`, `s3a://` is accepted too) or in
//! a local directory.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{DataFrame, PolarsError};
use thiserror::Error;
use uuid::Uuid;

use crate::config::ObjectStoreConfig;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("invalid staging location {0}")]
    InvalidLocation(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize parquet: {0}")]
    Parquet(#[from] PolarsError),
    #[error("object store error: {0}")]
    ObjectStore(String),
}

#[async_trait]
pub trait StagingStore: Send + Sync {
    async fn put_object(&self, key: &str, bytes: Bytes) -> Result<(), StagingError>;

    /// Human-readable location of `key`, used in logs.
    fn location_of(&self, key: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct LocalStagingStore {
    root: PathBuf,
}

impl LocalStagingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StagingStore for LocalStagingStore {
    async fn put_object(&self, key: &str, bytes: Bytes) -> Result<(), StagingError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StagingError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| StagingError::Io { path, source })
    }

    fn location_of(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}

#[derive(Clone)]
pub struct S3StagingStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3StagingStore {
    pub async fn new(
        bucket: &str,
        prefix: &str,
        config: &ObjectStoreConfig,
    ) -> Result<Self, StagingError> {
        if bucket.is_empty() {
            return Err(StagingError::InvalidLocation(
                "bucket name cannot be empty".into(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = Credentials::new(access_key, secret_key, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint_url(endpoint));
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    fn object_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }
}

#[async_trait]
impl StagingStore for S3StagingStore {
    async fn put_object(&self, key: &str, bytes: Bytes) -> Result<(), StagingError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(key))
            .body(ByteStream::from(bytes))
            .content_type("application/vnd.apache.parquet")
            .send()
            .await
            .map_err(|err| StagingError::ObjectStore(err.to_string()))?;
        Ok(())
    }

    fn location_of(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.object_key(key))
    }
}

/// Where a staging location points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingLocation {
    S3 { bucket: String, prefix: String },
    Local(PathBuf),
}

impl StagingLocation {
    pub fn parse(location: &str) -> Result<Self, StagingError> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(StagingError::InvalidLocation(location.to_string()));
        }

        let remote = trimmed
            .strip_prefix("s3://")
            .or_else(|| trimmed.strip_prefix("s3a://"));
        match remote {
            Some(rest) => {
                let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
                if bucket.is_empty() {
                    return Err(StagingError::InvalidLocation(location.to_string()));
                }
                Ok(Self::S3 {
                    bucket: bucket.to_string(),
                    prefix: prefix.trim_matches('/').to_string(),
                })
            }
            None => Ok(Self::Local(PathBuf::from(trimmed))),
        }
    }
}

pub struct StagingArea {
    store: Box<dyn StagingStore>,
    run_id: Uuid,
}

impl StagingArea {
    pub fn new(store: Box<dyn StagingStore>) -> Self {
        Self {
            store,
            run_id: Uuid::new_v4(),
        }
    }

    pub async fn from_location(
        location: &str,
        object_store: &ObjectStoreConfig,
    ) -> Result<Self, StagingError> {
        let store: Box<dyn StagingStore> = match StagingLocation::parse(location)? {
            StagingLocation::S3 { bucket, prefix } => {
                Box::new(S3StagingStore::new(&bucket, &prefix, object_store).await?)
            }
            StagingLocation::Local(root) => Box::new(LocalStagingStore::new(root)),
        };
        Ok(Self::new(store))
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stages `table` for `destination` and returns where it was placed.
    pub async fn stage(&self, destination: &str, table: &DataFrame) -> Result<String, StagingError> {
        let bytes = parquet_bytes(table)?;
        let key = format!("{}/{}.parquet", destination, self.run_id);
        self.store.put_object(&key, Bytes::from(bytes)).await?;
        Ok(self.store.location_of(&key))
    }
}

fn endpoint_url(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

pub fn parquet_bytes(df: &DataFrame) -> Result<Vec<u8>, StagingError> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Snappy)
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_and_prefix() {
        assert_eq!(
            StagingLocation::parse("s3a://warehouse-temp/redshiftAccess/").unwrap(),
            StagingLocation::S3 {
                bucket: "warehouse-temp".to_string(),
                prefix: "redshiftAccess".to_string(),
            }
        );
        assert_eq!(
            StagingLocation::parse("s3://bucket").unwrap(),
            StagingLocation::S3 {
                bucket: "bucket".to_string(),
                prefix: String::new(),
            }
        );
        assert_eq!(
            StagingLocation::parse("/tmp/staging").unwrap(),
            StagingLocation::Local(PathBuf::from("/tmp/staging"))
        );
        assert!(StagingLocation::parse("s3:///prefix").is_err());
        assert!(StagingLocation::parse("  ").is_err());
    }

    #[tokio::test]
    async fn local_staging_writes_readable_parquet() {
        use polars::df;
        use polars::prelude::{ParquetReader, SerReader};

        let dir = tempfile::tempdir().unwrap();
        let area = StagingArea::new(Box::new(LocalStagingStore::new(dir.path())));
        let table = df!("port_code" => ["ALC", "ANC"], "statecode" => ["AK", "AK"]).unwrap();

        let location = area.stage("portcodes", &table).await.unwrap();
        let expected = dir
            .path()
            .join("portcodes")
            .join(format!("{}.parquet", area.run_id()));
        assert_eq!(location, expected.display().to_string());

        let file = std::fs::File::open(&expected).unwrap();
        let staged = ParquetReader::new(file).finish().unwrap();
        assert!(staged.equals_missing(&table));
    }

    #[test]
    fn endpoints_get_a_scheme() {
        assert_eq!(endpoint_url("s3.amazonaws.com"), "https://s3.amazonaws.com");
        assert_eq!(endpoint_url("http://localhost:9000"), "http://localhost:9000");
    }
}
