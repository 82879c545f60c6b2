//! S3-compatible object storage backend (`s3://`)
//!
//! Wraps aws-sdk-s3. The URL addresses `s3://host[:port]/bucket[/prefix]`;
//! the bucket is the container and object keys below the prefix, up to the
//! next `/`, are its entries.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bt_core::{Backend, Error, FileEntry, Result, UNKNOWN_SIZE};
use bytes::Bytes;
use jiff::Timestamp;
use tokio::io::AsyncWriteExt;

use crate::registry::BackendConfig;

/// Region option
pub const S3_REGION: &str = "s3-region";
/// Bucket lookup style option: auto, path or dns
pub const S3_BUCKET_LOOKUP: &str = "s3-bucket-lookup";
/// Use https for the endpoint
pub const USE_SSL: &str = "use-ssl";

const DEFAULT_REGION: &str = "us-east-1";

/// Where the backend points, parsed from its URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub endpoint: String,
    pub bucket: String,
    /// Key prefix, empty or ending with `/`
    pub prefix: String,
}

impl S3Location {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let url = &config.url;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidUrl(format!("{}: missing host", config.redacted_url())))?;

        let scheme = if config.options.flag(USE_SSL) {
            "https"
        } else {
            "http"
        };
        let endpoint = match url.port() {
            Some(port) => format!("{scheme}://{host}:{port}"),
            None => format!("{scheme}://{host}"),
        };

        let path = url.path().trim_matches('/');
        let (bucket, prefix) = path.split_once('/').unwrap_or((path, ""));
        if bucket.is_empty() {
            return Err(Error::InvalidUrl(format!(
                "{}: missing bucket name",
                config.redacted_url()
            )));
        }

        let prefix = prefix.trim_matches('/');
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };

        Ok(Self {
            endpoint,
            bucket: bucket.to_string(),
            prefix,
        })
    }

    /// Entry name for a listed key, `None` for the prefix itself
    pub fn relative_name<'k>(&self, key: &'k str) -> Option<&'k str> {
        let name = key
            .strip_prefix(&self.prefix)
            .unwrap_or(key)
            .trim_end_matches('/');
        (!name.is_empty()).then_some(name)
    }
}

/// S3 backend handle
pub struct S3Backend {
    inner: aws_sdk_s3::Client,
    location: S3Location,
    region: String,
    display: String,
}

impl S3Backend {
    /// Build a client for the location in `config`
    pub async fn connect(config: &BackendConfig) -> Result<Self> {
        let location = S3Location::from_config(config)?;
        let region = config
            .options
            .value(S3_REGION)
            .unwrap_or(DEFAULT_REGION)
            .to_string();
        let bucket_lookup = config.options.value(S3_BUCKET_LOOKUP).unwrap_or("auto");
        if !matches!(bucket_lookup, "auto" | "path" | "dns") {
            return Err(Error::User(
                "Bucket lookup must be 'auto', 'path', or 'dns'".to_string(),
            ));
        }

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .endpoint_url(&location.endpoint);

        // Without explicit credentials the SDK's default chain applies.
        if let (Some(access_key), Some(secret_key)) = (config.username(), config.password()) {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "bt-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }
        let sdk_config = loader.load().await;

        // Path-style addressing for compatibility with S3-compatible servers
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(bucket_lookup != "dns")
            .build();

        let display = format!(
            "s3://{}/{}/{}",
            location.endpoint.split("://").nth(1).unwrap_or(&location.endpoint),
            location.bucket,
            location.prefix
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            location,
            region,
            display,
        })
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.location.prefix)
    }

    fn bucket_missing_or(&self, error: Error) -> Error {
        if error.is_not_found() {
            Error::FolderMissing(format!("bucket {}", self.location.bucket))
        } else {
            error
        }
    }
}

/// Convert an SDK error, keeping status and response body of service errors
fn map_sdk_error<E: std::fmt::Display>(
    error: &aws_sdk_s3::error::SdkError<E>,
    what: &str,
) -> Error {
    use aws_sdk_s3::error::SdkError;

    match error {
        SdkError::ServiceError(service_err) => {
            let raw = service_err.raw();
            let mut detail = format!("Service error: {}", service_err.err());
            if let Some(code) = raw.headers().get("x-amz-error-code") {
                detail.push_str(&format!(" (code: {code})"));
            }
            let body = raw
                .body()
                .bytes()
                .map(|b| String::from_utf8_lossy(b).into_owned());
            status_error(raw.status().as_u16(), what, detail, body)
        }
        SdkError::ConstructionFailure(err) => {
            Error::Internal(format!("Request construction failed: {err:?}"))
        }
        SdkError::TimeoutError(_) => Error::Network("Request timeout".to_string()),
        SdkError::DispatchFailure(err) => Error::Network(format!("Network dispatch error: {err:?}")),
        SdkError::ResponseError(err) => Error::Network(format!("Response error: {err:?}")),
        _ => Error::Network(error.to_string()),
    }
}

/// Error for a service response; the body is kept whatever the status
fn status_error(status: u16, what: &str, detail: String, body: Option<String>) -> Error {
    let message = match status {
        401 | 403 => format!("Access denied to {what}: {detail}"),
        404 => format!("Not found: {what}: {detail}"),
        _ => detail,
    };
    Error::Response {
        message,
        status: Some(status),
        body,
    }
}

#[async_trait]
impl Backend for S3Backend {
    fn protocol(&self) -> &str {
        "s3"
    }

    fn display_name(&self) -> String {
        self.display.clone()
    }

    async fn list(&self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .inner
                .list_objects_v2()
                .bucket(&self.location.bucket)
                .delimiter("/");
            if !self.location.prefix.is_empty() {
                request = request.prefix(&self.location.prefix);
            }
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| {
                self.bucket_missing_or(map_sdk_error(&e, &self.location.bucket))
            })?;

            for prefix in response.common_prefixes() {
                if let Some(name) = prefix.prefix().and_then(|p| self.location.relative_name(p)) {
                    entries.push(FileEntry::folder(name));
                }
            }

            for object in response.contents() {
                let Some(name) = object.key().and_then(|k| self.location.relative_name(k)) else {
                    continue;
                };
                let mut entry = FileEntry::file(name, object.size().unwrap_or(UNKNOWN_SIZE));
                if let Some(modified) = object
                    .last_modified()
                    .and_then(|m| Timestamp::from_second(m.secs()).ok())
                {
                    entry = entry.with_modified(modified);
                }
                entries.push(entry);
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(entries)
    }

    async fn test(&self) -> Result<()> {
        self.inner
            .head_bucket()
            .bucket(&self.location.bucket)
            .send()
            .await
            .map_err(|e| self.bucket_missing_or(map_sdk_error(&e, &self.location.bucket)))?;
        Ok(())
    }

    async fn create_folder(&self) -> Result<()> {
        use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};

        let mut request = self.inner.create_bucket().bucket(&self.location.bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, &self.location.bucket))?;
        Ok(())
    }

    async fn get(&self, name: &str, local: &Path) -> Result<()> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.location.bucket)
            .key(self.key(name))
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, name))?;

        let mut body = response.body;
        let mut file = tokio::fs::File::create(local).await?;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn put(&self, name: &str, local: &Path) -> Result<()> {
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        self.inner
            .put_object()
            .bucket(&self.location.bucket)
            .key(self.key(name))
            .content_type(content_type(name))
            .body(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, name))?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&self.location.bucket)
            .key(self.key(name))
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, name))?;
        Ok(())
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn get_bytes(&self, name: &str) -> Result<Bytes> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.location.bucket)
            .key(self.key(name))
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, name))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes();
        Ok(data)
    }

    async fn put_bytes(&self, name: &str, data: Bytes) -> Result<()> {
        self.inner
            .put_object()
            .bucket(&self.location.bucket)
            .key(self.key(name))
            .content_type(content_type(name))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error(&e, name))?;
        Ok(())
    }
}

fn content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_core::BackendOptions;

    fn location(url: &str, args: &[&str]) -> Result<S3Location> {
        let (options, _) = BackendOptions::parse(args);
        S3Location::from_config(&BackendConfig::parse(url, options)?)
    }

    #[test]
    fn test_location_with_prefix() {
        let loc = location("s3://key:secret@localhost:9000/backups/host1/daily/", &[]).unwrap();
        assert_eq!(loc.endpoint, "http://localhost:9000");
        assert_eq!(loc.bucket, "backups");
        assert_eq!(loc.prefix, "host1/daily/");
    }

    #[test]
    fn test_location_bucket_only_with_ssl() {
        let loc = location("s3://s3.example.com/backups", &["--use-ssl"]).unwrap();
        assert_eq!(loc.endpoint, "https://s3.example.com");
        assert_eq!(loc.bucket, "backups");
        assert_eq!(loc.prefix, "");
    }

    #[test]
    fn test_location_requires_bucket() {
        let err = location("s3://s3.example.com/", &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_relative_name_strips_prefix() {
        let loc = location("s3://localhost:9000/backups/host1/", &[]).unwrap();
        assert_eq!(loc.relative_name("host1/a.dblock"), Some("a.dblock"));
        assert_eq!(loc.relative_name("host1/daily/"), Some("daily"));
        assert_eq!(loc.relative_name("host1/"), None);

        let root = location("s3://localhost:9000/backups", &[]).unwrap();
        assert_eq!(root.relative_name("a.dblock"), Some("a.dblock"));
        assert_eq!(root.relative_name("daily/"), Some("daily"));
    }

    #[test]
    fn test_denied_response_keeps_body() {
        let body = "<Error><Code>AccessDenied</Code></Error>";
        let err = status_error(
            403,
            "a.dblock",
            "Service error: AccessDenied".into(),
            Some(body.into()),
        );
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.response_body(), Some(body));
        assert!(err.to_string().starts_with("Access denied to a.dblock"));
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_missing_response_is_not_found() {
        let err = status_error(
            404,
            "backups",
            "Service error: NoSuchBucket".into(),
            Some("<Error><Code>NoSuchBucket</Code></Error>".into()),
        );
        assert!(err.is_not_found());
        assert!(err.response_body().unwrap().contains("NoSuchBucket"));

        let err = status_error(503, "a", "Service error: SlowDown".into(), None);
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Service error: SlowDown");
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type("notes.txt"), "text/plain");
        assert_eq!(content_type("backup-20240101.dblock"), "application/octet-stream");
    }
}
