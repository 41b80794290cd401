//! In-memory backend implementing all five controllers.
//!
//! Serves as the demo server's storage and the integration-test fixture.
//! Everything lives under one read-write lock; request bodies are drained
//! before the lock is taken.

use crate::api::errors::S3Error;
use crate::api::xml::{
    add_etag_quotes, BucketEntry, Contents, DeleteMarker, ObjectVersion, Part, Upload, User,
    VersionEntry, VersioningState,
};
use crate::controller::{
    AuthController, BodyReader, BucketController, CompletedUpload, DeleteObjectResult,
    GetObjectResult, MultipartChunks, MultipartController, ObjectController, ObjectList,
    PutObjectResult, RequestContext, ServiceController,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use parking_lot::RwLock;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

const STORAGE_CLASS: &str = "STANDARD";
const UPLOAD_ID_LENGTH: usize = 10;
const VERSION_ID_LENGTH: usize = 32;
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Non-final parts of a multipart upload must be at least this large.
const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

fn global_user() -> User {
    User {
        id: "00000000000000000000000000000000".to_string(),
        display_name: "sandbar".to_string(),
    }
}

fn random_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// One stored version of a key. A `version_id` of `None` is the null
/// version that unversioned and suspended buckets write.
struct ObjectRecord {
    version_id: Option<String>,
    content: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
    delete_marker: bool,
}

impl ObjectRecord {
    fn version_str(&self) -> &str {
        self.version_id.as_deref().unwrap_or("null")
    }
}

struct MultipartUpload {
    initiated: DateTime<Utc>,
    parts: BTreeMap<u32, Bytes>,
}

struct BucketData {
    created_at: DateTime<Utc>,
    /// `None` means versioning was never enabled.
    versioning: Option<bool>,
    /// Versions per key, oldest first; the last record is the latest.
    objects: BTreeMap<String, Vec<ObjectRecord>>,
    /// In-progress uploads keyed by `(key, upload_id)`.
    multiparts: BTreeMap<(String, String), MultipartUpload>,
}

impl BucketData {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            versioning: None,
            objects: BTreeMap::new(),
            multiparts: BTreeMap::new(),
        }
    }

    /// Store new content for a key, honoring the versioning tri-state.
    fn put_record(&mut self, key: &str, content: Bytes) -> PutObjectResult {
        let etag = md5_hex(&content);
        let record = ObjectRecord {
            version_id: match self.versioning {
                Some(true) => Some(random_token(VERSION_ID_LENGTH)),
                _ => None,
            },
            content,
            etag: etag.clone(),
            last_modified: Utc::now(),
            delete_marker: false,
        };
        let version_id = record.version_id.clone();

        let records = self.objects.entry(key.to_string()).or_default();
        if record.version_id.is_none() {
            // The null version is replaced in place.
            records.retain(|r| r.version_id.is_some());
        }
        records.push(record);

        PutObjectResult { etag, version_id }
    }
}

/// The whole store: buckets by name behind one lock.
pub struct MemoryBackend {
    inner: RwLock<HashMap<String, BucketData>>,
    location: String,
}

impl MemoryBackend {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            location: location.into(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new("us-east-1")
    }
}

fn get_bucket<'a>(
    buckets: &'a HashMap<String, BucketData>,
    name: &str,
) -> Result<&'a BucketData, S3Error> {
    buckets
        .get(name)
        .ok_or_else(|| S3Error::NoSuchBucket(name.to_string()))
}

fn get_bucket_mut<'a>(
    buckets: &'a mut HashMap<String, BucketData>,
    name: &str,
) -> Result<&'a mut BucketData, S3Error> {
    buckets
        .get_mut(name)
        .ok_or_else(|| S3Error::NoSuchBucket(name.to_string()))
}

#[async_trait]
impl ServiceController for MemoryBackend {
    async fn list_buckets(
        &self,
        _ctx: &RequestContext,
    ) -> Result<(User, Vec<BucketEntry>), S3Error> {
        let buckets = self.inner.read();
        let mut entries: Vec<BucketEntry> = buckets
            .iter()
            .map(|(name, data)| BucketEntry {
                name: name.clone(),
                creation_date: data.created_at,
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok((global_user(), entries))
    }
}

#[async_trait]
impl BucketController for MemoryBackend {
    async fn create_bucket(&self, _ctx: &RequestContext, bucket: &str) -> Result<(), S3Error> {
        let mut buckets = self.inner.write();
        if buckets.contains_key(bucket) {
            return Err(S3Error::BucketAlreadyOwnedByYou(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BucketData::new());
        Ok(())
    }

    async fn delete_bucket(&self, _ctx: &RequestContext, bucket: &str) -> Result<(), S3Error> {
        let mut buckets = self.inner.write();
        let data = get_bucket(&buckets, bucket)?;
        if !data.objects.is_empty() {
            return Err(S3Error::BucketNotEmpty(bucket.to_string()));
        }
        buckets.remove(bucket);
        Ok(())
    }

    async fn list_objects(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: u32,
    ) -> Result<ObjectList, S3Error> {
        if !delimiter.is_empty() {
            return Err(S3Error::NotImplemented);
        }

        let buckets = self.inner.read();
        let data = get_bucket(&buckets, bucket)?;

        let mut contents = Vec::new();
        for (key, records) in &data.objects {
            if !key.starts_with(prefix) {
                continue;
            }
            if !marker.is_empty() && key.as_str() <= marker {
                continue;
            }
            let Some(latest) = records.last() else {
                continue;
            };
            if latest.delete_marker {
                continue;
            }
            if contents.len() >= max_keys as usize {
                break;
            }
            contents.push(Contents {
                key: key.clone(),
                last_modified: latest.last_modified,
                etag: latest.etag.clone(),
                size: latest.content.len() as u64,
                storage_class: STORAGE_CLASS.to_string(),
                owner: global_user(),
            });
        }

        Ok(ObjectList {
            contents,
            common_prefixes: Vec::new(),
        })
    }

    async fn list_object_versions(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        prefix: &str,
        key_marker: &str,
        version_id_marker: &str,
        delimiter: &str,
        max_keys: u32,
    ) -> Result<Vec<VersionEntry>, S3Error> {
        if !delimiter.is_empty() {
            return Err(S3Error::NotImplemented);
        }

        let buckets = self.inner.read();
        let data = get_bucket(&buckets, bucket)?;

        let mut entries = Vec::new();
        'keys: for (key, records) in &data.objects {
            if !key.starts_with(prefix) {
                continue;
            }
            if !key_marker.is_empty() && key.as_str() < key_marker {
                continue;
            }
            // Within the marker key, resume strictly after the marker
            // version.
            let mut skipping = key.as_str() == key_marker && !version_id_marker.is_empty();

            for (idx, record) in records.iter().enumerate().rev() {
                if skipping {
                    if record.version_str() == version_id_marker {
                        skipping = false;
                    }
                    continue;
                }
                if entries.len() >= max_keys as usize {
                    break 'keys;
                }
                let is_latest = idx + 1 == records.len();
                let entry = if record.delete_marker {
                    VersionEntry::DeleteMarker(DeleteMarker {
                        key: key.clone(),
                        version_id: record.version_str().to_string(),
                        is_latest,
                        last_modified: record.last_modified,
                        owner: global_user(),
                    })
                } else {
                    VersionEntry::Version(ObjectVersion {
                        key: key.clone(),
                        version_id: record.version_str().to_string(),
                        is_latest,
                        last_modified: record.last_modified,
                        etag: record.etag.clone(),
                        size: record.content.len() as u64,
                        storage_class: STORAGE_CLASS.to_string(),
                        owner: global_user(),
                    })
                };
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    async fn get_bucket_versioning(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
    ) -> Result<VersioningState, S3Error> {
        let buckets = self.inner.read();
        let data = get_bucket(&buckets, bucket)?;
        Ok(match data.versioning {
            None => VersioningState::Disabled,
            Some(true) => VersioningState::Enabled,
            Some(false) => VersioningState::Suspended,
        })
    }

    async fn set_bucket_versioning(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        state: VersioningState,
    ) -> Result<(), S3Error> {
        let mut buckets = self.inner.write();
        let data = get_bucket_mut(&mut buckets, bucket)?;
        match state {
            VersioningState::Disabled => {
                // A bucket that has ever been versioned cannot go back.
                if data.versioning.is_some() {
                    return Err(S3Error::IllegalVersioningConfiguration);
                }
            }
            VersioningState::Enabled => data.versioning = Some(true),
            VersioningState::Suspended => data.versioning = Some(false),
        }
        Ok(())
    }

    async fn bucket_location(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
    ) -> Result<String, S3Error> {
        let buckets = self.inner.read();
        get_bucket(&buckets, bucket)?;
        Ok(self.location.clone())
    }
}

#[async_trait]
impl ObjectController for MemoryBackend {
    async fn get_object(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult, S3Error> {
        let buckets = self.inner.read();
        let data = get_bucket(&buckets, bucket)?;
        let records = data
            .objects
            .get(key)
            .ok_or_else(|| S3Error::NoSuchKey(key.to_string()))?;

        let record = match version_id {
            Some(version) => records
                .iter()
                .find(|r| r.version_str() == version)
                .ok_or_else(|| S3Error::NoSuchKey(key.to_string()))?,
            None => records
                .last()
                .ok_or_else(|| S3Error::NoSuchKey(key.to_string()))?,
        };

        let content = record.content.clone();
        Ok(GetObjectResult {
            size: content.len() as u64,
            body: Box::pin(futures::stream::once(async move { Ok(content) })),
            etag: record.etag.clone(),
            last_modified: record.last_modified,
            version_id: record.version_id.clone(),
            delete_marker: record.delete_marker,
        })
    }

    async fn put_object(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        body: BodyReader,
    ) -> Result<PutObjectResult, S3Error> {
        let content = body.read_all().await?;
        let mut buckets = self.inner.write();
        let data = get_bucket_mut(&mut buckets, bucket)?;
        Ok(data.put_record(key, content))
    }

    async fn delete_object(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<DeleteObjectResult, S3Error> {
        let mut buckets = self.inner.write();
        let data = get_bucket_mut(&mut buckets, bucket)?;

        if let Some(version) = version_id {
            // Version-addressed delete removes that version outright.
            let records = data
                .objects
                .get_mut(key)
                .ok_or_else(|| S3Error::NoSuchKey(key.to_string()))?;
            let idx = records
                .iter()
                .position(|r| r.version_str() == version)
                .ok_or_else(|| S3Error::NoSuchKey(key.to_string()))?;
            let removed = records.remove(idx);
            if records.is_empty() {
                data.objects.remove(key);
            }
            return Ok(DeleteObjectResult {
                version_id: removed.version_id.clone(),
                delete_marker: removed.delete_marker,
            });
        }

        match data.versioning {
            // Versioned buckets answer an unversioned delete with a marker.
            Some(enabled) => {
                let marker = ObjectRecord {
                    version_id: enabled.then(|| random_token(VERSION_ID_LENGTH)),
                    content: Bytes::new(),
                    etag: String::new(),
                    last_modified: Utc::now(),
                    delete_marker: true,
                };
                let version_id = marker.version_id.clone();
                let records = data.objects.entry(key.to_string()).or_default();
                if marker.version_id.is_none() {
                    records.retain(|r| r.version_id.is_some());
                }
                records.push(marker);
                Ok(DeleteObjectResult {
                    version_id,
                    delete_marker: true,
                })
            }
            None => {
                data.objects.remove(key);
                Ok(DeleteObjectResult {
                    version_id: None,
                    delete_marker: false,
                })
            }
        }
    }
}

#[async_trait]
impl MultipartController for MemoryBackend {
    async fn list_multipart_uploads(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key_marker: &str,
        upload_id_marker: &str,
        max_uploads: u32,
    ) -> Result<Vec<Upload>, S3Error> {
        let buckets = self.inner.read();
        let data = get_bucket(&buckets, bucket)?;

        let mut uploads = Vec::new();
        for ((key, upload_id), upload) in &data.multiparts {
            if !key_marker.is_empty()
                && (key.as_str(), upload_id.as_str()) <= (key_marker, upload_id_marker)
            {
                continue;
            }
            if uploads.len() >= max_uploads as usize {
                break;
            }
            uploads.push(Upload {
                key: key.clone(),
                upload_id: upload_id.clone(),
                initiator: global_user(),
                owner: global_user(),
                storage_class: STORAGE_CLASS.to_string(),
                initiated: upload.initiated,
            });
        }
        Ok(uploads)
    }

    async fn init_multipart(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<String, S3Error> {
        let upload_id = random_token(UPLOAD_ID_LENGTH);
        let mut buckets = self.inner.write();
        let data = get_bucket_mut(&mut buckets, bucket)?;
        data.multiparts.insert(
            (key.to_string(), upload_id.clone()),
            MultipartUpload {
                initiated: Utc::now(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn abort_multipart(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), S3Error> {
        let mut buckets = self.inner.write();
        let data = get_bucket_mut(&mut buckets, bucket)?;
        data.multiparts
            .remove(&(key.to_string(), upload_id.to_string()))
            .ok_or_else(|| S3Error::NoSuchUpload(upload_id.to_string()))?;
        Ok(())
    }

    async fn complete_multipart(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<Part>,
    ) -> Result<CompletedUpload, S3Error> {
        let mut buckets = self.inner.write();
        let data = get_bucket_mut(&mut buckets, bucket)?;
        let upload_key = (key.to_string(), upload_id.to_string());
        let upload = data
            .multiparts
            .get(&upload_key)
            .ok_or_else(|| S3Error::NoSuchUpload(upload_id.to_string()))?;

        let mut assembled = Vec::new();
        for (idx, part) in parts.iter().enumerate() {
            let chunk = upload.parts.get(&part.part_number).ok_or_else(|| {
                S3Error::InvalidPart(format!("part {} was never uploaded", part.part_number))
            })?;
            if add_etag_quotes(&md5_hex(chunk)) != part.etag {
                return Err(S3Error::InvalidPart(format!(
                    "part {} entity tag does not match",
                    part.part_number
                )));
            }
            let is_final = idx + 1 == parts.len();
            if !is_final && (chunk.len() as u64) < MIN_PART_SIZE {
                return Err(S3Error::EntityTooSmall);
            }
            assembled.extend_from_slice(chunk);
        }

        // The upload only terminates on success; a rejected completion
        // leaves it intact.
        data.multiparts.remove(&upload_key);
        let result = data.put_record(key, Bytes::from(assembled));

        Ok(CompletedUpload {
            location: format!("/{bucket}/{key}"),
            etag: result.etag,
        })
    }

    async fn list_multipart_chunks(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number_marker: u32,
        max_parts: u32,
    ) -> Result<MultipartChunks, S3Error> {
        let buckets = self.inner.read();
        let data = get_bucket(&buckets, bucket)?;
        let upload = data
            .multiparts
            .get(&(key.to_string(), upload_id.to_string()))
            .ok_or_else(|| S3Error::NoSuchUpload(upload_id.to_string()))?;

        let parts = upload
            .parts
            .iter()
            .filter(|(number, _)| **number > part_number_marker)
            .take(max_parts as usize)
            .map(|(number, chunk)| Part {
                part_number: *number,
                etag: md5_hex(chunk),
            })
            .collect();

        Ok(MultipartChunks {
            initiator: Some(global_user()),
            owner: Some(global_user()),
            storage_class: STORAGE_CLASS.to_string(),
            parts,
        })
    }

    async fn upload_multipart_chunk(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: BodyReader,
    ) -> Result<String, S3Error> {
        let content = body.read_all().await?;
        let etag = md5_hex(&content);

        let mut buckets = self.inner.write();
        let data = get_bucket_mut(&mut buckets, bucket)?;
        let upload = data
            .multiparts
            .get_mut(&(key.to_string(), upload_id.to_string()))
            .ok_or_else(|| S3Error::NoSuchUpload(upload_id.to_string()))?;

        // Re-uploading the same part number replaces the previous data.
        upload.parts.insert(part_number, content);
        Ok(etag)
    }

    async fn delete_multipart_chunk(
        &self,
        _ctx: &RequestContext,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<(), S3Error> {
        let mut buckets = self.inner.write();
        let data = get_bucket_mut(&mut buckets, bucket)?;
        let upload = data
            .multiparts
            .get_mut(&(key.to_string(), upload_id.to_string()))
            .ok_or_else(|| S3Error::NoSuchUpload(upload_id.to_string()))?;
        upload
            .parts
            .remove(&part_number)
            .ok_or_else(|| S3Error::InvalidPart(part_number.to_string()))?;
        Ok(())
    }
}

/// Fixed access-key/secret-key table for the demo server and tests.
#[derive(Default)]
pub struct StaticAuth {
    keys: HashMap<String, String>,
}

impl StaticAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.keys.insert(access_key.into(), secret_key.into());
        self
    }
}

#[async_trait]
impl AuthController for StaticAuth {
    async fn secret_key(
        &self,
        _ctx: &RequestContext,
        access_key: &str,
        _region: Option<&str>,
    ) -> Result<Option<String>, S3Error> {
        Ok(self.keys.get(access_key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new("test-request".to_string())
    }

    #[tokio::test]
    async fn bucket_lifecycle() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();
        assert!(matches!(
            store.create_bucket(&ctx(), "b1").await.unwrap_err(),
            S3Error::BucketAlreadyOwnedByYou(_)
        ));

        let (_, buckets) = store.list_buckets(&ctx()).await.unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, "b1");

        store.delete_bucket(&ctx(), "b1").await.unwrap();
        assert!(matches!(
            store.delete_bucket(&ctx(), "b1").await.unwrap_err(),
            S3Error::NoSuchBucket(_)
        ));
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();

        let result = store
            .put_object(&ctx(), "b1", "hello", BodyReader::from_bytes("Hello"))
            .await
            .unwrap();
        assert_eq!(result.etag, "8b1a9953c4611296a827abf8c47804d7");

        let get = store.get_object(&ctx(), "b1", "hello", None).await.unwrap();
        assert_eq!(get.size, 5);
        assert_eq!(get.etag, "8b1a9953c4611296a827abf8c47804d7");
    }

    #[tokio::test]
    async fn non_empty_bucket_refuses_deletion() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();
        store
            .put_object(&ctx(), "b1", "k", BodyReader::from_bytes("x"))
            .await
            .unwrap();
        assert!(matches!(
            store.delete_bucket(&ctx(), "b1").await.unwrap_err(),
            S3Error::BucketNotEmpty(_)
        ));
    }

    #[tokio::test]
    async fn versioning_tristate() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();

        assert_eq!(
            store.get_bucket_versioning(&ctx(), "b1").await.unwrap(),
            VersioningState::Disabled
        );
        // Setting Disabled on a never-versioned bucket is a no-op.
        store
            .set_bucket_versioning(&ctx(), "b1", VersioningState::Disabled)
            .await
            .unwrap();

        store
            .set_bucket_versioning(&ctx(), "b1", VersioningState::Enabled)
            .await
            .unwrap();
        assert_eq!(
            store.get_bucket_versioning(&ctx(), "b1").await.unwrap(),
            VersioningState::Enabled
        );

        store
            .set_bucket_versioning(&ctx(), "b1", VersioningState::Suspended)
            .await
            .unwrap();
        assert_eq!(
            store.get_bucket_versioning(&ctx(), "b1").await.unwrap(),
            VersioningState::Suspended
        );

        // Once versioned, never disabled again.
        assert!(matches!(
            store
                .set_bucket_versioning(&ctx(), "b1", VersioningState::Disabled)
                .await
                .unwrap_err(),
            S3Error::IllegalVersioningConfiguration
        ));
    }

    #[tokio::test]
    async fn versioned_puts_accumulate_and_delete_leaves_marker() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();
        store
            .set_bucket_versioning(&ctx(), "b1", VersioningState::Enabled)
            .await
            .unwrap();

        let put1 = store
            .put_object(&ctx(), "b1", "k", BodyReader::from_bytes("one"))
            .await
            .unwrap();
        let put2 = store
            .put_object(&ctx(), "b1", "k", BodyReader::from_bytes("two"))
            .await
            .unwrap();
        assert!(put1.version_id.is_some());
        assert_ne!(put1.version_id, put2.version_id);

        let delete = store.delete_object(&ctx(), "b1", "k", None).await.unwrap();
        assert!(delete.delete_marker);

        // Plain GET now sees the marker; version-addressed GET still works.
        let get = store.get_object(&ctx(), "b1", "k", None).await.unwrap();
        assert!(get.delete_marker);
        let get = store
            .get_object(&ctx(), "b1", "k", put1.version_id.as_deref())
            .await
            .unwrap();
        assert_eq!(get.size, 3);

        let entries = store
            .list_object_versions(&ctx(), "b1", "", "", "", "", 100)
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[0], VersionEntry::DeleteMarker(_)));
    }

    #[tokio::test]
    async fn multipart_roundtrip() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();

        let upload_id = store.init_multipart(&ctx(), "b1", "big").await.unwrap();
        assert_eq!(upload_id.len(), UPLOAD_ID_LENGTH);

        let part1 = vec![b'a'; MIN_PART_SIZE as usize];
        let etag1 = store
            .upload_multipart_chunk(
                &ctx(),
                "b1",
                "big",
                &upload_id,
                1,
                BodyReader::from_bytes(part1.clone()),
            )
            .await
            .unwrap();
        let etag2 = store
            .upload_multipart_chunk(
                &ctx(),
                "b1",
                "big",
                &upload_id,
                2,
                BodyReader::from_bytes("end"),
            )
            .await
            .unwrap();

        let completed = store
            .complete_multipart(
                &ctx(),
                "b1",
                "big",
                &upload_id,
                vec![
                    Part {
                        part_number: 1,
                        etag: add_etag_quotes(&etag1),
                    },
                    Part {
                        part_number: 2,
                        etag: add_etag_quotes(&etag2),
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(completed.location, "/b1/big");

        let get = store.get_object(&ctx(), "b1", "big", None).await.unwrap();
        assert_eq!(get.size, MIN_PART_SIZE + 3);

        // The upload is gone once completed.
        assert!(matches!(
            store
                .abort_multipart(&ctx(), "b1", "big", &upload_id)
                .await
                .unwrap_err(),
            S3Error::NoSuchUpload(_)
        ));
    }

    #[tokio::test]
    async fn small_non_final_part_is_rejected_and_upload_survives() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();
        let upload_id = store.init_multipart(&ctx(), "b1", "big").await.unwrap();

        let etag1 = store
            .upload_multipart_chunk(
                &ctx(),
                "b1",
                "big",
                &upload_id,
                1,
                BodyReader::from_bytes(vec![b'a'; 1024]),
            )
            .await
            .unwrap();
        let etag2 = store
            .upload_multipart_chunk(
                &ctx(),
                "b1",
                "big",
                &upload_id,
                2,
                BodyReader::from_bytes("end"),
            )
            .await
            .unwrap();

        let err = store
            .complete_multipart(
                &ctx(),
                "b1",
                "big",
                &upload_id,
                vec![
                    Part {
                        part_number: 1,
                        etag: add_etag_quotes(&etag1),
                    },
                    Part {
                        part_number: 2,
                        etag: add_etag_quotes(&etag2),
                    },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::EntityTooSmall));

        // Rejected completions leave the upload intact.
        store
            .abort_multipart(&ctx(), "b1", "big", &upload_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn mismatched_etag_is_invalid_part() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();
        let upload_id = store.init_multipart(&ctx(), "b1", "k").await.unwrap();
        store
            .upload_multipart_chunk(
                &ctx(),
                "b1",
                "k",
                &upload_id,
                1,
                BodyReader::from_bytes("data"),
            )
            .await
            .unwrap();

        let err = store
            .complete_multipart(
                &ctx(),
                "b1",
                "k",
                &upload_id,
                vec![Part {
                    part_number: 1,
                    etag: "\"0123456789abcdef0123456789abcdef\"".to_string(),
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::InvalidPart(_)));

        let err = store
            .complete_multipart(
                &ctx(),
                "b1",
                "k",
                &upload_id,
                vec![Part {
                    part_number: 7,
                    etag: "\"0123456789abcdef0123456789abcdef\"".to_string(),
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::InvalidPart(_)));
    }

    #[tokio::test]
    async fn part_listing_marker_is_exclusive() {
        let store = MemoryBackend::default();
        store.create_bucket(&ctx(), "b1").await.unwrap();
        let upload_id = store.init_multipart(&ctx(), "b1", "k").await.unwrap();
        for n in 1..=5 {
            store
                .upload_multipart_chunk(
                    &ctx(),
                    "b1",
                    "k",
                    &upload_id,
                    n,
                    BodyReader::from_bytes(vec![n as u8]),
                )
                .await
                .unwrap();
        }

        let chunks = store
            .list_multipart_chunks(&ctx(), "b1", "k", &upload_id, 2, 100)
            .await
            .unwrap();
        let numbers: Vec<u32> = chunks.parts.iter().map(|p| p.part_number).collect();
        assert_eq!(numbers, vec![3, 4, 5]);
    }
}
