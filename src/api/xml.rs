//! S3 XML request parsing and response builders
//!
//! Request bodies are deserialized with `quick_xml`'s serde support; response
//! documents are built with plain string writers so the element order and
//! shapes match what S3 clients expect byte-for-byte.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// XML declaration written ahead of every response document. The trailing
/// newline is part of the multipart-completion keepalive contract: it is the
/// first whitespace byte a streaming response emits.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Namespace stamped on response root elements.
pub const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Escape special XML characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Remove surrounding double quotes from an ETag, if present.
pub fn strip_etag_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Ensure an ETag carries surrounding double quotes. ETags are always quoted
/// on the wire; backends deal in the bare hex digest.
pub fn add_etag_quotes(s: &str) -> String {
    if s.starts_with('"') {
        s.to_string()
    } else {
        format!("\"{s}\"")
    }
}

/// Timestamp format used inside XML documents.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// An owner or initiator identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub display_name: String,
}

impl User {
    fn write(&self, xml: &mut String, tag: &str) {
        xml.push_str(&format!(
            "  <{tag}><ID>{}</ID><DisplayName>{}</DisplayName></{tag}>\n",
            escape_xml(&self.id),
            escape_xml(&self.display_name),
        ));
    }
}

// ============================================================================
// ListBuckets
// ============================================================================

/// A bucket entry in the service-level listing.
#[derive(Debug, Clone)]
pub struct BucketEntry {
    pub name: String,
    pub creation_date: DateTime<Utc>,
}

/// `GET /` response.
#[derive(Debug, Clone)]
pub struct ListAllMyBucketsResult {
    pub owner: User,
    pub buckets: Vec<BucketEntry>,
}

impl ListAllMyBucketsResult {
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECLARATION);
        xml.push_str(&format!("<ListAllMyBucketsResult xmlns=\"{S3_XMLNS}\">\n"));
        self.owner.write(&mut xml, "Owner");
        xml.push_str("  <Buckets>\n");
        for bucket in &self.buckets {
            xml.push_str("    <Bucket>\n");
            xml.push_str(&format!(
                "      <Name>{}</Name>\n",
                escape_xml(&bucket.name)
            ));
            xml.push_str(&format!(
                "      <CreationDate>{}</CreationDate>\n",
                format_timestamp(&bucket.creation_date)
            ));
            xml.push_str("    </Bucket>\n");
        }
        xml.push_str("  </Buckets>\n");
        xml.push_str("</ListAllMyBucketsResult>");
        xml
    }
}

// ============================================================================
// ListObjects / ListVersions
// ============================================================================

/// An object entry in a bucket listing.
#[derive(Debug, Clone)]
pub struct Contents {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    /// Bare hex digest; quoted at render time.
    pub etag: String,
    pub size: u64,
    pub storage_class: String,
    pub owner: User,
}

/// `GET /{bucket}` response.
#[derive(Debug, Clone)]
pub struct ListBucketResult {
    pub name: String,
    pub prefix: String,
    pub marker: String,
    pub delimiter: String,
    pub max_keys: u32,
    pub is_truncated: bool,
    pub next_marker: String,
    pub contents: Vec<Contents>,
    pub common_prefixes: Vec<String>,
}

impl ListBucketResult {
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECLARATION);
        xml.push_str(&format!("<ListBucketResult xmlns=\"{S3_XMLNS}\">\n"));
        xml.push_str(&format!("  <Name>{}</Name>\n", escape_xml(&self.name)));
        xml.push_str(&format!(
            "  <Prefix>{}</Prefix>\n",
            escape_xml(&self.prefix)
        ));
        xml.push_str(&format!(
            "  <Marker>{}</Marker>\n",
            escape_xml(&self.marker)
        ));
        if !self.delimiter.is_empty() {
            xml.push_str(&format!(
                "  <Delimiter>{}</Delimiter>\n",
                escape_xml(&self.delimiter)
            ));
        }
        xml.push_str(&format!("  <MaxKeys>{}</MaxKeys>\n", self.max_keys));
        xml.push_str(&format!(
            "  <IsTruncated>{}</IsTruncated>\n",
            self.is_truncated
        ));
        if self.is_truncated && !self.next_marker.is_empty() {
            xml.push_str(&format!(
                "  <NextMarker>{}</NextMarker>\n",
                escape_xml(&self.next_marker)
            ));
        }
        for obj in &self.contents {
            xml.push_str("  <Contents>\n");
            xml.push_str(&format!("    <Key>{}</Key>\n", escape_xml(&obj.key)));
            xml.push_str(&format!(
                "    <LastModified>{}</LastModified>\n",
                format_timestamp(&obj.last_modified)
            ));
            xml.push_str(&format!(
                "    <ETag>{}</ETag>\n",
                escape_xml(&add_etag_quotes(&obj.etag))
            ));
            xml.push_str(&format!("    <Size>{}</Size>\n", obj.size));
            xml.push_str(&format!(
                "    <StorageClass>{}</StorageClass>\n",
                escape_xml(&obj.storage_class)
            ));
            xml.push_str(&format!(
                "    <Owner><ID>{}</ID><DisplayName>{}</DisplayName></Owner>\n",
                escape_xml(&obj.owner.id),
                escape_xml(&obj.owner.display_name),
            ));
            xml.push_str("  </Contents>\n");
        }
        for cp in &self.common_prefixes {
            xml.push_str(&format!(
                "  <CommonPrefixes><Prefix>{}</Prefix></CommonPrefixes>\n",
                escape_xml(cp)
            ));
        }
        xml.push_str("</ListBucketResult>");
        xml
    }
}

/// A single entry in a versioned listing: either a stored object version or
/// a delete marker.
#[derive(Debug, Clone)]
pub enum VersionEntry {
    Version(ObjectVersion),
    DeleteMarker(DeleteMarker),
}

impl VersionEntry {
    pub fn key(&self) -> &str {
        match self {
            VersionEntry::Version(v) => &v.key,
            VersionEntry::DeleteMarker(m) => &m.key,
        }
    }

    pub fn version_id(&self) -> &str {
        match self {
            VersionEntry::Version(v) => &v.version_id,
            VersionEntry::DeleteMarker(m) => &m.version_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub size: u64,
    pub storage_class: String,
    pub owner: User,
}

#[derive(Debug, Clone)]
pub struct DeleteMarker {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
    pub last_modified: DateTime<Utc>,
    pub owner: User,
}

/// `GET /{bucket}?versions` response.
#[derive(Debug, Clone)]
pub struct ListVersionsResult {
    pub name: String,
    pub prefix: String,
    pub key_marker: String,
    pub version_id_marker: String,
    pub max_keys: u32,
    pub is_truncated: bool,
    pub next_key_marker: String,
    pub next_version_id_marker: String,
    pub entries: Vec<VersionEntry>,
}

impl ListVersionsResult {
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECLARATION);
        xml.push_str(&format!("<ListVersionsResult xmlns=\"{S3_XMLNS}\">\n"));
        xml.push_str(&format!("  <Name>{}</Name>\n", escape_xml(&self.name)));
        xml.push_str(&format!(
            "  <Prefix>{}</Prefix>\n",
            escape_xml(&self.prefix)
        ));
        xml.push_str(&format!(
            "  <KeyMarker>{}</KeyMarker>\n",
            escape_xml(&self.key_marker)
        ));
        xml.push_str(&format!(
            "  <VersionIdMarker>{}</VersionIdMarker>\n",
            escape_xml(&self.version_id_marker)
        ));
        if self.is_truncated {
            xml.push_str(&format!(
                "  <NextKeyMarker>{}</NextKeyMarker>\n",
                escape_xml(&self.next_key_marker)
            ));
            xml.push_str(&format!(
                "  <NextVersionIdMarker>{}</NextVersionIdMarker>\n",
                escape_xml(&self.next_version_id_marker)
            ));
        }
        xml.push_str(&format!("  <MaxKeys>{}</MaxKeys>\n", self.max_keys));
        xml.push_str(&format!(
            "  <IsTruncated>{}</IsTruncated>\n",
            self.is_truncated
        ));
        for entry in &self.entries {
            match entry {
                VersionEntry::Version(v) => {
                    xml.push_str("  <Version>\n");
                    xml.push_str(&format!("    <Key>{}</Key>\n", escape_xml(&v.key)));
                    xml.push_str(&format!(
                        "    <VersionId>{}</VersionId>\n",
                        escape_xml(&v.version_id)
                    ));
                    xml.push_str(&format!("    <IsLatest>{}</IsLatest>\n", v.is_latest));
                    xml.push_str(&format!(
                        "    <LastModified>{}</LastModified>\n",
                        format_timestamp(&v.last_modified)
                    ));
                    xml.push_str(&format!(
                        "    <ETag>{}</ETag>\n",
                        escape_xml(&add_etag_quotes(&v.etag))
                    ));
                    xml.push_str(&format!("    <Size>{}</Size>\n", v.size));
                    xml.push_str(&format!(
                        "    <StorageClass>{}</StorageClass>\n",
                        escape_xml(&v.storage_class)
                    ));
                    xml.push_str(&format!(
                        "    <Owner><ID>{}</ID><DisplayName>{}</DisplayName></Owner>\n",
                        escape_xml(&v.owner.id),
                        escape_xml(&v.owner.display_name),
                    ));
                    xml.push_str("  </Version>\n");
                }
                VersionEntry::DeleteMarker(m) => {
                    xml.push_str("  <DeleteMarker>\n");
                    xml.push_str(&format!("    <Key>{}</Key>\n", escape_xml(&m.key)));
                    xml.push_str(&format!(
                        "    <VersionId>{}</VersionId>\n",
                        escape_xml(&m.version_id)
                    ));
                    xml.push_str(&format!("    <IsLatest>{}</IsLatest>\n", m.is_latest));
                    xml.push_str(&format!(
                        "    <LastModified>{}</LastModified>\n",
                        format_timestamp(&m.last_modified)
                    ));
                    xml.push_str(&format!(
                        "    <Owner><ID>{}</ID><DisplayName>{}</DisplayName></Owner>\n",
                        escape_xml(&m.owner.id),
                        escape_xml(&m.owner.display_name),
                    ));
                    xml.push_str("  </DeleteMarker>\n");
                }
            }
        }
        xml.push_str("</ListVersionsResult>");
        xml
    }
}

// ============================================================================
// Bucket location & versioning
// ============================================================================

/// `GET /{bucket}?location` response.
pub fn location_constraint_xml(location: &str) -> String {
    format!(
        "{XML_DECLARATION}<LocationConstraint xmlns=\"{S3_XMLNS}\">{}</LocationConstraint>",
        escape_xml(location)
    )
}

/// The tri-state a bucket's versioning attribute can take: never enabled,
/// currently enabled, or previously enabled and now suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningState {
    Disabled,
    Enabled,
    Suspended,
}

impl VersioningState {
    /// Wire string: `Disabled` has no `<Status>` element at all.
    pub fn as_str(&self) -> &'static str {
        match self {
            VersioningState::Disabled => "",
            VersioningState::Enabled => "Enabled",
            VersioningState::Suspended => "Suspended",
        }
    }

    pub fn to_xml(&self) -> String {
        match self {
            VersioningState::Disabled => {
                format!("{XML_DECLARATION}<VersioningConfiguration xmlns=\"{S3_XMLNS}\"/>")
            }
            _ => format!(
                "{XML_DECLARATION}<VersioningConfiguration xmlns=\"{S3_XMLNS}\"><Status>{}</Status></VersioningConfiguration>",
                self.as_str()
            ),
        }
    }
}

/// `PUT /{bucket}?versioning` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct VersioningConfiguration {
    #[serde(rename = "Status")]
    pub status: Option<String>,
}

impl VersioningConfiguration {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }

    /// The state the client asked for. Anything other than the two settable
    /// states is an illegal configuration.
    pub fn state(&self) -> Option<VersioningState> {
        match self.status.as_deref() {
            Some("Enabled") => Some(VersioningState::Enabled),
            Some("Suspended") => Some(VersioningState::Suspended),
            _ => None,
        }
    }
}

// ============================================================================
// Multipart
// ============================================================================

/// One part reference, as named in a `CompleteMultipartUpload` body and as
/// rendered in `ListParts` responses.
#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// Quoted on the wire; normalized by the framework before it reaches a
    /// backend.
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// `POST /{bucket}/{key}?uploadId=...` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteMultipartUpload {
    #[serde(rename = "Part", default)]
    pub parts: Vec<Part>,
}

impl CompleteMultipartUpload {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }
}

/// `POST /{bucket}/{key}?uploads` response.
#[derive(Debug, Clone)]
pub struct InitiateMultipartUploadResult {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

impl InitiateMultipartUploadResult {
    pub fn to_xml(&self) -> String {
        format!(
            "{XML_DECLARATION}<InitiateMultipartUploadResult xmlns=\"{S3_XMLNS}\"><Bucket>{}</Bucket><Key>{}</Key><UploadId>{}</UploadId></InitiateMultipartUploadResult>",
            escape_xml(&self.bucket),
            escape_xml(&self.key),
            escape_xml(&self.upload_id),
        )
    }
}

/// An in-progress upload in a `ListMultipartUploads` response.
#[derive(Debug, Clone)]
pub struct Upload {
    pub key: String,
    pub upload_id: String,
    pub initiator: User,
    pub owner: User,
    pub storage_class: String,
    pub initiated: DateTime<Utc>,
}

/// `GET /{bucket}?uploads` response.
#[derive(Debug, Clone)]
pub struct ListMultipartUploadsResult {
    pub bucket: String,
    pub key_marker: String,
    pub upload_id_marker: String,
    pub next_key_marker: String,
    pub next_upload_id_marker: String,
    pub max_uploads: u32,
    pub is_truncated: bool,
    pub uploads: Vec<Upload>,
}

impl ListMultipartUploadsResult {
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECLARATION);
        xml.push_str(&format!(
            "<ListMultipartUploadsResult xmlns=\"{S3_XMLNS}\">\n"
        ));
        xml.push_str(&format!(
            "  <Bucket>{}</Bucket>\n",
            escape_xml(&self.bucket)
        ));
        xml.push_str(&format!(
            "  <KeyMarker>{}</KeyMarker>\n",
            escape_xml(&self.key_marker)
        ));
        xml.push_str(&format!(
            "  <UploadIdMarker>{}</UploadIdMarker>\n",
            escape_xml(&self.upload_id_marker)
        ));
        if self.is_truncated {
            xml.push_str(&format!(
                "  <NextKeyMarker>{}</NextKeyMarker>\n",
                escape_xml(&self.next_key_marker)
            ));
            xml.push_str(&format!(
                "  <NextUploadIdMarker>{}</NextUploadIdMarker>\n",
                escape_xml(&self.next_upload_id_marker)
            ));
        }
        xml.push_str(&format!(
            "  <MaxUploads>{}</MaxUploads>\n",
            self.max_uploads
        ));
        xml.push_str(&format!(
            "  <IsTruncated>{}</IsTruncated>\n",
            self.is_truncated
        ));
        for upload in &self.uploads {
            xml.push_str("  <Upload>\n");
            xml.push_str(&format!("    <Key>{}</Key>\n", escape_xml(&upload.key)));
            xml.push_str(&format!(
                "    <UploadId>{}</UploadId>\n",
                escape_xml(&upload.upload_id)
            ));
            xml.push_str(&format!(
                "    <Initiator><ID>{}</ID><DisplayName>{}</DisplayName></Initiator>\n",
                escape_xml(&upload.initiator.id),
                escape_xml(&upload.initiator.display_name),
            ));
            xml.push_str(&format!(
                "    <Owner><ID>{}</ID><DisplayName>{}</DisplayName></Owner>\n",
                escape_xml(&upload.owner.id),
                escape_xml(&upload.owner.display_name),
            ));
            xml.push_str(&format!(
                "    <StorageClass>{}</StorageClass>\n",
                escape_xml(&upload.storage_class)
            ));
            xml.push_str(&format!(
                "    <Initiated>{}</Initiated>\n",
                format_timestamp(&upload.initiated)
            ));
            xml.push_str("  </Upload>\n");
        }
        xml.push_str("</ListMultipartUploadsResult>");
        xml
    }
}

/// `GET /{bucket}/{key}?uploadId=...` response.
#[derive(Debug, Clone)]
pub struct ListPartsResult {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub initiator: Option<User>,
    pub owner: Option<User>,
    pub storage_class: String,
    pub part_number_marker: u32,
    pub next_part_number_marker: u32,
    pub max_parts: u32,
    pub is_truncated: bool,
    pub parts: Vec<Part>,
}

impl ListPartsResult {
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(XML_DECLARATION);
        xml.push_str(&format!("<ListPartsResult xmlns=\"{S3_XMLNS}\">\n"));
        xml.push_str(&format!(
            "  <Bucket>{}</Bucket>\n",
            escape_xml(&self.bucket)
        ));
        xml.push_str(&format!("  <Key>{}</Key>\n", escape_xml(&self.key)));
        xml.push_str(&format!(
            "  <UploadId>{}</UploadId>\n",
            escape_xml(&self.upload_id)
        ));
        if let Some(ref initiator) = self.initiator {
            initiator.write(&mut xml, "Initiator");
        }
        if let Some(ref owner) = self.owner {
            owner.write(&mut xml, "Owner");
        }
        if !self.storage_class.is_empty() {
            xml.push_str(&format!(
                "  <StorageClass>{}</StorageClass>\n",
                escape_xml(&self.storage_class)
            ));
        }
        xml.push_str(&format!(
            "  <PartNumberMarker>{}</PartNumberMarker>\n",
            self.part_number_marker
        ));
        if self.is_truncated {
            xml.push_str(&format!(
                "  <NextPartNumberMarker>{}</NextPartNumberMarker>\n",
                self.next_part_number_marker
            ));
        }
        xml.push_str(&format!("  <MaxParts>{}</MaxParts>\n", self.max_parts));
        xml.push_str(&format!(
            "  <IsTruncated>{}</IsTruncated>\n",
            self.is_truncated
        ));
        for part in &self.parts {
            xml.push_str(&format!(
                "  <Part><PartNumber>{}</PartNumber><ETag>{}</ETag></Part>\n",
                part.part_number,
                escape_xml(&add_etag_quotes(&part.etag)),
            ));
        }
        xml.push_str("</ListPartsResult>");
        xml
    }
}

/// `POST /{bucket}/{key}?uploadId=...` success response.
#[derive(Debug, Clone)]
pub struct CompleteMultipartUploadResult {
    pub location: String,
    pub bucket: String,
    pub key: String,
    pub etag: String,
}

impl CompleteMultipartUploadResult {
    /// The bare element, for appending to an already-streaming body.
    pub fn xml_fragment(&self) -> String {
        format!(
            "<CompleteMultipartUploadResult xmlns=\"{S3_XMLNS}\"><Location>{}</Location><Bucket>{}</Bucket><Key>{}</Key><ETag>{}</ETag></CompleteMultipartUploadResult>",
            escape_xml(&self.location),
            escape_xml(&self.bucket),
            escape_xml(&self.key),
            escape_xml(&add_etag_quotes(&self.etag)),
        )
    }

    pub fn to_xml(&self) -> String {
        format!("{XML_DECLARATION}{}", self.xml_fragment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("a<b>c"), "a&lt;b&gt;c");
        assert_eq!(escape_xml("a&b"), "a&amp;b");
        assert_eq!(escape_xml("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn etag_quoting_is_idempotent() {
        assert_eq!(add_etag_quotes("abc"), "\"abc\"");
        assert_eq!(add_etag_quotes("\"abc\""), "\"abc\"");
        assert_eq!(strip_etag_quotes("\"abc\""), "abc");
        assert_eq!(strip_etag_quotes("abc"), "abc");
        assert_eq!(strip_etag_quotes("\""), "\"");
    }

    #[test]
    fn parses_complete_multipart_body() {
        let xml = r#"<CompleteMultipartUpload>
  <Part><PartNumber>1</PartNumber><ETag>"etag1"</ETag></Part>
  <Part><PartNumber>2</PartNumber><ETag>etag2</ETag></Part>
</CompleteMultipartUpload>"#;
        let body = CompleteMultipartUpload::from_xml(xml).unwrap();
        assert_eq!(body.parts.len(), 2);
        assert_eq!(body.parts[0].part_number, 1);
        assert_eq!(body.parts[0].etag, "\"etag1\"");
        assert_eq!(body.parts[1].etag, "etag2");
    }

    #[test]
    fn rejects_malformed_complete_body() {
        assert!(CompleteMultipartUpload::from_xml("<<< not xml").is_err());
    }

    #[test]
    fn parses_empty_complete_body() {
        let body = CompleteMultipartUpload::from_xml("<CompleteMultipartUpload/>").unwrap();
        assert!(body.parts.is_empty());
    }

    #[test]
    fn parses_versioning_configuration() {
        let xml = r#"<VersioningConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Status>Enabled</Status></VersioningConfiguration>"#;
        let config = VersioningConfiguration::from_xml(xml).unwrap();
        assert_eq!(config.state(), Some(VersioningState::Enabled));

        let xml = "<VersioningConfiguration><Status>Disabled</Status></VersioningConfiguration>";
        let config = VersioningConfiguration::from_xml(xml).unwrap();
        assert_eq!(config.state(), None);
    }

    #[test]
    fn disabled_versioning_has_no_status_element() {
        let xml = VersioningState::Disabled.to_xml();
        assert!(!xml.contains("<Status>"));
        let xml = VersioningState::Suspended.to_xml();
        assert!(xml.contains("<Status>Suspended</Status>"));
    }

    #[test]
    fn listing_renders_quoted_etags() {
        let result = ListBucketResult {
            name: "b1".into(),
            prefix: String::new(),
            marker: String::new(),
            delimiter: String::new(),
            max_keys: 1000,
            is_truncated: false,
            next_marker: String::new(),
            contents: vec![Contents {
                key: "hello".into(),
                last_modified: Utc::now(),
                etag: "8b1a9953c4611296a827abf8c47804d7".into(),
                size: 5,
                storage_class: "STANDARD".into(),
                owner: User {
                    id: "id".into(),
                    display_name: "name".into(),
                },
            }],
            common_prefixes: vec![],
        };
        let xml = result.to_xml();
        assert!(xml.contains("<ETag>&quot;8b1a9953c4611296a827abf8c47804d7&quot;</ETag>"));
        assert!(xml.contains("<IsTruncated>false</IsTruncated>"));
    }

    #[test]
    fn complete_result_fragment_has_no_declaration() {
        let result = CompleteMultipartUploadResult {
            location: "/b1/big".into(),
            bucket: "b1".into(),
            key: "big".into(),
            etag: "abc".into(),
        };
        assert!(result.xml_fragment().starts_with("<CompleteMultipartUploadResult"));
        assert!(result.to_xml().starts_with("<?xml"));
        assert!(result.xml_fragment().contains("&quot;abc&quot;"));
    }
}
