use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use log::{self, log_enabled, Level::Trace};
use protobuf::{CodedInputStream, UnknownFields};
use serde::Deserialize;
use zip::result::{ZipError, ZipResult};
use zip::ZipArchive;

const MANIFEST_PB: &str = "apex_manifest.pb";
const MANIFEST_JSON: &str = "apex_manifest.json";

// Field tags from apex_manifest.proto, (field_number << 3) | wire_type
const NAME_TAG: u32 = (1 << 3) | 2;
const VERSION_TAG: u32 = 2 << 3;

/// Identity of an APEX package as declared by its manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApexInfo {
    pub name: String,
    pub version: i64,
}

#[derive(Deserialize)]
struct JsonManifest {
    name: String,
    #[serde(default)]
    version: i64,
}

impl ApexInfo {
    /// Read the manifest out of the given `.apex` file
    ///
    /// Newer APEXes carry a protobuf `apex_manifest.pb`, older ones only have
    /// `apex_manifest.json`.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let opened = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                log::error!("failed to open {}: {}", path.to_string_lossy(), e);
                return Err(e.into());
            }
        };
        let mut archive = ZipArchive::new(opened).map_err(|e| crate::Error::new_apex(path, &e))?;

        let info = if let Some(data) =
            read_entry(&mut archive, MANIFEST_PB).map_err(|e| crate::Error::new_apex(path, &e))?
        {
            log::trace!("parsing protobuf manifest");
            Self::from_manifest_pb(&data).map_err(|e| crate::Error::new_apex(path, &e))?
        } else if let Some(data) =
            read_entry(&mut archive, MANIFEST_JSON).map_err(|e| crate::Error::new_apex(path, &e))?
        {
            log::trace!("parsing json manifest");
            Self::from_manifest_json(&data).map_err(|e| crate::Error::new_apex(path, &e))?
        } else {
            return Err(crate::Error::new_apex(path, "no apex manifest"));
        };

        if info.name.is_empty() {
            return Err(crate::Error::new_apex(path, "manifest has no name"));
        }
        if log_enabled!(Trace) {
            log::trace!("{} is {}@{}", path.to_string_lossy(), info.name, info.version);
        }
        Ok(info)
    }

    pub fn from_manifest_pb(data: &[u8]) -> protobuf::Result<Self> {
        let mut is = CodedInputStream::from_bytes(data);
        let mut unknown = UnknownFields::new();
        let mut info = Self::default();
        while let Some(tag) = is.read_raw_tag_or_eof()? {
            match tag {
                NAME_TAG => info.name = is.read_string()?,
                VERSION_TAG => info.version = is.read_int64()?,
                tag => protobuf::rt::read_unknown_or_skip_group(tag, &mut is, &mut unknown)?,
            }
        }
        Ok(info)
    }

    pub fn from_manifest_json(data: &[u8]) -> serde_json::Result<Self> {
        let manifest: JsonManifest = serde_json::from_slice(data)?;
        Ok(Self {
            name: manifest.name,
            version: manifest.version,
        })
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> ZipResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_context, write_apex, TestContext, ART_MANIFEST_PB};
    use rstest::*;

    #[test]
    fn test_from_manifest_pb() {
        let info = ApexInfo::from_manifest_pb(ART_MANIFEST_PB).expect("parsing manifest");
        assert_eq!(
            info,
            ApexInfo {
                name: "com.android.art".into(),
                version: 1,
            }
        );
    }

    #[test]
    fn test_from_manifest_pb_truncated() {
        assert!(ApexInfo::from_manifest_pb(&ART_MANIFEST_PB[..6]).is_err());
    }

    #[rstest]
    fn test_from_file_pb(tmp_context: TestContext) {
        let apex = write_apex(
            &tmp_context,
            "com.android.art.apex",
            &[
                ("apex_payload.img", &b"payload"[..]),
                (MANIFEST_PB, ART_MANIFEST_PB),
            ],
        );
        let info = ApexInfo::from_file(&apex).expect("reading apex");
        assert_eq!(info.name, "com.android.art");
        assert_eq!(info.version, 1);
    }

    #[rstest]
    fn test_from_file_json(tmp_context: TestContext) {
        let apex = write_apex(
            &tmp_context,
            "com.android.art.apex",
            &[(
                MANIFEST_JSON,
                &br#"{"name": "com.android.art", "version": 339990000}"#[..],
            )],
        );
        let info = ApexInfo::from_file(&apex).expect("reading apex");
        assert_eq!(info.name, "com.android.art");
        assert_eq!(info.version, 339990000);
    }

    #[rstest]
    fn test_from_file_no_manifest(tmp_context: TestContext) {
        let apex = write_apex(
            &tmp_context,
            "empty.apex",
            &[("apex_payload.img", &b"payload"[..])],
        );
        assert!(matches!(
            ApexInfo::from_file(&apex),
            Err(crate::Error::InvalidApex(_, _))
        ));
    }

    #[rstest]
    fn test_from_file_empty_name(tmp_context: TestContext) {
        let apex = write_apex(
            &tmp_context,
            "noname.apex",
            &[(MANIFEST_JSON, &br#"{"name": ""}"#[..])],
        );
        assert!(matches!(
            ApexInfo::from_file(&apex),
            Err(crate::Error::InvalidApex(_, _))
        ));
    }

    #[rstest]
    fn test_from_file_bogus_entry_size(tmp_context: TestContext) {
        let apex = write_apex(
            &tmp_context,
            "bogus.apex",
            &[(MANIFEST_PB, ART_MANIFEST_PB)],
        );
        // Claim a ~4GiB uncompressed size in the central directory entry
        let mut bytes = std::fs::read(&apex).expect("reading apex");
        let central = bytes
            .windows(4)
            .position(|w| w == b"PK\x01\x02")
            .expect("central directory entry");
        bytes[central + 24..central + 28].copy_from_slice(&0xffff_fff0u32.to_le_bytes());
        std::fs::write(&apex, &bytes).expect("writing apex");

        match ApexInfo::from_file(&apex) {
            Ok(info) => assert_eq!(info.name, "com.android.art"),
            Err(crate::Error::InvalidApex(_, _)) => {}
            Err(e) => panic!("unexpected error {}", e),
        }
    }

    #[rstest]
    fn test_from_file_not_a_zip(tmp_context: TestContext) {
        let path = tmp_context
            .new_tmp_file("definitely not a zip")
            .expect("writing file");
        assert!(matches!(
            ApexInfo::from_file(&path),
            Err(crate::Error::InvalidApex(_, _))
        ));
    }
}
