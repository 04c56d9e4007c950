use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::TestContext;

/// apex_manifest.pb with name = "com.android.art", version = 1, followed by
/// an unknown field 4 = "x"
pub const ART_MANIFEST_PB: &[u8] = &[
    0x0a, 0x0f, b'c', b'o', b'm', b'.', b'a', b'n', b'd', b'r', b'o', b'i', b'd', b'.', b'a', b'r',
    b't', 0x10, 0x01, 0x22, 0x01, b'x',
];

/// Write a zip with the given entries into the context's directory
pub fn write_apex(ctx: &TestContext, file_name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = ctx.get_base_dir().join(file_name);
    let mut zip = ZipWriter::new(File::create(&path).expect("creating apex"));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        zip.start_file(*name, options).expect("starting zip entry");
        zip.write_all(data).expect("writing zip entry");
    }
    zip.finish().expect("finishing zip");
    path
}
