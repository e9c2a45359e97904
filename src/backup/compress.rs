use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Suffix appended to compressed artifacts; its presence is also how
/// restore detects that an artifact needs decompression.
pub const GZIP_SUFFIX: &str = ".gz";

/// Write half of the compression stage: either a raw pass-through or a
/// streaming gzip encoder in front of the sink.
///
/// The gzip variant buffers internally, so `finish` must run before
/// the underlying artifact is considered complete; reading the file
/// size back earlier yields a truncated stream.
pub enum ArtifactWriter<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> ArtifactWriter<W> {
    pub fn new(sink: W, compress: bool) -> Self {
        if compress {
            ArtifactWriter::Gzip(GzEncoder::new(sink, Compression::default()))
        } else {
            ArtifactWriter::Plain(sink)
        }
    }

    /// Flush buffered state and close out the gzip frame, handing the
    /// inner sink back.
    pub fn finish(self) -> io::Result<W> {
        match self {
            ArtifactWriter::Plain(mut sink) => {
                sink.flush()?;
                Ok(sink)
            }
            ArtifactWriter::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for ArtifactWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ArtifactWriter::Plain(sink) => sink.write(buf),
            ArtifactWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ArtifactWriter::Plain(sink) => sink.flush(),
            ArtifactWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Read half: transparently decompresses when the artifact's name
/// carries the gzip suffix, passes bytes through unchanged otherwise.
pub fn artifact_reader(file: File, path: &Path) -> Box<dyn Read> {
    if is_compressed(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    }
}

pub fn is_compressed(path: &Path) -> bool {
    path.to_string_lossy().ends_with(GZIP_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_writer_passes_bytes_through_unchanged() {
        let mut writer = ArtifactWriter::new(Vec::new(), false);
        writer.write_all(b"raw bytes").unwrap();
        let sink = writer.finish().unwrap();
        assert_eq!(sink, b"raw bytes");
    }

    #[test]
    fn gzip_writer_round_trips_through_a_decoder() {
        let mut writer = ArtifactWriter::new(Vec::new(), true);
        writer.write_all(b"SELECT * FROM t;\n").unwrap();
        let compressed = writer.finish().unwrap();
        assert_ne!(compressed, b"SELECT * FROM t;\n");

        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, b"SELECT * FROM t;\n");
    }

    #[test]
    fn unfinished_gzip_stream_is_not_a_complete_frame() {
        let mut writer = ArtifactWriter::new(Vec::new(), true);
        writer.write_all(b"payload that needs the trailer").unwrap();
        writer.flush().unwrap();
        let truncated = match writer {
            ArtifactWriter::Gzip(encoder) => encoder.get_ref().clone(),
            ArtifactWriter::Plain(_) => unreachable!(),
        };

        let mut decoded = Vec::new();
        // Without the trailer the decoder must report an error.
        assert!(
            GzDecoder::new(&truncated[..])
                .read_to_end(&mut decoded)
                .is_err()
        );
    }

    #[test]
    fn compression_detection_is_suffix_driven() {
        assert!(is_compressed(Path::new("/backups/db.sql.gz")));
        assert!(is_compressed(Path::new("db.archive.gz")));
        assert!(!is_compressed(Path::new("/backups/db.sql")));
        assert!(!is_compressed(Path::new("db.gz.sql")));
    }
}
